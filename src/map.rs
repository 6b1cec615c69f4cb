//! Ordered bulk mapping.

use crate::error::Result;
use crate::handle::TaskHandle;
use std::collections::VecDeque;
use std::time::Instant;

/// Lazy, order-preserving sequence of results from
/// [`Executor::map`](crate::Executor::map).
///
/// Single pass and non-restartable: `next()` blocks on element *i*'s handle
/// until it settles, even if element *i+1* finished first, so results come
/// out in input order regardless of completion order. A failed element
/// yields `Err` at its index; tasks after it were already dispatched and are
/// neither cancelled nor skipped. Dropping the iterator early likewise
/// leaves the remaining tasks to run to completion.
#[derive(Debug)]
pub struct MapResults<T> {
    handles: VecDeque<TaskHandle<T>>,
    deadline: Option<Instant>,
}

impl<T> MapResults<T> {
    pub(crate) fn new(handles: VecDeque<TaskHandle<T>>, deadline: Option<Instant>) -> Self {
        Self { handles, deadline }
    }

    /// Results not yet consumed.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// True once every result has been consumed.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl<T: Clone> Iterator for MapResults<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.handles.pop_front()?;
        Some(handle.result_deadline(self.deadline))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.handles.len(), Some(self.handles.len()))
    }
}

impl<T: Clone> ExactSizeIterator for MapResults<T> {}

impl<T: Clone> std::iter::FusedIterator for MapResults<T> {}
