//! Explicit shared state for tasks.

use parking_lot::Mutex;
use std::sync::Arc;

/// Synchronized, cloneable accumulator for results collected across workers.
///
/// Tasks never get ambient access to shared memory; a pool user who wants
/// workers to append into a common collection must create one of these and
/// move a clone into each task. That rule is what keeps the two substrates
/// interchangeable: thread workers could mutate a plain captured `Vec` only
/// through `unsafe` aliasing anyway, and process contexts have no shared
/// memory at all, so the proxy is the one supported route. A transport to
/// real child processes must supply its own server-backed equivalent.
#[derive(Debug)]
pub struct SharedVec<T> {
    inner: Arc<Mutex<Vec<T>>>,
}

impl<T> Default for SharedVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SharedVec<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[allow(missing_docs)]
impl<T> SharedVec<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push(&self, value: T) {
        self.inner.lock().push(value);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl<T: Clone> SharedVec<T> {
    /// Copy of the current contents.
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn concurrent_pushes_all_land() {
        let acc: SharedVec<usize> = SharedVec::new();

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let acc = acc.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        acc.push(w * 25 + i);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let mut values = acc.snapshot();
        values.sort_unstable();
        assert_eq!(values, (0..100).collect::<Vec<_>>());
    }
}
