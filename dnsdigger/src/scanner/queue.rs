use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

/// FIFO of labels waiting to be claimed by a worker.
///
/// Every label is handed out exactly once. Claiming moves the item from the
/// `pending` counter to the caller's `active` counter while the queue lock is
/// still held, so `pending + active` never reads zero while a label is in
/// flight.
#[derive(Clone, Default)]
pub(crate) struct WorkQueue {
    labels: Arc<Mutex<VecDeque<String>>>,
    pending: Arc<AtomicUsize>,
}

impl WorkQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, label: String) {
        let mut labels = self.labels.lock();
        self.pending.fetch_add(1, Ordering::SeqCst);
        labels.push_back(label);
    }

    pub(crate) fn extend<I>(&self, labels: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut queue = self.labels.lock();
        labels.into_iter().for_each(|l| {
            self.pending.fetch_add(1, Ordering::SeqCst);
            queue.push_back(l)
        });
    }

    /// Removes the next label, or `None` once the queue is exhausted.
    pub(crate) fn claim(&self, active: &AtomicUsize) -> Option<String> {
        let mut labels = self.labels.lock();
        let label = labels.pop_front()?;

        active.fetch_add(1, Ordering::SeqCst);
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Some(label)
    }

    /// Labels not claimed yet.
    pub(crate) fn len(&self) -> usize {
        self.labels.lock().len()
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub(crate) fn pending_counter(&self) -> Arc<AtomicUsize> {
        self.pending.clone()
    }
}
