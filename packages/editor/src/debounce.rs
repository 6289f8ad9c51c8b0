//! Single-slot scheduling.
//!
//! Each [`Debouncer::schedule`] call replaces whatever was scheduled before, and
//! the host runs the slot once per tick, so a burst of requests within one tick
//! results in one run.

pub struct Debouncer<T> {
    slot: Option<T>,
    replaced: usize,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self {
            slot: None,
            replaced: 0,
        }
    }
}

impl<T> Debouncer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task`, replacing any pending one. Returns `true` if a pending task was replaced.
    pub fn schedule(&mut self, task: T) -> bool {
        let replaced = self.slot.replace(task).is_some();
        if replaced {
            self.replaced += 1;
        }
        replaced
    }

    /// Drop the pending task, if any, without running it.
    pub fn cancel(&mut self) -> Option<T> {
        self.slot.take()
    }

    /// Remove the pending task so the caller can run it.
    pub fn take(&mut self) -> Option<T> {
        self.slot.take()
    }

    /// Number of scheduled tasks that were replaced before they ran.
    pub fn coalesced(&self) -> usize {
        self.replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_last_task_runs() {
        let mut debouncer: Debouncer<Box<dyn FnOnce(&mut Vec<u32>)>> = Debouncer::new();
        let mut log = Vec::new();
        for i in 0..5 {
            debouncer.schedule(Box::new(move |log: &mut Vec<u32>| log.push(i)));
        }
        if let Some(task) = debouncer.take() {
            task(&mut log);
        }
        assert!(debouncer.take().is_none());
        assert_eq!(log, vec![4]);
        assert_eq!(debouncer.coalesced(), 4);
    }

    #[test]
    fn test_cancel() {
        let mut debouncer = Debouncer::new();
        assert!(!debouncer.schedule(|n: &mut u32| *n += 1));
        assert!(debouncer.cancel().is_some());
        assert!(debouncer.take().is_none());
        assert_eq!(debouncer.coalesced(), 0);
    }
}
