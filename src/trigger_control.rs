use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Busy flag for a user-facing trigger (upload button, waitlist form).
///
/// While a guard is alive the trigger is disabled and further attempts are
/// refused; dropping the guard re-enables it, whatever the outcome.
#[derive(Debug, Clone, Default)]
pub struct TriggerControl {
    busy: Arc<AtomicBool>,
}

/// Held for the duration of one submission
#[derive(Debug)]
pub struct TriggerGuard {
    busy: Arc<AtomicBool>,
}

impl TriggerControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the trigger, or `None` if a submission is already in flight
    pub fn try_acquire(&self) -> Option<TriggerGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TriggerGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for TriggerGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_refused_while_busy() {
        let trigger = TriggerControl::new();
        let guard = trigger.try_acquire().unwrap();
        assert!(trigger.is_busy());
        assert!(trigger.try_acquire().is_none());

        drop(guard);
        assert!(!trigger.is_busy());
        assert!(trigger.try_acquire().is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let trigger = TriggerControl::new();
        let other = trigger.clone();
        let _guard = trigger.try_acquire().unwrap();
        assert!(other.is_busy());
        assert!(other.try_acquire().is_none());
    }

    #[tokio::test]
    async fn test_guard_released_when_task_fails() {
        let trigger = TriggerControl::new();
        let guard = trigger.try_acquire().unwrap();

        let result = tokio::spawn(async move {
            let _guard = guard;
            Err::<(), &str>("presign rejected")
        })
        .await
        .unwrap();

        assert!(result.is_err());
        assert!(!trigger.is_busy());
    }
}
