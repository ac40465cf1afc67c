// Run switch - Cooperative cancellation shared between the run loops

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared on/off flag for one run.
///
/// The controller flips it off, the step loop and the transport clock poll
/// it at iteration boundaries. It only ever goes from running to stopped.
#[derive(Debug, Clone)]
pub struct RunSwitch {
    inner: Arc<AtomicBool>,
}

impl RunSwitch {
    /// Creates a switch in the running position
    pub fn armed() -> Self {
        Self {
            inner: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    /// Turns the switch off. Returns `true` if this call did the flip.
    pub fn stop(&self) -> bool {
        self.inner.swap(false, Ordering::AcqRel)
    }
}

impl Default for RunSwitch {
    fn default() -> Self {
        Self::armed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_stop_is_one_way() {
        let switch = RunSwitch::armed();
        assert!(switch.is_running());
        assert!(switch.stop());
        assert!(!switch.is_running());
        assert!(!switch.stop());
        assert!(!switch.is_running());
    }

    #[test]
    fn test_clones_share_state_across_threads() {
        let switch = RunSwitch::armed();
        let remote = switch.clone();

        thread::spawn(move || remote.stop()).join().unwrap();

        assert!(!switch.is_running());
    }
}
