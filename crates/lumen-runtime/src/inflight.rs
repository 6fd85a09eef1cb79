use std::sync::{Arc, Condvar, Mutex};

/// Counts jobs handed to the pool so callers can wait for quiescence.
#[derive(Default)]
pub struct InflightTracker {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InflightTracker {
    pub fn start(self: &Arc<Self>) -> InflightGuard {
        *self.count.lock().unwrap() += 1;
        InflightGuard {
            tracker: Arc::clone(self),
        }
    }

    pub fn count(&self) -> usize {
        *self.count.lock().unwrap()
    }

    pub fn wait_idle(&self) {
        let mut n = self.count.lock().unwrap();
        while *n > 0 {
            n = self.idle.wait(n).unwrap();
        }
    }

    fn finish(&self) {
        let mut n = self.count.lock().unwrap();
        *n -= 1;
        if *n == 0 {
            self.idle.notify_all();
        }
    }
}

/// Marks one job finished when dropped, including on unwind.
pub struct InflightGuard {
    tracker: Arc<InflightTracker>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.tracker.finish();
    }
}
