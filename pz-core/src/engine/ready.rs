//! One-shot readiness flag

use parking_lot::{Condvar, Mutex};

/// Set-once signal that other threads can block on
///
/// Once set it stays set; there is no reset.
#[derive(Debug, Default)]
pub struct ReadySignal {
    flag: Mutex<bool>,
    cond: Condvar,
}

impl ReadySignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        let mut flag = self.flag.lock();
        if !*flag {
            *flag = true;
            self.cond.notify_all();
        }
    }

    pub fn is_set(&self) -> bool {
        *self.flag.lock()
    }

    /// Block until the signal is set
    pub fn wait(&self) {
        let mut flag = self.flag.lock();
        while !*flag {
            self.cond.wait(&mut flag);
        }
    }
}
