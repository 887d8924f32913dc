//! In-process adapters.
//!
//! Both can be told to fail the next call of a given kind. Adapters built
//! with `recording()` also keep an ordered log of the last
//! [`MAX_RECORDED_CALLS`] calls they received.

mod identity;
mod store;

pub use identity::*;
pub use store::*;

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;

/// Calls kept by a recording adapter before the oldest ones are dropped.
pub const MAX_RECORDED_CALLS: usize = 1024;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn random_id(length: usize) -> String {
    Alphanumeric.sample_string(&mut OsRng, length)
}

/// Bounded call log. Disabled logs drop every call.
#[derive(Debug)]
struct CallLog<C> {
    enabled: bool,
    calls: VecDeque<C>,
}

impl<C> Default for CallLog<C> {
    fn default() -> Self {
        Self {
            enabled: false,
            calls: VecDeque::new(),
        }
    }
}

impl<C: Clone> CallLog<C> {
    fn recording() -> Self {
        Self {
            enabled: true,
            calls: VecDeque::new(),
        }
    }

    fn push(&mut self, call: C) {
        if !self.enabled {
            return;
        }
        if self.calls.len() == MAX_RECORDED_CALLS {
            self.calls.pop_front();
        }
        self.calls.push_back(call);
    }

    fn to_vec(&self) -> Vec<C> {
        self.calls.iter().cloned().collect()
    }

    fn iter(&self) -> impl Iterator<Item = &C> {
        self.calls.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_log_keeps_nothing() {
        let mut log = CallLog::default();
        log.push(1);
        assert!(log.to_vec().is_empty());
    }

    #[test]
    fn test_log_is_bounded() {
        let mut log = CallLog::recording();
        for call in 0..MAX_RECORDED_CALLS + 3 {
            log.push(call);
        }

        let calls = log.to_vec();
        assert_eq!(calls.len(), MAX_RECORDED_CALLS);
        assert_eq!(calls.first(), Some(&3));
        assert_eq!(calls.last(), Some(&(MAX_RECORDED_CALLS + 2)));
    }
}
