// Tilt Guard: Session Limiter
//
// Counts threshold crossings within one detection session and refuses to go
// past the cap.

use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTick {
    /// 1-based count including this event.
    pub count: u32,
    /// This event filled the session.
    pub cap_reached: bool,
}

#[derive(Debug)]
pub struct SessionLimiter {
    count: AtomicU32,
    cap: u32,
}

impl SessionLimiter {
    pub fn new(cap: u32) -> Self {
        Self {
            count: AtomicU32::new(0),
            cap,
        }
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_capped(&self) -> bool {
        self.count() >= self.cap
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::Release);
    }

    /// Record one crossing. `None` once the session is already full.
    pub fn record(&self) -> Option<SessionTick> {
        let cap = self.cap;
        self.count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| (c < cap).then_some(c + 1))
            .ok()
            .map(|prev| SessionTick {
                count: prev + 1,
                cap_reached: prev + 1 >= cap,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counts_up_to_cap_then_refuses() {
        let limiter = SessionLimiter::new(5);
        for n in 1..=4 {
            assert_eq!(limiter.record(), Some(SessionTick { count: n, cap_reached: false }));
        }
        assert_eq!(limiter.record(), Some(SessionTick { count: 5, cap_reached: true }));
        assert!(limiter.is_capped());
        assert_eq!(limiter.record(), None);
        assert_eq!(limiter.count(), 5);
    }

    #[test]
    fn reset_starts_over() {
        let limiter = SessionLimiter::new(2);
        limiter.record();
        limiter.record();
        limiter.reset();
        assert_eq!(limiter.count(), 0);
        assert_eq!(limiter.record().map(|t| t.count), Some(1));
    }

    #[test]
    fn racing_recorders_never_exceed_cap() {
        let limiter = Arc::new(SessionLimiter::new(5));
        let accepted: u32 = (0..8)
            .map(|_| {
                let l = Arc::clone(&limiter);
                thread::spawn(move || (0..10).filter(|_| l.record().is_some()).count() as u32)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .sum();
        assert_eq!(accepted, 5);
        assert_eq!(limiter.count(), 5);
    }
}
