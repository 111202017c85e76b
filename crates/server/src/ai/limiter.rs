//! Bound on in-flight outbound completion calls

use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-wide counter of in-flight completions.
///
/// Acquiring never blocks: when the bound is reached the caller gets `None`
/// and treats it as the service being rate limited.
#[derive(Debug)]
pub struct OutboundLimiter {
    in_flight: AtomicUsize,
    max: usize,
}

/// Releases its slot on drop
#[derive(Debug)]
pub struct OutboundPermit<'a> {
    limiter: &'a OutboundLimiter,
}

impl OutboundLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            max: max.max(1),
        }
    }

    pub fn try_acquire(&self) -> Option<OutboundPermit<'_>> {
        let mut current = self.in_flight.load(Ordering::Relaxed);
        loop {
            if current >= self.max {
                return None;
            }
            match self.in_flight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(OutboundPermit { limiter: self }),
                Err(actual) => current = actual,
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }
}

impl Drop for OutboundPermit<'_> {
    fn drop(&mut self) {
        self.limiter.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn refuses_beyond_bound_and_releases_on_drop() {
        let limiter = OutboundLimiter::new(2);
        let a = limiter.try_acquire();
        let b = limiter.try_acquire();
        assert!(a.is_some() && b.is_some());
        assert!(limiter.try_acquire().is_none());

        drop(a);
        assert_eq!(limiter.in_flight(), 1);
        assert!(limiter.try_acquire().is_some());
    }

    #[test]
    fn concurrent_acquires_never_exceed_bound() {
        let limiter = Arc::new(OutboundLimiter::new(4));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let peak = Arc::clone(&peak);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        if let Some(_permit) = limiter.try_acquire() {
                            peak.fetch_max(limiter.in_flight(), Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(peak.load(Ordering::Relaxed) <= 4);
        assert_eq!(limiter.in_flight(), 0);
    }
}
