//! Transfer-port window allocation (spec §4.4 "Concurrency": "the
//! coordinator guarantees non-overlapping port windows across concurrent
//! hops on the same machine by allocating from a monotonically advancing
//! offset within the queue's configured `[lo..hi]` range").

use std::sync::atomic::{AtomicU32, Ordering};

/// Hands out non-overlapping `n`-wide port windows within `[lo, hi]`,
/// wrapping back to `lo` once a window would overrun `hi`.
#[derive(Debug)]
pub struct PortAllocator {
    lo: u16,
    hi: u16,
    offset: AtomicU32,
}

/// The configured range has no room for even one stripe's worth of ports.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("transfer-port range [{lo}..{hi}] has no room for a {needed}-wide window")]
pub struct PortRangeExhausted {
    lo: u16,
    hi: u16,
    needed: u32,
}

impl PortAllocator {
    /// Creates an allocator over the inclusive range `[lo, hi]`.
    pub fn new(lo: u16, hi: u16) -> Self {
        Self {
            lo,
            hi,
            offset: AtomicU32::new(0),
        }
    }

    /// Allocates a contiguous window of `n` ports, returning its base
    /// port. Wraps back to `lo` when the next window would not fit.
    pub fn allocate(&self, n: u32) -> Result<u16, PortRangeExhausted> {
        let span = u32::from(self.hi - self.lo) + 1;
        if n > span {
            return Err(PortRangeExhausted {
                lo: self.lo,
                hi: self.hi,
                needed: n,
            });
        }
        let mut offset = self.offset.load(Ordering::Relaxed);
        loop {
            let next = if offset + n > span { 0 } else { offset };
            let new_offset = next + n;
            match self.offset.compare_exchange_weak(
                offset,
                new_offset,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(self.lo + next as u16),
                Err(actual) => offset = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_allocations_do_not_overlap() {
        let allocator = PortAllocator::new(40000, 40099);
        let a = allocator.allocate(4).unwrap();
        let b = allocator.allocate(4).unwrap();
        assert!(b as u32 >= a as u32 + 4 || b < a);
    }

    #[test]
    fn wraps_around_when_window_would_overrun() {
        let allocator = PortAllocator::new(40000, 40007);
        let a = allocator.allocate(4).unwrap();
        let b = allocator.allocate(4).unwrap();
        let c = allocator.allocate(4).unwrap();
        assert_eq!(a, 40000);
        assert_eq!(b, 40004);
        assert_eq!(c, 40000);
    }

    #[test]
    fn window_wider_than_range_is_an_error() {
        let allocator = PortAllocator::new(40000, 40002);
        assert!(allocator.allocate(8).is_err());
    }
}
