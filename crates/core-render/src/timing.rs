//! Frame timing instrumentation.
//!
//! Captures the duration of the last painted frame in nanoseconds; logged by
//! the host at shutdown.
use std::sync::atomic::{AtomicU64, Ordering};

static LAST_FRAME_NS: AtomicU64 = AtomicU64::new(0);
static FRAMES_PAINTED: AtomicU64 = AtomicU64::new(0);

pub fn record_frame_ns(ns: u64) {
    LAST_FRAME_NS.store(ns, Ordering::Relaxed);
    FRAMES_PAINTED.fetch_add(1, Ordering::Relaxed);
}

pub fn last_frame_ns() -> u64 {
    LAST_FRAME_NS.load(Ordering::Relaxed)
}

pub fn frames_painted() -> u64 {
    FRAMES_PAINTED.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn store_and_load_nonzero() {
        let before = frames_painted();
        record_frame_ns(1234);
        assert_eq!(last_frame_ns(), 1234);
        assert!(frames_painted() > before);
    }
}
