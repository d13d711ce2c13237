//! Process-wide counters for terminal negotiation outcomes.
//! Cheap relaxed atomics; read through [`snapshot`] (exposed by `ansibbs status`).
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

static HOME_OFFSET_APPLIED: AtomicU64 = AtomicU64::new(0);
static HOME_UNEXPECTED: AtomicU64 = AtomicU64::new(0);
static HOME_TIMEOUTS: AtomicU64 = AtomicU64::new(0);
static SIZE_DETECTED: AtomicU64 = AtomicU64::new(0);
static SIZE_OUT_OF_BAND: AtomicU64 = AtomicU64::new(0);
static SIZE_REJECTED: AtomicU64 = AtomicU64::new(0);
static SIZE_TIMEOUTS: AtomicU64 = AtomicU64::new(0);
static SIZE_FALLBACKS: AtomicU64 = AtomicU64::new(0);
static BOOTSTRAPS_COMPLETED: AtomicU64 = AtomicU64::new(0);

pub fn inc_home_offset_applied() {
    HOME_OFFSET_APPLIED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_home_unexpected() {
    HOME_UNEXPECTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_home_timeouts() {
    HOME_TIMEOUTS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_size_detected() {
    SIZE_DETECTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_size_out_of_band() {
    SIZE_OUT_OF_BAND.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_size_rejected() {
    SIZE_REJECTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_size_timeouts() {
    SIZE_TIMEOUTS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_size_fallbacks() {
    SIZE_FALLBACKS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_bootstraps_completed() {
    BOOTSTRAPS_COMPLETED.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub home_offset_applied: u64,
    pub home_unexpected: u64,
    pub home_timeouts: u64,
    pub size_detected: u64,
    pub size_out_of_band: u64,
    pub size_rejected: u64,
    pub size_timeouts: u64,
    pub size_fallbacks: u64,
    pub bootstraps_completed: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        home_offset_applied: HOME_OFFSET_APPLIED.load(Ordering::Relaxed),
        home_unexpected: HOME_UNEXPECTED.load(Ordering::Relaxed),
        home_timeouts: HOME_TIMEOUTS.load(Ordering::Relaxed),
        size_detected: SIZE_DETECTED.load(Ordering::Relaxed),
        size_out_of_band: SIZE_OUT_OF_BAND.load(Ordering::Relaxed),
        size_rejected: SIZE_REJECTED.load(Ordering::Relaxed),
        size_timeouts: SIZE_TIMEOUTS.load(Ordering::Relaxed),
        size_fallbacks: SIZE_FALLBACKS.load(Ordering::Relaxed),
        bootstraps_completed: BOOTSTRAPS_COMPLETED.load(Ordering::Relaxed),
    }
}
