//! Playback gates: one-shot visibility arming and the reduced-motion
//! preference.
//!
//! Both gates are plain values handed to their consumers; nothing here is a
//! process global. The host feeds observations in (viewport ratio, preference
//! changes) and the scheduler reads decisions out.

pub mod motion;
pub mod visibility;

pub use motion::{MotionPreference, REDUCED_MOTION_ENV, host_prefers_reduced_motion, parse_flag};
pub use visibility::{
    DEFAULT_VISIBILITY_THRESHOLD, VisibilityEvent, VisibilityGate, VisibilityPhase, wait_for_enter,
};
