//! Reduced-motion preference.
//!
//! A cloneable handle over a `watch` channel. The host owns one and hands
//! clones to every scheduler it builds; flipping the flag propagates to all of
//! them without any global state.

use std::sync::Arc;
use tokio::sync::watch;

/// Host-level opt-in read when the configured mode is `auto`.
pub const REDUCED_MOTION_ENV: &str = "TYPEPLAY_REDUCED_MOTION";
const GENERIC_ENV: &str = "REDUCE_MOTION";

#[derive(Debug, Clone)]
pub struct MotionPreference {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for MotionPreference {
    fn default() -> Self {
        Self::new(false)
    }
}

impl MotionPreference {
    pub fn new(reduced: bool) -> Self {
        let (tx, _rx) = watch::channel(reduced);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_reduced(&self) -> bool {
        *self.tx.borrow()
    }

    /// Update the preference. Subscribers are only woken on an actual change.
    pub fn set(&self, reduced: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == reduced {
                return false;
            }
            *current = reduced;
            true
        });
        if changed {
            tracing::info!(target: "gates.motion", reduced, "motion_preference_changed");
        }
    }

    pub fn toggle(&self) -> bool {
        let next = !self.is_reduced();
        self.set(next);
        next
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Interpret an environment flag value: `1`/`true`/`yes`/`on` enable,
/// `0`/`false`/`no`/`off` disable, anything else is no opinion.
pub fn parse_flag(value: Option<&str>) -> Option<bool> {
    match value?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Best available signal of the host's accessibility preference.
pub fn host_prefers_reduced_motion() -> bool {
    [REDUCED_MOTION_ENV, GENERIC_ENV]
        .iter()
        .find_map(|key| parse_flag(std::env::var(key).ok().as_deref()))
        .unwrap_or(false)
}
