//! Presentation surface for typeplay.
//!
//! Paint pipeline: the host feeds playback snapshots (and ticks, resizes,
//! preference flips) into a [`Surface`], which answers with a [`RenderDelta`].
//! Deltas queue in a [`RenderScheduler`] and collapse to one decision per
//! frame; the surface then paints that decision into a [`Writer`], which
//! batches commands and flushes them to the terminal in one write.
//!
//! Invariants:
//! - Units are painted exactly once per reveal; a `Full` repaint clears first.
//! - The indicator cell is tracked so it can be erased before text lands on it.
//! - Nothing here reads terminal state; size and color depth are injected.
//!
//! Exposed components:
//! - `surface`: layout, damage derivation and painting.
//! - `scheduler`: delta merge with precedence and escalation metrics.
//! - `status`: header/footer segment composition.
//! - `style`: 24-bit to terminal color mapping.
//! - `viewport`: vertical window that follows the typing cursor.
//! - `writer`: batched command buffer.
//! - `timing`: last-frame duration counters.

pub mod scheduler;
pub mod status;
pub mod style;
pub mod surface;
pub mod timing;
pub mod viewport;
pub mod writer;

pub use scheduler::{Decision, RenderDelta, RenderScheduler};
pub use surface::{Surface, SurfaceMode, SurfaceOptions};
pub use writer::{Command, Writer, WriterStats};
