//! Mount event stream
//!
//! Status frames, guiding completions and auto-adjust activity are published
//! on one broadcast channel, in the order they happen.

use stargo_filter::DigitalFilter;
use stargo_protocol::{Axis, MountState};

/// Capacity of the event broadcast channel
pub const EVENT_CAPACITY: usize = 256;

/// Event emitted by the mount link or the controllers
#[derive(Debug, Clone, PartialEq)]
pub enum MountEvent {
    /// A status frame was received; carries the updated state
    Status(MountState),

    /// The pending guide pulse on an axis has run its course
    GuideComplete {
        /// Axis that finished
        axis: Axis,
    },

    /// Auto-adjust wrote a new RA tracking adjustment
    TrackingAdjusted {
        /// Previous adjustment (percent)
        from: f64,
        /// New adjustment (percent)
        to: f64,
    },

    /// The drift filter was redesigned
    FilterRebuilt(FilterSummary),

    /// Auto-adjust was switched on or off
    AutoAdjust {
        enabled: bool,
    },
}

/// Description of the active drift filter
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSummary {
    pub name: &'static str,
    pub order: u32,
    /// Corner period in samples
    pub corner_period: f64,
    pub gain: f64,
}

impl From<&DigitalFilter> for FilterSummary {
    fn from(filter: &DigitalFilter) -> Self {
        Self {
            name: filter.name(),
            order: filter.order(),
            corner_period: filter.corner_period(),
            gain: filter.gain(),
        }
    }
}
