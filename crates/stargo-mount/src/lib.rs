//! StarGo mount link
//!
//! This crate connects to an Avalon StarGo controller over a serial-like
//! stream and builds the RA drift correction loop on top of it.
//!
//! # Architecture
//!
//! - [`TransportChannel`] moves raw bytes and splits them into frames
//! - [`ProtocolEngine`] runs the query contract: drain, pace, transmit,
//!   collect the reply while routing status frames into [`MountState`]
//! - [`Mount`] is the cloneable handle every caller shares; queries are
//!   serialized behind it
//! - [`AutoAdjustController`] turns accumulated RA guiding corrections into
//!   tracking adjustments through a low-pass filter
//! - [`Guider`] sends guide pulses and times their completion
//!
//! Everything observable is published as a [`MountEvent`].
//!
//! # Example
//!
//! ```rust,no_run
//! use stargo_filter::FilterSpec;
//! use stargo_mount::{AutoAdjustConfig, AutoAdjustController, EngineConfig, Guider, Mount};
//! use stargo_protocol::GuideDirection;
//!
//! # async fn run() -> Result<(), stargo_mount::MountError> {
//! let mount = Mount::connect_serial("/dev/ttyUSB0", 9600, EngineConfig::default())?;
//! let adjust = AutoAdjustController::new(
//!     mount.clone(),
//!     FilterSpec::default(),
//!     AutoAdjustConfig::default(),
//!     mount.event_sender(),
//! )?;
//! adjust.enable().await;
//!
//! let guider = Guider::new(mount.clone()).with_auto_adjust(adjust.clone());
//! guider.guide(GuideDirection::East, 500).await?;
//! # Ok(())
//! # }
//! ```

pub mod adjust;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod guider;
pub mod mount;
pub mod transport;

pub use adjust::{AdjustmentState, AutoAdjustController, MountQuery, SampleWindow};
pub use config::{AutoAdjustConfig, EngineConfig};
pub use engine::ProtocolEngine;
pub use error::{MountError, TransportError};
pub use events::{FilterSummary, MountEvent};
pub use guider::Guider;
pub use mount::Mount;
pub use stargo_protocol::MountState;
pub use transport::{TransportChannel, DEFAULT_BAUD_RATE};
