//! StarGo Simulation Library
//!
//! A virtual StarGo controller for exercising the mount link without
//! hardware. It answers the typed commands the driver uses and emits
//! unsolicited motion status frames on demand, optionally around every
//! reply the way real firmware does when the mount is moving.
//!
//! It does not model kinematics: guide pulses are recorded, not executed.
//!
//! # Example
//!
//! ```rust
//! use stargo_sim::VirtualMount;
//!
//! let mut mount = VirtualMount::new("sim");
//! mount.set_tracking_adjustment_hundredths(-120);
//!
//! assert_eq!(mount.process_command(":X42#").as_deref(), Some("or-120#"));
//! assert_eq!(mount.process_command(":X41+025#"), None);
//! assert_eq!(mount.tracking_adjustment_hundredths(), 25);
//! ```

pub mod mount;
pub mod mount_task;

pub use mount::{GuidePulseRecord, VirtualMount};
pub use mount_task::{
    run_virtual_mount_task, spawn_virtual_mount, VirtualMountCommand, VirtualMountEvent,
    VirtualMountHandle,
};
