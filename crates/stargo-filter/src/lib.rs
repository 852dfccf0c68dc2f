//! Digital low-pass filters for drift correction
//!
//! [`FilterDesigner`] turns a [`FilterSpec`] (Bessel, Butterworth or
//! Chebyshev prototype of any order, bilinear or matched-z transform) into a
//! set of recurrence coefficients. [`DigitalFilter`] runs those coefficients
//! over a stream of samples.
//!
//! ```rust
//! use stargo_filter::{DigitalFilter, FilterSpec};
//!
//! let mut filter = DigitalFilter::new(FilterSpec::default()).unwrap();
//! assert_eq!(filter.coefficients().len(), 5);
//!
//! let delta = filter.add_sample(-500.0);
//! assert!(delta < 0.0);
//! assert_eq!(filter.cumulative_correction(), delta);
//! ```

pub mod bessel;
pub mod design;
pub mod error;
pub mod runtime;

pub use design::{FilterCoefficients, FilterDesign, FilterDesigner, FilterSpec, Transform};
pub use error::FilterError;
pub use runtime::DigitalFilter;
