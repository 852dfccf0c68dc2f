//! Filter construction errors

use thiserror::Error;

/// Errors that can occur while designing a filter
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    /// Order must be at least 1
    #[error("invalid filter order {0}")]
    InvalidOrder(u32),

    /// Corner period must be at least two samples
    #[error("invalid corner period multiplier {0:.4}")]
    InvalidCornerMultiplier(f64),

    /// Chebyshev passband ripple must be negative (in dB)
    #[error("Chebyshev ripple is {0} dB; must be less than 0")]
    InvalidRipple(f64),

    /// Bessel poles are only tabulated for a limited range of orders
    #[error("Bessel poles are not tabulated for order {order} (max {max})")]
    OrderNotTabulated { order: u32, max: u32 },

    /// Resulting DC gain cannot be used to normalize the input
    #[error("degenerate DC gain {0}")]
    DegenerateGain(f64),
}
