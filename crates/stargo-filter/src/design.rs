//! Low-pass recurrence filter design
//!
//! Stages, in order:
//!
//! 1. prototype s-plane poles (left half plane only)
//! 2. pre-warp of the corner frequency for the bilinear transform
//! 3. scaling of the poles to the corner frequency
//! 4. mapping to the z-plane (bilinear or matched-z)
//! 5. expansion of the pole/zero products into polynomial coefficients
//!
//! The resulting coefficients are stored newest-sample-first, ready to be
//! multiplied against a history buffer.

use std::f64::consts::PI;
use std::fmt;

use num_complex::Complex64;
use tracing::{debug, warn};

use crate::bessel;
use crate::error::FilterError;

/// Imaginary residue above which an expanded coefficient is reported as non-real
const REAL_TOLERANCE: f64 = 1e-10;

/// Smallest corner period, in samples (the Nyquist limit)
pub const MIN_CORNER_MULTIPLIER: f64 = 2.0;

/// Prototype filter family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FilterDesign {
    Bessel,
    Butterworth,
    Chebyshev,
}

impl FilterDesign {
    pub fn name(&self) -> &'static str {
        match self {
            FilterDesign::Bessel => "Bessel",
            FilterDesign::Butterworth => "Butterworth",
            FilterDesign::Chebyshev => "Chebyshev",
        }
    }
}

impl fmt::Display for FilterDesign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// s-plane to z-plane mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Transform {
    /// `z = (2 + s) / (2 - s)` with a pre-warped corner
    #[default]
    Bilinear,
    /// `z = e^s`
    MatchedZ,
}

/// Filter parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FilterSpec {
    pub design: FilterDesign,
    pub order: u32,
    /// Corner period in samples; the corner frequency is its reciprocal
    pub corner_multiplier: f64,
    pub transform: Transform,
    /// Passband ripple in dB, negative; only used by Chebyshev designs
    pub ripple_db: f64,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            design: FilterDesign::Butterworth,
            order: 4,
            corner_multiplier: 30.0,
            transform: Transform::Bilinear,
            ripple_db: -0.5,
        }
    }
}

impl FilterSpec {
    /// Check the parameters without designing anything
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.order == 0 {
            return Err(FilterError::InvalidOrder(self.order));
        }
        if !(self.corner_multiplier >= MIN_CORNER_MULTIPLIER) || !self.corner_multiplier.is_finite()
        {
            return Err(FilterError::InvalidCornerMultiplier(self.corner_multiplier));
        }
        match self.design {
            FilterDesign::Chebyshev if !(self.ripple_db < 0.0) || !self.ripple_db.is_finite() => {
                Err(FilterError::InvalidRipple(self.ripple_db))
            }
            FilterDesign::Bessel if self.order > bessel::MAX_ORDER => {
                Err(FilterError::OrderNotTabulated {
                    order: self.order,
                    max: bessel::MAX_ORDER,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Recurrence coefficients, newest sample first
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCoefficients {
    /// Multipliers for the input history; `order + 1` terms
    pub numerator: Vec<f64>,
    /// Multipliers for the output history; `order + 1` terms, the first
    /// belongs to the output being computed and is never applied
    pub denominator: Vec<f64>,
    /// Magnitude of the transfer function at z = 1
    pub dc_gain: f64,
    /// Magnitude of the transfer function at the corner frequency
    pub corner_gain: f64,
    /// Magnitude of the transfer function at z = -1
    pub hf_gain: f64,
}

impl FilterCoefficients {
    /// Number of terms in each coefficient sequence
    pub fn len(&self) -> usize {
        self.numerator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numerator.is_empty()
    }
}

/// Designs recurrence coefficients from a [`FilterSpec`]
pub struct FilterDesigner;

impl FilterDesigner {
    pub fn design(spec: &FilterSpec) -> Result<FilterCoefficients, FilterError> {
        spec.validate()?;

        let alpha = 1.0 / spec.corner_multiplier;
        let poles = s_plane_poles(spec)?;
        let warped = prewarp(alpha, spec.transform);
        let poles = normalize(poles, warped);
        let (z_poles, z_zeros) = z_plane(&poles, spec.transform);

        let mut top = expand(&z_zeros);
        let bot = expand(&z_poles);
        // matched-z has no finite zeros; delay the numerator to the full
        // order so both sequences line up with the history buffers
        top.resize(bot.len(), Complex64::new(0.0, 0.0));

        let one = Complex64::new(1.0, 0.0);
        let theta = Complex64::from_polar(1.0, 2.0 * PI * alpha);
        let dc_gain = (eval(&top, one) / eval(&bot, one)).norm();
        let corner_gain = (eval(&top, theta) / eval(&bot, theta)).norm();
        let hf_gain = (eval(&top, -one) / eval(&bot, -one)).norm();
        if !dc_gain.is_finite() || dc_gain == 0.0 {
            return Err(FilterError::DegenerateGain(dc_gain));
        }

        let lead = bot.last().map(|c| c.re).unwrap_or(1.0);
        let numerator = top.iter().rev().map(|c| c.re / lead).collect();
        let denominator = bot.iter().rev().map(|c| -(c.re / lead)).collect();

        debug!(
            "Designed {} order {} corner {:.1} ({:?}): dc gain {:.6e}",
            spec.design, spec.order, spec.corner_multiplier, spec.transform, dc_gain
        );

        Ok(FilterCoefficients {
            numerator,
            denominator,
            dc_gain,
            corner_gain,
            hf_gain,
        })
    }
}

/// Prototype poles with a negative real part
fn s_plane_poles(spec: &FilterSpec) -> Result<Vec<Complex64>, FilterError> {
    let order = spec.order;
    let mut poles = match spec.design {
        FilterDesign::Bessel => bessel::poles(order).ok_or(FilterError::OrderNotTabulated {
            order,
            max: bessel::MAX_ORDER,
        })?,
        FilterDesign::Butterworth | FilterDesign::Chebyshev => {
            let n = f64::from(order);
            (0..2 * order)
                .map(|i| {
                    let i = f64::from(i);
                    let theta = if order % 2 == 1 {
                        i * PI / n
                    } else {
                        (i + 0.5) * PI / n
                    };
                    Complex64::from_polar(1.0, theta)
                })
                .collect()
        }
    };
    poles.retain(|p| p.re < 0.0);

    if spec.design == FilterDesign::Chebyshev {
        let eps = (10f64.powf(-spec.ripple_db / 10.0) - 1.0).sqrt();
        let y = (1.0 / eps).asinh() / f64::from(order);
        for p in poles.iter_mut() {
            p.re *= y.sinh();
            p.im *= y.cosh();
        }
    }

    Ok(poles)
}

fn prewarp(alpha: f64, transform: Transform) -> f64 {
    match transform {
        Transform::Bilinear => (PI * alpha).tan() / PI,
        Transform::MatchedZ => alpha,
    }
}

fn normalize(poles: Vec<Complex64>, warped: f64) -> Vec<Complex64> {
    let w = 2.0 * PI * warped;
    poles.into_iter().map(|p| p * w).collect()
}

/// Map s-plane poles to z-plane poles and zeros
fn z_plane(poles: &[Complex64], transform: Transform) -> (Vec<Complex64>, Vec<Complex64>) {
    match transform {
        Transform::Bilinear => {
            let two = Complex64::new(2.0, 0.0);
            let z_poles = poles.iter().map(|s| (two + *s) / (two - *s)).collect();
            let z_zeros = vec![Complex64::new(-1.0, 0.0); poles.len()];
            (z_poles, z_zeros)
        }
        Transform::MatchedZ => (poles.iter().map(|s| s.exp()).collect(), Vec::new()),
    }
}

/// Expand `prod(z - r)` into coefficients of ascending powers of z
fn expand(roots: &[Complex64]) -> Vec<Complex64> {
    let mut coeffs = vec![Complex64::new(0.0, 0.0); roots.len() + 1];
    coeffs[0] = Complex64::new(1.0, 0.0);

    for r in roots {
        let nw = -*r;
        for i in (1..coeffs.len()).rev() {
            coeffs[i] = nw * coeffs[i] + coeffs[i - 1];
        }
        coeffs[0] *= nw;
    }

    for (power, c) in coeffs.iter().enumerate() {
        if c.im.abs() > REAL_TOLERANCE {
            warn!(
                "Coefficient of z^{} is not real ({:e}); poles or zeros are not conjugate pairs",
                power, c.im
            );
        }
    }
    coeffs
}

/// Evaluate a polynomial with ascending coefficients at `z`
fn eval(coeffs: &[Complex64], z: Complex64) -> Complex64 {
    coeffs
        .iter()
        .rev()
        .fold(Complex64::new(0.0, 0.0), |sum, c| sum * z + *c)
}
