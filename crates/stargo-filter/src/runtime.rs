//! Running filter state

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::design::{FilterCoefficients, FilterDesigner, FilterSpec};
use crate::error::FilterError;

/// A designed filter plus its sample history
///
/// Every output is folded back into the next input: the filter sees the
/// uncorrected waveform (raw sample plus everything already corrected) and
/// returns only the part of its output not yet applied.
// FIXME: folding every returned delta into the next input changes the loop
// response away from the designed one (a first-order design overshoots and
// rings). Needs checking against drift logs from a real mount.
#[derive(Debug, Clone)]
pub struct DigitalFilter {
    spec: FilterSpec,
    coeffs: FilterCoefficients,
    inputs: VecDeque<f64>,
    outputs: VecDeque<f64>,
    cumulative: f64,
}

impl DigitalFilter {
    pub fn new(spec: FilterSpec) -> Result<Self, FilterError> {
        let coeffs = FilterDesigner::design(&spec)?;
        let len = coeffs.len();
        Ok(Self {
            spec,
            coeffs,
            inputs: VecDeque::from(vec![0.0; len]),
            outputs: VecDeque::from(vec![0.0; len]),
            cumulative: 0.0,
        })
    }

    /// Replace the coefficient set and clear the history
    ///
    /// On error the filter keeps its previous design and history.
    pub fn rebuild(&mut self, spec: FilterSpec) -> Result<(), FilterError> {
        let coeffs = FilterDesigner::design(&spec)?;
        self.spec = spec;
        self.coeffs = coeffs;
        self.reset();
        debug!(
            "Rebuilt {} filter, order {}, corner {:.1} samples",
            self.spec.design, self.spec.order, self.spec.corner_multiplier
        );
        Ok(())
    }

    /// Feed one sample, returning the correction still to be applied
    pub fn add_sample(&mut self, input: f64) -> f64 {
        let gain = self.coeffs.dc_gain;

        self.inputs.push_front((input + self.cumulative) / gain);
        self.inputs.pop_back();
        self.outputs.push_front(0.0);
        self.outputs.pop_back();

        let forward: f64 = self
            .inputs
            .iter()
            .zip(&self.coeffs.numerator)
            .map(|(x, c)| x * c)
            .sum();
        let feedback: f64 = self
            .outputs
            .iter()
            .zip(&self.coeffs.denominator)
            .skip(1)
            .map(|(y, c)| y * c)
            .sum();
        let output = forward + feedback;
        if let Some(newest) = self.outputs.front_mut() {
            *newest = output;
        }

        let delta = output - self.cumulative;
        self.cumulative += delta;
        trace!(
            "Filter in {:.3} out {:.3} delta {:.3}",
            input,
            output,
            delta
        );
        delta
    }

    /// Zero the history and the accumulated correction
    pub fn reset(&mut self) {
        let len = self.coeffs.len();
        self.inputs.clear();
        self.inputs.resize(len, 0.0);
        self.outputs.clear();
        self.outputs.resize(len, 0.0);
        self.cumulative = 0.0;
    }

    /// Sum of every delta returned since the last reset
    pub fn cumulative_correction(&self) -> f64 {
        self.cumulative
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn coefficients(&self) -> &FilterCoefficients {
        &self.coeffs
    }

    /// DC gain used to normalize the input
    pub fn gain(&self) -> f64 {
        self.coeffs.dc_gain
    }

    /// Corner period in samples
    pub fn corner_period(&self) -> f64 {
        self.spec.corner_multiplier
    }

    pub fn order(&self) -> u32 {
        self.spec.order
    }

    pub fn name(&self) -> &'static str {
        self.spec.design.name()
    }
}
