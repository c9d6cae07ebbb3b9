//! Precomputed gating kinetics sampled at uniformly spaced voltages, so the step
//! kernel can replace six transcendental rate evaluations per compartment with
//! a linear interpolation between two neighboring samples.

use ndarray::{Array2, ArrayView1};
use crate::error::ConfigurationError;
use crate::kinetics::{alpha_h, alpha_m, alpha_n, beta_h, beta_m, beta_n};


/// Default number of voltage samples
pub const TABLE_SIZE: usize = 201;
/// Default lowest sampled voltage (mV)
pub const TABLE_MIN_V: f64 = -100.;
/// Default highest sampled voltage (mV)
pub const TABLE_MAX_V: f64 = 100.;

/// Number of precomputed values per sample
pub const VALUES_PER_SAMPLE: usize = 6;

// column offsets within a sample
const N_TAU: usize = 0;
const N_INF: usize = 1;
const M_TAU: usize = 2;
const M_INF: usize = 3;
const H_TAU: usize = 4;
const H_INF: usize = 5;

/// Sampling parameters of a [`LookupTable`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableParameters {
    /// Number of voltage samples, at least 2
    pub size: usize,
    /// Voltage of the first sample (mV)
    pub min_v: f64,
    /// Voltage of the last sample (mV)
    pub max_v: f64,
}

impl Default for TableParameters {
    fn default() -> Self {
        TableParameters {
            size: TABLE_SIZE,
            min_v: TABLE_MIN_V,
            max_v: TABLE_MAX_V,
        }
    }
}

impl TableParameters {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.size < 2 {
            return Err(ConfigurationError::TableTooSmall(self.size));
        }
        if !self.min_v.is_finite() || !self.max_v.is_finite() || self.min_v >= self.max_v {
            return Err(ConfigurationError::InvalidTableBounds(self.min_v, self.max_v));
        }

        Ok(())
    }

    /// Voltage spacing between neighboring samples (mV)
    pub fn step(&self) -> f64 {
        (self.max_v - self.min_v) / (self.size - 1) as f64
    }
}

/// Time constants (ms) and steady states of each gate at a single voltage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableSample {
    pub tau_n: f64,
    pub n_inf: f64,
    pub tau_m: f64,
    pub m_inf: f64,
    pub tau_h: f64,
    pub h_inf: f64,
}

impl TableSample {
    fn from_row(row: ArrayView1<f64>) -> Self {
        TableSample {
            tau_n: row[N_TAU],
            n_inf: row[N_INF],
            tau_m: row[M_TAU],
            m_inf: row[M_INF],
            tau_h: row[H_TAU],
            h_inf: row[H_INF],
        }
    }
}

/// Raw position of a voltage within the table, `index` is the lower sample and
/// `theta` the fraction of the way towards the next sample, the index may lie
/// outside the table
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TablePosition {
    pub index: isize,
    pub theta: f64,
}

/// Position pinned into the table by [`LookupTable::clamp`], the only way to
/// obtain one, so `index + 1` always addresses a real or guard sample
///
/// ```compile_fail
/// use hh_benchmark::table::ClampedPosition;
///
/// let position = ClampedPosition { index: 500, theta: 0.5 };
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampedPosition {
    index: usize,
    theta: f64,
}

impl ClampedPosition {
    /// Lower sample, always below the table size
    pub fn index(&self) -> usize {
        self.index
    }

    /// Fraction of the way towards the next sample
    pub fn theta(&self) -> f64 {
        self.theta
    }
}

/// Immutable table of gating kinetics, holds one guard sample past the last
/// real sample so that reading `index + 1` after clamping is always in bounds
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    parameters: TableParameters,
    step: f64,
    // (size + 1) x 6, sample major
    values: Array2<f64>,
}

impl LookupTable {
    /// Samples the kinetics functions at every table voltage
    pub fn build(parameters: &TableParameters) -> Result<Self, ConfigurationError> {
        parameters.validate()?;

        let step = parameters.step();
        let mut values = Array2::<f64>::zeros((parameters.size + 1, VALUES_PER_SAMPLE));

        for i in 0..parameters.size {
            let v = step * i as f64 + parameters.min_v;

            let (a_n, b_n) = (alpha_n(v), beta_n(v));
            let (a_m, b_m) = (alpha_m(v), beta_m(v));
            let (a_h, b_h) = (alpha_h(v), beta_h(v));

            let tau_n = 1. / (a_n + b_n);
            let tau_m = 1. / (a_m + b_m);
            let tau_h = 1. / (a_h + b_h);

            values[[i, N_TAU]] = tau_n;
            values[[i, N_INF]] = a_n * tau_n;
            values[[i, M_TAU]] = tau_m;
            values[[i, M_INF]] = a_m * tau_m;
            values[[i, H_TAU]] = tau_h;
            values[[i, H_INF]] = a_h * tau_h;
        }

        let last = values.row(parameters.size - 1).to_owned();
        values.row_mut(parameters.size).assign(&last);

        Ok(LookupTable { parameters: *parameters, step, values })
    }

    pub fn parameters(&self) -> &TableParameters {
        &self.parameters
    }

    /// Number of real samples, excluding the guard sample
    pub fn len(&self) -> usize {
        self.parameters.size
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.size == 0
    }

    /// Voltage spacing between samples (mV)
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Voltage a given sample was computed at (mV)
    pub fn voltage_at(&self, index: usize) -> f64 {
        self.step * index as f64 + self.parameters.min_v
    }

    /// Returns the sample at the given index, the guard sample is addressable
    /// at `len()`
    pub fn sample(&self, index: usize) -> TableSample {
        TableSample::from_row(self.values.row(index))
    }

    /// Unclamped position of a voltage, the index may fall outside the table
    pub fn locate(&self, v: f64) -> TablePosition {
        let offset = (v - self.parameters.min_v) / self.step;
        let index = offset.floor();

        TablePosition { index: index as isize, theta: offset - index }
    }

    /// Pins a position into the table, positions past the top land on the last
    /// sample with `theta = 1` and positions below the bottom on the first
    /// sample with `theta = 0`
    pub fn clamp(&self, position: TablePosition) -> ClampedPosition {
        let size = self.parameters.size as isize;
        if position.index >= size {
            ClampedPosition { index: self.parameters.size - 1, theta: 1. }
        } else if position.index < 0 {
            ClampedPosition { index: 0, theta: 0. }
        } else {
            ClampedPosition { index: position.index as usize, theta: position.theta }
        }
    }

    /// Linearly interpolates every column between `index` and `index + 1`
    pub fn interpolate(&self, position: &ClampedPosition) -> TableSample {
        let lower = self.values.row(position.index);
        let upper = self.values.row(position.index + 1);
        let theta = position.theta;

        let lerp = |column: usize| lower[column] + theta * (upper[column] - lower[column]);

        TableSample {
            tau_n: lerp(N_TAU),
            n_inf: lerp(N_INF),
            tau_m: lerp(M_TAU),
            m_inf: lerp(M_INF),
            tau_h: lerp(H_TAU),
            h_inf: lerp(H_INF),
        }
    }

    #[cfg(feature = "gpu")]
    /// Flattened sample major values including the guard sample
    pub(crate) fn as_flat(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}
