//! Owned per-compartment state, voltages and gating variables evolve every tick
//! while the membrane parameters are fixed once the store is built.

use std::ops::Range;
use rand::Rng;
use crate::error::ConfigurationError;
use crate::kinetics::GatingVariable;


/// Potassium reversal potential (mV)
pub const E_K: f64 = -77.;
/// Sodium reversal potential (mV)
pub const E_NA: f64 = 50.;
/// Leak reversal potential (mV)
pub const V_REST: f64 = -54.3;

/// Default initial membrane potential (mV)
pub const V_INIT: f64 = -65.;

/// Passive and channel parameters of a compartment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MembraneParameters {
    /// Initial membrane potential (mV)
    pub v_init: f64,
    /// Membrane capacitance (uF/cm^2)
    pub c_m: f64,
    /// Maximum potassium conductance (mS/cm^2)
    pub gk_max: f64,
    /// Maximum sodium conductance (mS/cm^2)
    pub gna_max: f64,
    /// Leak conductance (mS/cm^2)
    pub gm: f64,
}

impl Default for MembraneParameters {
    fn default() -> Self {
        MembraneParameters {
            v_init: V_INIT,
            c_m: 1.,
            gk_max: 36.,
            gna_max: 120.,
            gm: 0.3,
        }
    }
}

impl MembraneParameters {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.c_m.is_finite() || self.c_m <= 0. {
            return Err(ConfigurationError::InvalidCapacitance(self.c_m));
        }

        Ok(())
    }
}

/// Selects where the voltage update reads membrane parameters from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConductanceMode {
    /// Every compartment uses the parameters of compartment 0
    #[default]
    Shared,
    /// Every compartment uses its own parameters
    PerCompartment,
}

/// Structure of arrays holding every compartment's state
#[derive(Debug, Clone, PartialEq)]
pub struct CompartmentStore {
    /// Membrane potentials (mV)
    pub(crate) v: Vec<f64>,
    /// Potassium activation
    pub(crate) n: Vec<f64>,
    /// Sodium activation
    pub(crate) m: Vec<f64>,
    /// Sodium inactivation
    pub(crate) h: Vec<f64>,
    pub(crate) c_m: Vec<f64>,
    pub(crate) c_m_inv: Vec<f64>,
    pub(crate) gk_max: Vec<f64>,
    pub(crate) gna_max: Vec<f64>,
    pub(crate) gm: Vec<f64>,
}

impl CompartmentStore {
    /// Creates `size` compartments at `v_init` with every gate at its steady
    /// state, computed directly from the rate functions
    pub fn new(size: usize, parameters: &MembraneParameters) -> Result<Self, ConfigurationError> {
        if size == 0 {
            return Err(ConfigurationError::NoCompartments);
        }
        parameters.validate()?;

        let v_init = parameters.v_init;

        Ok(
            CompartmentStore {
                v: vec![v_init; size],
                n: vec![GatingVariable::N.steady_state(v_init); size],
                m: vec![GatingVariable::M.steady_state(v_init); size],
                h: vec![GatingVariable::H.steady_state(v_init); size],
                c_m: vec![parameters.c_m; size],
                c_m_inv: vec![1. / parameters.c_m; size],
                gk_max: vec![parameters.gk_max; size],
                gna_max: vec![parameters.gna_max; size],
                gm: vec![parameters.gm; size],
            }
        )
    }

    pub fn len(&self) -> usize {
        self.v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }

    pub fn voltages(&self) -> &[f64] {
        &self.v
    }

    pub fn n(&self) -> &[f64] {
        &self.n
    }

    pub fn m(&self) -> &[f64] {
        &self.m
    }

    pub fn h(&self) -> &[f64] {
        &self.h
    }

    /// Membrane potential of a single compartment (mV)
    pub fn voltage(&self, index: usize) -> f64 {
        self.v[index]
    }

    /// Overrides the membrane potential of a single compartment, gates are left untouched
    pub fn set_voltage(&mut self, index: usize, voltage: f64) {
        self.v[index] = voltage;
    }

    /// Draws every membrane potential uniformly from `range`
    pub fn randomize_voltages<R: Rng>(&mut self, rng: &mut R, range: Range<f64>) {
        self.v.iter_mut()
            .for_each(|v| *v = rng.gen_range(range.clone()));
    }

    /// Membrane parameters of a single compartment, `v_init` holds the
    /// compartment's present voltage rather than the one it started from, so the
    /// result seeds a new store at the compartment's current potential
    pub fn parameters(&self, index: usize) -> MembraneParameters {
        MembraneParameters {
            v_init: self.v[index],
            c_m: self.c_m[index],
            gk_max: self.gk_max[index],
            gna_max: self.gna_max[index],
            gm: self.gm[index],
        }
    }

    /// Replaces the membrane parameters of a single compartment, only read
    /// during stepping under [`ConductanceMode::PerCompartment`] (or for index 0),
    /// `v_init` is ignored
    pub fn set_parameters(
        &mut self,
        index: usize,
        parameters: &MembraneParameters
    ) -> Result<(), ConfigurationError> {
        parameters.validate()?;

        self.c_m[index] = parameters.c_m;
        self.c_m_inv[index] = 1. / parameters.c_m;
        self.gk_max[index] = parameters.gk_max;
        self.gna_max[index] = parameters.gna_max;
        self.gm[index] = parameters.gm;

        Ok(())
    }
}
