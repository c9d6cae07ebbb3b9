//! The per tick update of every compartment.
//!
//! A tick runs in three full passes over the compartments:
//!
//! 1. each voltage is located in the lookup table, giving a lower sample index
//!    and an interpolation fraction
//! 2. those positions are clamped into the table
//! 3. the gates are advanced with exponential Euler towards the interpolated
//!    steady states, then the voltage takes an explicit Euler step of the
//!    current balance equation
//!
//! Each pass finishes for every compartment before the next begins. When
//! [`StepKernel::parallel`] is set, each pass is a rayon parallel iterator over
//! disjoint per-compartment slices, so the end of one parallel iterator is the
//! barrier before the next. Sequential and parallel execution produce identical
//! results since no compartment ever reads another's state.

use std::ops::Range;
use rayon::prelude::*;
use crate::compartments::{CompartmentStore, ConductanceMode, E_K, E_NA, V_REST};
use crate::error::ConfigurationError;
use crate::kinetics::exp_safe;
use crate::table::{ClampedPosition, LookupTable, TablePosition};


/// Parameters of the current balance equation for one compartment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conductances {
    /// Reciprocal membrane capacitance (cm^2/uF)
    pub c_m_inv: f64,
    /// Maximum potassium conductance (mS/cm^2)
    pub gk_max: f64,
    /// Maximum sodium conductance (mS/cm^2)
    pub gna_max: f64,
    /// Leak conductance (mS/cm^2)
    pub gm: f64,
}

impl Conductances {
    fn of(store: &CompartmentStore, index: usize) -> Self {
        Conductances {
            c_m_inv: store.c_m_inv[index],
            gk_max: store.gk_max[index],
            gna_max: store.gna_max[index],
            gm: store.gm[index],
        }
    }
}

/// Advances a single compartment given its clamped table position
#[allow(clippy::too_many_arguments)]
#[inline]
pub fn advance_compartment(
    table: &LookupTable,
    dt: f64,
    conductances: &Conductances,
    input_current: f64,
    position: &ClampedPosition,
    v: &mut f64,
    n: &mut f64,
    m: &mut f64,
    h: &mut f64,
) {
    let sample = table.interpolate(position);

    let n_delta = sample.n_inf - *n;
    let m_delta = sample.m_inf - *m;
    let h_delta = sample.h_inf - *h;

    *n += (1. - exp_safe(-dt / sample.tau_n)) * n_delta;
    *m += (1. - exp_safe(-dt / sample.tau_m)) * m_delta;
    *h += (1. - exp_safe(-dt / sample.tau_h)) * h_delta;

    let i_k = conductances.gk_max * *n * *n * *n * *n * (E_K - *v);
    let i_na = conductances.gna_max * *m * *m * *m * *h * (E_NA - *v);
    let i_leak = conductances.gm * (V_REST - *v);

    *v += dt * conductances.c_m_inv * (i_k + i_na + i_leak + input_current);
}

/// Table driven Hodgkin Huxley update over a [`CompartmentStore`]
#[derive(Debug, Clone)]
pub struct StepKernel {
    table: LookupTable,
    dt: f64,
    /// Whether to run each phase as a parallel iterator
    pub parallel: bool,
    /// Where the voltage update reads membrane parameters from
    pub conductance_mode: ConductanceMode,
    // scratch, one entry per compartment, reused across ticks
    raw_positions: Vec<TablePosition>,
    positions: Vec<ClampedPosition>,
}

impl StepKernel {
    /// Creates a parallel kernel with shared conductances, `dt` in ms
    pub fn new(table: LookupTable, dt: f64) -> Result<Self, ConfigurationError> {
        if !dt.is_finite() || dt <= 0. {
            return Err(ConfigurationError::InvalidTimestep(dt));
        }

        Ok(
            StepKernel {
                table,
                dt,
                parallel: true,
                conductance_mode: ConductanceMode::Shared,
                raw_positions: vec![],
                positions: vec![],
            }
        )
    }

    pub fn table(&self) -> &LookupTable {
        &self.table
    }

    /// Timestep (ms)
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Clamped table positions computed during the last tick
    pub fn positions(&self) -> &[ClampedPosition] {
        &self.positions
    }

    /// Advances every compartment by one tick with the given injected current
    pub fn step(&mut self, store: &mut CompartmentStore, input_current: f64) {
        let len = store.len();
        self.step_range(store, 0..len, input_current);
    }

    /// Advances only the compartments in `range` by one tick, compartments outside
    /// the range are left untouched
    pub fn step_range(&mut self, store: &mut CompartmentStore, range: Range<usize>, input_current: f64) {
        if self.positions.len() != store.len() {
            let origin = self.table.clamp(TablePosition::default());
            self.raw_positions.resize(store.len(), TablePosition::default());
            self.positions.resize(store.len(), origin);
        }

        let shared = Conductances::of(store, 0);
        let table = &self.table;
        let dt = self.dt;
        let raw_positions = &mut self.raw_positions[range.clone()];
        let positions = &mut self.positions[range.clone()];

        let CompartmentStore { v, n, m, h, c_m_inv, gk_max, gna_max, gm, .. } = store;
        let v = &mut v[range.clone()];
        let n = &mut n[range.clone()];
        let m = &mut m[range.clone()];
        let h = &mut h[range.clone()];

        if self.parallel {
            raw_positions.par_iter_mut()
                .zip(v.par_iter())
                .for_each(|(raw, voltage)| *raw = table.locate(*voltage));

            positions.par_iter_mut()
                .zip(raw_positions.par_iter())
                .for_each(|(position, raw)| *position = table.clamp(*raw));

            match self.conductance_mode {
                ConductanceMode::Shared => {
                    (v, n, m, h, &*positions).into_par_iter()
                        .for_each(|(v, n, m, h, position)| {
                            advance_compartment(table, dt, &shared, input_current, position, v, n, m, h);
                        });
                },
                ConductanceMode::PerCompartment => {
                    (
                        v, n, m, h, &*positions,
                        &c_m_inv[range.clone()], &gk_max[range.clone()],
                        &gna_max[range.clone()], &gm[range],
                    ).into_par_iter()
                        .for_each(|(v, n, m, h, position, c_m_inv, gk_max, gna_max, gm)| {
                            let conductances = Conductances {
                                c_m_inv: *c_m_inv, gk_max: *gk_max, gna_max: *gna_max, gm: *gm,
                            };
                            advance_compartment(table, dt, &conductances, input_current, position, v, n, m, h);
                        });
                },
            }
        } else {
            for (raw, voltage) in raw_positions.iter_mut().zip(v.iter()) {
                *raw = table.locate(*voltage);
            }

            for (position, raw) in positions.iter_mut().zip(raw_positions.iter()) {
                *position = table.clamp(*raw);
            }

            for j in 0..v.len() {
                let conductances = match self.conductance_mode {
                    ConductanceMode::Shared => shared,
                    ConductanceMode::PerCompartment => {
                        let index = range.start + j;
                        Conductances {
                            c_m_inv: c_m_inv[index],
                            gk_max: gk_max[index],
                            gna_max: gna_max[index],
                            gm: gm[index],
                        }
                    },
                };

                advance_compartment(
                    table, dt, &conductances, input_current, &positions[j],
                    &mut v[j], &mut n[j], &mut m[j], &mut h[j],
                );
            }
        }
    }
}
