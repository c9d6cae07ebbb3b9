//! # Hodgkin Huxley Benchmark
//!
//! `hh_benchmark` integrates the Hodgkin Huxley membrane model for a large
//! population of independent, uncoupled compartments and is intended as a
//! throughput benchmark for data-parallel numeric code. Gating kinetics are
//! precomputed into a lookup table once, then every tick each compartment
//! interpolates its time constants and steady states from the table, advances
//! its gates with exponential Euler, and takes an explicit Euler voltage step.
//! Ticks can run sequentially, in parallel with rayon, or (with the `gpu`
//! feature) on an OpenCL device.
//!
//! ## Example Code
//!
//! ### Running the benchmark from a configuration
//!
//! ```rust
//! use hh_benchmark::{
//!     config::SimulationConfig,
//!     driver::{simulate, Observation},
//! };
//!
//! let config = SimulationConfig {
//!     compartments: 16,
//!     stoptime: 20.,
//!     ..SimulationConfig::default()
//! };
//!
//! let mut trace: Vec<Observation> = vec![];
//! let (store, summary) = simulate(&config, &mut trace).unwrap();
//!
//! assert_eq!(summary.ticks, 2000);
//! assert_eq!(trace.len(), summary.ticks);
//! assert_eq!(store.len(), 16);
//! ```
//!
//! ### Stepping compartments by hand
//!
//! ```rust
//! use hh_benchmark::{
//!     compartments::{CompartmentStore, MembraneParameters},
//!     kernel::StepKernel,
//!     table::{LookupTable, TableParameters},
//! };
//!
//! let table = LookupTable::build(&TableParameters::default()).unwrap();
//! let mut store = CompartmentStore::new(1024, &MembraneParameters::default()).unwrap();
//! let mut kernel = StepKernel::new(table, 0.01).unwrap();
//!
//! // 1 ms of a 10 uA/cm^2 pulse
//! for _ in 0..100 {
//!     kernel.step(&mut store, 10.);
//! }
//!
//! assert!(store.voltages().iter().all(|v| v.is_finite()));
//! ```

pub mod error;
pub mod kinetics;
pub mod table;
pub mod compartments;
pub mod kernel;
pub mod driver;
pub mod config;
#[cfg(feature = "gpu")]
pub mod gpu;
