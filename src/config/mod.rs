//! Run configuration, every field has a default matching the reference benchmark
//! and can be overridden from the `[simulation]` table of a TOML file.
//!
//! ```toml
//! [simulation]
//! compartments = 4096
//! dt = 0.01
//! stoptime = 400.0
//! parallel = true
//! conductance_mode = "shared"
//! backend = "cpu"
//! ```

use std::{fs::read_to_string, path::Path};
use toml::{from_str, Value};
use crate::compartments::{ConductanceMode, MembraneParameters};
use crate::driver::{INJECTION_AMPLITUDE, INJECTION_START, INJECTION_STOP};
use crate::error::ConfigurationError;
use crate::table::TableParameters;


/// Default number of compartments
pub const COMPARTMENTS: usize = 1024;
/// Default timestep (ms)
pub const DT: f64 = 0.01;
/// Default simulated duration (ms)
pub const STOPTIME: f64 = 400.;

/// Device the step kernel executes on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Rayon or sequential execution on the host
    #[default]
    Cpu,
    /// OpenCL execution, requires the `gpu` feature
    Gpu,
}

/// Everything needed to build and run a benchmark
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Number of independent compartments
    pub compartments: usize,
    /// Timestep (ms)
    pub dt: f64,
    /// Simulated duration (ms)
    pub stoptime: f64,
    /// Whether the step kernel runs its phases in parallel
    pub parallel: bool,
    /// Device the step kernel executes on
    pub backend: Backend,
    /// Lookup table sampling
    pub table: TableParameters,
    /// Initial voltage and membrane parameters shared by every compartment
    pub membrane: MembraneParameters,
    /// Where the voltage update reads membrane parameters from
    pub conductance_mode: ConductanceMode,
    /// Amplitude of the injected current pulse
    pub injection_amplitude: f64,
    /// Start of the injection window (ms)
    pub injection_start: f64,
    /// End of the injection window (ms)
    pub injection_stop: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            compartments: COMPARTMENTS,
            dt: DT,
            stoptime: STOPTIME,
            parallel: true,
            backend: Backend::Cpu,
            table: TableParameters::default(),
            membrane: MembraneParameters::default(),
            conductance_mode: ConductanceMode::Shared,
            injection_amplitude: INJECTION_AMPLITUDE,
            injection_start: INJECTION_START,
            injection_stop: INJECTION_STOP,
        }
    }
}

impl SimulationConfig {
    /// Checks every field before any state is built
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.compartments == 0 {
            return Err(ConfigurationError::NoCompartments);
        }
        if !self.dt.is_finite() || self.dt <= 0. {
            return Err(ConfigurationError::InvalidTimestep(self.dt));
        }
        if !self.stoptime.is_finite() || self.stoptime < 0. {
            return Err(ConfigurationError::InvalidStoptime(self.stoptime));
        }
        if self.backend == Backend::Gpu && !cfg!(feature = "gpu") {
            return Err(ConfigurationError::UnavailableBackend(String::from("gpu")));
        }
        self.table.validate()?;
        self.membrane.validate()?;
        if self.injection_start.is_nan() || self.injection_stop.is_nan() ||
            self.injection_start < 0. || self.injection_start > self.injection_stop {
            return Err(ConfigurationError::InvalidInjectionWindow(self.injection_start, self.injection_stop));
        }

        Ok(())
    }

    /// Reads overrides from the `[simulation]` table of a TOML document, a
    /// document without that table yields the defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigurationError> {
        let document: Value = from_str(content)
            .map_err(|e| ConfigurationError::UnreadableConfig(e.to_string()))?;

        let mut config = SimulationConfig::default();

        let table = match document.get("simulation") {
            Some(table) => table,
            None => return Ok(config),
        };

        config.compartments = parse_value_with_default(table, "compartments", parse_usize, config.compartments)?;
        config.dt = parse_value_with_default(table, "dt", parse_f64, config.dt)?;
        config.stoptime = parse_value_with_default(table, "stoptime", parse_f64, config.stoptime)?;
        config.parallel = parse_value_with_default(table, "parallel", parse_bool, config.parallel)?;
        config.backend = parse_value_with_default(table, "backend", parse_backend, config.backend)?;

        config.table.size = parse_value_with_default(table, "table_size", parse_usize, config.table.size)?;
        config.table.min_v = parse_value_with_default(table, "table_min_v", parse_f64, config.table.min_v)?;
        config.table.max_v = parse_value_with_default(table, "table_max_v", parse_f64, config.table.max_v)?;

        config.membrane.v_init = parse_value_with_default(table, "v_init", parse_f64, config.membrane.v_init)?;
        config.membrane.c_m = parse_value_with_default(table, "c_m", parse_f64, config.membrane.c_m)?;
        config.membrane.gk_max = parse_value_with_default(table, "gk_max", parse_f64, config.membrane.gk_max)?;
        config.membrane.gna_max = parse_value_with_default(table, "gna_max", parse_f64, config.membrane.gna_max)?;
        config.membrane.gm = parse_value_with_default(table, "gm", parse_f64, config.membrane.gm)?;

        config.conductance_mode = parse_value_with_default(
            table,
            "conductance_mode",
            parse_conductance_mode,
            config.conductance_mode,
        )?;

        config.injection_amplitude = parse_value_with_default(
            table, "injection_amplitude", parse_f64, config.injection_amplitude
        )?;
        config.injection_start = parse_value_with_default(
            table, "injection_start", parse_f64, config.injection_start
        )?;
        config.injection_stop = parse_value_with_default(
            table, "injection_stop", parse_f64, config.injection_stop
        )?;

        Ok(config)
    }

    /// Reads a TOML config file, see [`SimulationConfig::from_toml_str`]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let content = read_to_string(path.as_ref())
            .map_err(|e| ConfigurationError::UnreadableConfig(format!("{}: {}", path.as_ref().display(), e)))?;

        SimulationConfig::from_toml_str(&content)
    }
}

fn parse_bool(value: &Value, field_name: &str) -> Result<bool, ConfigurationError> {
    value
        .as_bool()
        .ok_or_else(|| ConfigurationError::UnparsableField(field_name.to_string()))
}

fn parse_usize(value: &Value, field_name: &str) -> Result<usize, ConfigurationError> {
    value
        .as_integer()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| ConfigurationError::UnparsableField(field_name.to_string()))
}

// integers are accepted where floats are expected
fn parse_f64(value: &Value, field_name: &str) -> Result<f64, ConfigurationError> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|v| v as f64))
        .ok_or_else(|| ConfigurationError::UnparsableField(field_name.to_string()))
}

fn parse_conductance_mode(value: &Value, field_name: &str) -> Result<ConductanceMode, ConfigurationError> {
    let mode = value
        .as_str()
        .ok_or_else(|| ConfigurationError::UnparsableField(field_name.to_string()))?;

    match mode {
        "shared" => Ok(ConductanceMode::Shared),
        "per_compartment" => Ok(ConductanceMode::PerCompartment),
        _ => Err(ConfigurationError::UnknownConductanceMode(mode.to_string())),
    }
}

fn parse_backend(value: &Value, field_name: &str) -> Result<Backend, ConfigurationError> {
    let backend = value
        .as_str()
        .ok_or_else(|| ConfigurationError::UnparsableField(field_name.to_string()))?;

    match backend {
        "cpu" => Ok(Backend::Cpu),
        "gpu" => Ok(Backend::Gpu),
        _ => Err(ConfigurationError::UnavailableBackend(backend.to_string())),
    }
}

fn parse_value_with_default<T>(
    table: &Value,
    key: &str,
    parser: impl Fn(&Value, &str) -> Result<T, ConfigurationError>,
    default: T,
) -> Result<T, ConfigurationError> {
    table
        .get(key)
        .map_or(Ok(default), |value| parser(value, key))
}
