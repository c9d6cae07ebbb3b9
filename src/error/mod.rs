use std::fmt::{Display, Debug, Formatter, Result};


/// Error set for invalid simulation configurations
pub enum ConfigurationError {
    /// Compartment count must be at least one
    NoCompartments,
    /// Timestep must be positive and finite
    InvalidTimestep(f64),
    /// Stop time must be non-negative and finite
    InvalidStoptime(f64),
    /// Lookup table must have at least two samples
    TableTooSmall(usize),
    /// Lookup table voltage bounds must be finite with the minimum below the maximum
    InvalidTableBounds(f64, f64),
    /// Membrane capacitance must be positive and finite
    InvalidCapacitance(f64),
    /// Injection window must start before it stops
    InvalidInjectionWindow(f64, f64),
    /// Conductance mode is not recognized
    UnknownConductanceMode(String),
    /// Backend is not recognized or was not compiled in
    UnavailableBackend(String),
    /// Field in the configuration could not be parsed as the expected type
    UnparsableField(String),
    /// Configuration file could not be read or parsed
    UnreadableConfig(String),
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            ConfigurationError::NoCompartments => write!(f, "Compartment count must be at least 1"),
            ConfigurationError::InvalidTimestep(dt) => write!(f, "Timestep must be positive and finite, got {}", dt),
            ConfigurationError::InvalidStoptime(stoptime) => write!(f, "Stop time must be non-negative and finite, got {}", stoptime),
            ConfigurationError::TableTooSmall(size) => write!(f, "Lookup table requires at least 2 samples, got {}", size),
            ConfigurationError::InvalidTableBounds(min_v, max_v) => {
                write!(f, "Lookup table bounds must be finite with min < max, got [{}, {}]", min_v, max_v)
            },
            ConfigurationError::InvalidCapacitance(c_m) => write!(f, "Membrane capacitance must be positive and finite, got {}", c_m),
            ConfigurationError::InvalidInjectionWindow(start, stop) => {
                write!(f, "Injection window must satisfy start <= stop, got ({}, {})", start, stop)
            },
            ConfigurationError::UnknownConductanceMode(mode) => {
                write!(f, "Unknown conductance mode '{}', expected 'shared' or 'per_compartment'", mode)
            },
            ConfigurationError::UnavailableBackend(backend) => {
                write!(f, "Backend '{}' is unavailable, expected 'cpu' or 'gpu' (requires the gpu feature)", backend)
            },
            ConfigurationError::UnparsableField(field) => write!(f, "Cannot parse field '{}'", field),
            ConfigurationError::UnreadableConfig(reason) => write!(f, "Cannot read config: {}", reason),
        }
    }
}

impl Debug for ConfigurationError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "file: {}, line: {}, error: {}", file!(), line!(), self)
    }
}

#[cfg(feature = "gpu")]
/// Error set for potential OpenCL backend errors
pub enum GPUError {
    /// No usable device or context could be created
    GetDeviceFailure,
    /// OpenCL program failed to build
    ProgramCompileFailure,
    /// Kernel could not be created from the program
    KernelCompileFailure,
    /// Buffer could not be allocated
    BufferCreateError,
    /// Buffer could not be written to
    BufferWriteError,
    /// Buffer could not be read from
    BufferReadError,
    /// Kernel could not be enqueued
    QueueFailure,
    /// Waiting on an event failed
    WaitError,
    /// Host state does not match the size of the device buffers
    SizeMismatch,
}

#[cfg(feature = "gpu")]
impl Display for GPUError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        let err_msg = match self {
            GPUError::GetDeviceFailure => "Could not get GPU device",
            GPUError::ProgramCompileFailure => "Could not compile program",
            GPUError::KernelCompileFailure => "Could not compile kernel",
            GPUError::BufferCreateError => "Could not create buffer",
            GPUError::BufferWriteError => "Could not write to buffer",
            GPUError::BufferReadError => "Could not read from buffer",
            GPUError::QueueFailure => "Could not enqueue kernel",
            GPUError::WaitError => "Could not wait for event",
            GPUError::SizeMismatch => "Host state size does not match device buffers",
        };

        write!(f, "{}", err_msg)
    }
}

#[cfg(feature = "gpu")]
impl Debug for GPUError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "file: {}, line: {}, error: {}", file!(), line!(), self)
    }
}

/// A set of errors that may occur when using the library
pub enum HodgkinHuxleyError {
    /// Errors related to configuration
    ConfigurationRelatedError(ConfigurationError),
    #[cfg(feature = "gpu")]
    /// Errors related to the OpenCL backend
    GPURelatedError(GPUError),
    /// Errors writing the observation trace
    OutputError(std::io::Error),
}

impl Display for HodgkinHuxleyError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            HodgkinHuxleyError::ConfigurationRelatedError(err) => write!(f, "{}", err),
            #[cfg(feature = "gpu")]
            HodgkinHuxleyError::GPURelatedError(err) => write!(f, "{}", err),
            HodgkinHuxleyError::OutputError(err) => write!(f, "Could not write trace: {}", err),
        }
    }
}

impl Debug for HodgkinHuxleyError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "file: {}, line: {}, error: {}", file!(), line!(), self)
    }
}

impl std::error::Error for HodgkinHuxleyError {}

impl From<ConfigurationError> for HodgkinHuxleyError {
    fn from(err: ConfigurationError) -> HodgkinHuxleyError {
        HodgkinHuxleyError::ConfigurationRelatedError(err)
    }
}

#[cfg(feature = "gpu")]
impl From<GPUError> for HodgkinHuxleyError {
    fn from(err: GPUError) -> HodgkinHuxleyError {
        HodgkinHuxleyError::GPURelatedError(err)
    }
}

impl From<std::io::Error> for HodgkinHuxleyError {
    fn from(err: std::io::Error) -> HodgkinHuxleyError {
        HodgkinHuxleyError::OutputError(err)
    }
}
