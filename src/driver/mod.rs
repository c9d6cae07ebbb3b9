//! Runs the step kernel over simulated time with a square pulse of injected
//! current, reporting the first compartment's voltage after every tick.

use std::{io::Write, time::{Duration, Instant}};
use tracing::debug;
use crate::compartments::CompartmentStore;
use crate::config::SimulationConfig;
use crate::error::{ConfigurationError, HodgkinHuxleyError};
use crate::kernel::StepKernel;
use crate::table::LookupTable;


/// Default injected current amplitude
pub const INJECTION_AMPLITUDE: f64 = 10.;
/// Default start of the injection window (ms)
pub const INJECTION_START: f64 = 50.;
/// Default end of the injection window (ms)
pub const INJECTION_STOP: f64 = 300.;

/// Number of whole ticks of `dt` that fit in `duration`
pub fn ticks_in(duration: f64, dt: f64) -> usize {
    (duration / dt).floor() as usize
}

/// Square pulse of current over tick indices, the pulse is on strictly between
/// `start` and `stop`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InjectionSchedule {
    pub amplitude: f64,
    /// Last tick before the pulse turns on
    pub start: usize,
    /// First tick after the pulse turns off
    pub stop: usize,
}

impl Default for InjectionSchedule {
    fn default() -> Self {
        InjectionSchedule { amplitude: 0., start: 0, stop: 0 }
    }
}

impl InjectionSchedule {
    /// Converts a window given in ms into tick indices
    pub fn from_times(
        amplitude: f64,
        start: f64,
        stop: f64,
        dt: f64,
    ) -> Result<Self, ConfigurationError> {
        if !dt.is_finite() || dt <= 0. {
            return Err(ConfigurationError::InvalidTimestep(dt));
        }
        if start.is_nan() || stop.is_nan() || start > stop || start < 0. {
            return Err(ConfigurationError::InvalidInjectionWindow(start, stop));
        }

        Ok(
            InjectionSchedule {
                amplitude,
                start: ticks_in(start, dt),
                stop: ticks_in(stop, dt),
            }
        )
    }

    /// Injected current at a given tick
    pub fn current_at(&self, tick: usize) -> f64 {
        if tick > self.start && tick < self.stop {
            self.amplitude
        } else {
            0.
        }
    }
}

/// State reported after each tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// `tick * dt` (ms)
    pub time: f64,
    /// Current injected during the tick
    pub injected_current: f64,
    /// Membrane potential of compartment 0 after the tick (mV)
    pub voltage: f64,
}

/// Receives every [`Observation`] of a run, in order
pub trait Observer {
    fn observe(&mut self, observation: &Observation);
}

/// Discards observations
impl Observer for () {
    fn observe(&mut self, _: &Observation) {}
}

/// Keeps the whole trace in memory
impl Observer for Vec<Observation> {
    fn observe(&mut self, observation: &Observation) {
        self.push(*observation);
    }
}

/// Writes one `time, current, voltage` line per observation, the first write
/// failure is kept and returned by [`TraceWriter::finish`]
pub struct TraceWriter<W: Write> {
    writer: W,
    error: Option<std::io::Error>,
}

impl<W: Write> TraceWriter<W> {
    pub fn new(writer: W) -> Self {
        TraceWriter { writer, error: None }
    }

    /// Writes the comment lines preceding the trace
    pub fn write_header(&mut self) -> Result<(), HodgkinHuxleyError> {
        writeln!(self.writer, "# Hodgkin-Huxley Benchmark")?;
        writeln!(self.writer, "# independent compartments, tabulated kinetics")?;
        writeln!(self.writer, "# t , i_inj [nA], V [mV]")?;

        Ok(())
    }

    /// Flushes the writer and returns it, or the first error encountered
    pub fn finish(mut self) -> Result<W, HodgkinHuxleyError> {
        if let Some(err) = self.error.take() {
            return Err(HodgkinHuxleyError::from(err));
        }
        self.writer.flush()?;

        Ok(self.writer)
    }
}

impl<W: Write> Observer for TraceWriter<W> {
    fn observe(&mut self, observation: &Observation) {
        if self.error.is_some() {
            return;
        }

        if let Err(err) = writeln!(
            self.writer,
            "{:.6}, {:.6}, {:.6}",
            observation.time,
            observation.injected_current,
            observation.voltage,
        ) {
            self.error = Some(err);
        }
    }
}

/// Totals of a completed run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub ticks: usize,
    pub compartments: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Compartment updates per second of wall time
    pub fn throughput(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0. {
            (self.ticks * self.compartments) as f64 / seconds
        } else {
            0.
        }
    }
}

/// Loops the step kernel over discrete time
#[derive(Debug, Clone)]
pub struct IntegrationDriver {
    pub kernel: StepKernel,
    pub schedule: InjectionSchedule,
}

impl IntegrationDriver {
    pub fn new(kernel: StepKernel, schedule: InjectionSchedule) -> Self {
        IntegrationDriver { kernel, schedule }
    }

    /// Steps the store for `floor(stoptime / dt)` ticks, reporting compartment 0
    /// after each tick
    pub fn run<O: Observer>(
        &mut self,
        store: &mut CompartmentStore,
        stoptime: f64,
        observer: &mut O,
    ) -> RunSummary {
        let dt = self.kernel.dt();
        let ticks = ticks_in(stoptime, dt);
        debug!(ticks, compartments = store.len(), "starting integration");

        let start = Instant::now();

        for tick in 0..ticks {
            let injected_current = self.schedule.current_at(tick);
            self.kernel.step(store, injected_current);

            observer.observe(
                &Observation {
                    time: tick as f64 * dt,
                    injected_current,
                    voltage: store.voltage(0),
                }
            );
        }

        RunSummary { ticks, compartments: store.len(), elapsed: start.elapsed() }
    }
}

/// Builds the table and state described by `config`, runs the whole benchmark,
/// and returns the final state of every compartment
pub fn simulate<O: Observer>(
    config: &SimulationConfig,
    observer: &mut O,
) -> Result<(CompartmentStore, RunSummary), HodgkinHuxleyError> {
    config.validate()?;

    let table = LookupTable::build(&config.table)?;
    let mut store = CompartmentStore::new(config.compartments, &config.membrane)?;

    let mut kernel = StepKernel::new(table, config.dt)?;
    kernel.parallel = config.parallel;
    kernel.conductance_mode = config.conductance_mode;

    let schedule = InjectionSchedule::from_times(
        config.injection_amplitude,
        config.injection_start,
        config.injection_stop,
        config.dt,
    )?;

    let mut driver = IntegrationDriver::new(kernel, schedule);
    let summary = driver.run(&mut store, config.stoptime, observer);

    Ok((store, summary))
}
