use std::{env, io::{stdout, BufWriter}};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use hh_benchmark::{
    config::{Backend, SimulationConfig},
    driver::{simulate, TraceWriter},
    error::HodgkinHuxleyError,
};


fn main() -> Result<(), HodgkinHuxleyError> {
    // stdout carries the trace, logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();

    let config = match args.get(1) {
        Some(path) => {
            info!("reading config from {}", path);
            SimulationConfig::from_file(path)?
        },
        None => SimulationConfig::default(),
    };
    config.validate()?;

    info!(
        compartments = config.compartments,
        dt = config.dt,
        stoptime = config.stoptime,
        parallel = config.parallel,
        backend = ?config.backend,
        conductance_mode = ?config.conductance_mode,
        "configuration loaded"
    );

    let mut trace = TraceWriter::new(BufWriter::new(stdout().lock()));
    trace.write_header()?;

    let (_, summary) = match config.backend {
        Backend::Cpu => simulate(&config, &mut trace)?,
        #[cfg(feature = "gpu")]
        Backend::Gpu => hh_benchmark::gpu::simulate_gpu(&config, &mut trace)?,
        #[cfg(not(feature = "gpu"))]
        Backend::Gpu => return Err(hh_benchmark::error::ConfigurationError::UnavailableBackend(String::from("gpu")).into()),
    };

    trace.finish()?;

    info!(
        ticks = summary.ticks,
        compartments = summary.compartments,
        elapsed_ms = summary.elapsed.as_secs_f64() * 1000.,
        updates_per_second = summary.throughput(),
        "finished"
    );

    Ok(())
}
