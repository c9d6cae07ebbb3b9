//! OpenCL port of the step kernel, one work item per compartment with the
//! lookup table uploaded once as single precision.

use std::ptr;
use opencl3::{
    command_queue::{CommandQueue, CL_QUEUE_PROFILING_ENABLE, CL_QUEUE_SIZE},
    context::Context,
    device::{get_all_devices, Device, CL_DEVICE_TYPE_GPU},
    kernel::{ExecuteKernel, Kernel},
    memory::{Buffer, CL_MEM_READ_WRITE},
    program::Program,
    types::{cl_float, cl_uint, CL_BLOCKING},
};
use tracing::debug;
use crate::compartments::{CompartmentStore, ConductanceMode};
use crate::config::SimulationConfig;
use crate::driver::{ticks_in, InjectionSchedule, Observation, Observer, RunSummary};
use crate::error::{GPUError, HodgkinHuxleyError};
use crate::table::{LookupTable, VALUES_PER_SAMPLE};


const STEP_KERNEL: &str = r#"
__kernel void hh_step(
    __global float *v,
    __global float *n,
    __global float *m,
    __global float *h,
    __global const float *c_m_inv,
    __global const float *gk_max,
    __global const float *gna_max,
    __global const float *gm,
    __global const float *table,
    uint table_size,
    float table_min_v,
    float table_step,
    uint shared_conductances,
    float dt,
    float i_inj
) {
    const float e_k = -77.0f;
    const float e_na = 50.0f;
    const float v_rest = -54.3f;

    int gid = get_global_id(0);
    uint p = shared_conductances ? 0 : gid;

    float offset = (v[gid] - table_min_v) / table_step;
    float lower = floor(offset);
    uint index;
    float theta;

    // pinned before the cast, out of range float to int conversion is undefined
    if (lower >= (float) table_size) {
        index = table_size - 1;
        theta = 1.0f;
    } else if (!(lower >= 0.0f)) {
        index = 0;
        theta = 0.0f;
    } else {
        index = (uint) lower;
        theta = offset - lower;
    }

    __global const float *lo = table + index * 6;
    __global const float *hi = lo + 6;

    float tau_n = lo[0] + theta * (hi[0] - lo[0]);
    float n_inf = lo[1] + theta * (hi[1] - lo[1]);
    float tau_m = lo[2] + theta * (hi[2] - lo[2]);
    float m_inf = lo[3] + theta * (hi[3] - lo[3]);
    float tau_h = lo[4] + theta * (hi[4] - lo[4]);
    float h_inf = lo[5] + theta * (hi[5] - lo[5]);

    float n_j = n[gid] + (1.0f - exp(-dt / tau_n)) * (n_inf - n[gid]);
    float m_j = m[gid] + (1.0f - exp(-dt / tau_m)) * (m_inf - m[gid]);
    float h_j = h[gid] + (1.0f - exp(-dt / tau_h)) * (h_inf - h[gid]);

    float v_j = v[gid];
    float i_k = gk_max[p] * n_j * n_j * n_j * n_j * (e_k - v_j);
    float i_na = gna_max[p] * m_j * m_j * m_j * h_j * (e_na - v_j);
    float i_leak = gm[p] * (v_rest - v_j);

    n[gid] = n_j;
    m[gid] = m_j;
    h[gid] = h_j;
    v[gid] = v_j + dt * c_m_inv[p] * (i_k + i_na + i_leak + i_inj);
}
"#;

const STEP_KERNEL_NAME: &str = "hh_step";

/// An encapsulation of necessary data for GPU kernels
pub struct KernelFunction {
    pub kernel: Kernel,
    pub program_source: String,
    pub kernel_name: String,
}

impl KernelFunction {
    /// Compiles the step kernel for the given context
    pub fn step_kernel(context: &Context) -> Result<Self, GPUError> {
        let program_source = String::from(STEP_KERNEL);
        let kernel_name = String::from(STEP_KERNEL_NAME);

        let program = match Program::create_and_build_from_source(context, &program_source, "") {
            Ok(value) => value,
            Err(_) => return Err(GPUError::ProgramCompileFailure),
        };
        let kernel = match Kernel::create(&program, &kernel_name) {
            Ok(value) => value,
            Err(_) => return Err(GPUError::KernelCompileFailure),
        };

        Ok(KernelFunction { kernel, program_source, kernel_name })
    }
}

/// Creates a context and queue on the first available GPU
pub fn default_context() -> Result<(Context, CommandQueue), GPUError> {
    let device_id = *get_all_devices(CL_DEVICE_TYPE_GPU)
        .map_err(|_| GPUError::GetDeviceFailure)?
        .first()
        .ok_or(GPUError::GetDeviceFailure)?;
    let device = Device::new(device_id);

    let context = Context::from_device(&device)
        .map_err(|_| GPUError::GetDeviceFailure)?;

    let queue = CommandQueue::create_default_with_properties(
            &context,
            CL_QUEUE_PROFILING_ENABLE,
            CL_QUEUE_SIZE,
        )
        .map_err(|_| GPUError::GetDeviceFailure)?;

    Ok((context, queue))
}

fn create_and_write_buffer(
    context: &Context,
    queue: &CommandQueue,
    values: &[cl_float],
) -> Result<Buffer<cl_float>, GPUError> {
    let mut buffer = unsafe {
        Buffer::<cl_float>::create(context, CL_MEM_READ_WRITE, values.len(), ptr::null_mut())
            .map_err(|_| GPUError::BufferCreateError)?
    };

    let write_event = unsafe {
        queue
            .enqueue_write_buffer(&mut buffer, CL_BLOCKING, 0, values, &[])
            .map_err(|_| GPUError::BufferWriteError)?
    };

    write_event.wait().map_err(|_| GPUError::WaitError)?;

    Ok(buffer)
}

fn read_buffer(
    queue: &CommandQueue,
    buffer: &Buffer<cl_float>,
    values: &mut [cl_float],
) -> Result<(), GPUError> {
    let read_event = unsafe {
        queue
            .enqueue_read_buffer(buffer, CL_BLOCKING, 0, values, &[])
            .map_err(|_| GPUError::BufferReadError)?
    };

    read_event.wait().map_err(|_| GPUError::WaitError)?;

    Ok(())
}

fn to_float(values: &[f64]) -> Vec<cl_float> {
    values.iter().map(|i| *i as cl_float).collect()
}

/// Device resident compartment state and the compiled step kernel
pub struct StepKernelGPU {
    kernel_function: KernelFunction,
    size: usize,
    dt: f64,
    table_size: cl_uint,
    table_min_v: cl_float,
    table_step: cl_float,
    shared_conductances: cl_uint,
    v: Buffer<cl_float>,
    n: Buffer<cl_float>,
    m: Buffer<cl_float>,
    h: Buffer<cl_float>,
    c_m_inv: Buffer<cl_float>,
    gk_max: Buffer<cl_float>,
    gna_max: Buffer<cl_float>,
    gm: Buffer<cl_float>,
    table: Buffer<cl_float>,
}

impl StepKernelGPU {
    /// Compiles the kernel and uploads the table and current state of `store`
    pub fn new(
        context: &Context,
        queue: &CommandQueue,
        table: &LookupTable,
        store: &CompartmentStore,
        dt: f64,
        conductance_mode: ConductanceMode,
    ) -> Result<Self, GPUError> {
        let kernel_function = KernelFunction::step_kernel(context)?;

        let flat_table = to_float(&table.as_flat());
        debug_assert_eq!(flat_table.len(), (table.len() + 1) * VALUES_PER_SAMPLE);

        let shared_conductances = match conductance_mode {
            ConductanceMode::Shared => 1,
            ConductanceMode::PerCompartment => 0,
        };

        Ok(
            StepKernelGPU {
                kernel_function,
                size: store.len(),
                dt,
                table_size: table.len() as cl_uint,
                table_min_v: table.parameters().min_v as cl_float,
                table_step: table.step() as cl_float,
                shared_conductances,
                v: create_and_write_buffer(context, queue, &to_float(&store.v))?,
                n: create_and_write_buffer(context, queue, &to_float(&store.n))?,
                m: create_and_write_buffer(context, queue, &to_float(&store.m))?,
                h: create_and_write_buffer(context, queue, &to_float(&store.h))?,
                c_m_inv: create_and_write_buffer(context, queue, &to_float(&store.c_m_inv))?,
                gk_max: create_and_write_buffer(context, queue, &to_float(&store.gk_max))?,
                gna_max: create_and_write_buffer(context, queue, &to_float(&store.gna_max))?,
                gm: create_and_write_buffer(context, queue, &to_float(&store.gm))?,
                table: create_and_write_buffer(context, queue, &flat_table)?,
            }
        )
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn program_source(&self) -> &str {
        &self.kernel_function.program_source
    }

    /// Advances every compartment on the device by one tick and waits for completion
    pub fn step(&mut self, queue: &CommandQueue, input_current: f64) -> Result<(), GPUError> {
        let dt = self.dt as cl_float;
        let input_current = input_current as cl_float;

        let step_event = unsafe {
            let mut kernel_execution = ExecuteKernel::new(&self.kernel_function.kernel);

            kernel_execution.set_arg(&self.v)
                .set_arg(&self.n)
                .set_arg(&self.m)
                .set_arg(&self.h)
                .set_arg(&self.c_m_inv)
                .set_arg(&self.gk_max)
                .set_arg(&self.gna_max)
                .set_arg(&self.gm)
                .set_arg(&self.table)
                .set_arg(&self.table_size)
                .set_arg(&self.table_min_v)
                .set_arg(&self.table_step)
                .set_arg(&self.shared_conductances)
                .set_arg(&dt)
                .set_arg(&input_current);

            match kernel_execution.set_global_work_size(self.size)
                .enqueue_nd_range(queue) {
                    Ok(value) => value,
                    Err(_) => return Err(GPUError::QueueFailure),
                }
        };

        step_event.wait().map_err(|_| GPUError::WaitError)?;

        Ok(())
    }

    /// Membrane potential of compartment 0 on the device (mV)
    pub fn first_voltage(&self, queue: &CommandQueue) -> Result<f64, GPUError> {
        let mut read_vector = [0.; 1];
        read_buffer(queue, &self.v, &mut read_vector)?;

        Ok(read_vector[0] as f64)
    }

    /// Copies the device state back into `store`
    pub fn read_state(&self, queue: &CommandQueue, store: &mut CompartmentStore) -> Result<(), GPUError> {
        if store.len() != self.size {
            return Err(GPUError::SizeMismatch);
        }

        let mut read_vector = vec![0.; self.size];
        let targets = [
            (&self.v, &mut store.v),
            (&self.n, &mut store.n),
            (&self.m, &mut store.m),
            (&self.h, &mut store.h),
        ];

        for (buffer, target) in targets {
            read_buffer(queue, buffer, &mut read_vector)?;
            target.iter_mut()
                .zip(read_vector.iter())
                .for_each(|(host, device)| *host = *device as f64);
        }

        Ok(())
    }
}

/// Runs the whole benchmark on the first available GPU, observing compartment 0
/// after every tick like [`crate::driver::simulate`]
pub fn simulate_gpu<O: Observer>(
    config: &SimulationConfig,
    observer: &mut O,
) -> Result<(CompartmentStore, RunSummary), HodgkinHuxleyError> {
    config.validate()?;

    let table = LookupTable::build(&config.table)?;
    let mut store = CompartmentStore::new(config.compartments, &config.membrane)?;
    let schedule = InjectionSchedule::from_times(
        config.injection_amplitude,
        config.injection_start,
        config.injection_stop,
        config.dt,
    )?;

    let (context, queue) = default_context()?;
    let mut gpu_kernel = StepKernelGPU::new(
        &context, &queue, &table, &store, config.dt, config.conductance_mode,
    )?;

    let ticks = ticks_in(config.stoptime, config.dt);
    debug!(ticks, compartments = store.len(), "starting gpu integration");

    let start = std::time::Instant::now();

    for tick in 0..ticks {
        let injected_current = schedule.current_at(tick);
        gpu_kernel.step(&queue, injected_current)?;

        observer.observe(
            &Observation {
                time: tick as f64 * config.dt,
                injected_current,
                voltage: gpu_kernel.first_voltage(&queue)?,
            }
        );
    }

    let summary = RunSummary { ticks, compartments: store.len(), elapsed: start.elapsed() };

    gpu_kernel.read_state(&queue, &mut store)?;

    Ok((store, summary))
}
