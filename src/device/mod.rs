//! Compute device with its own memory space.
//!
//! The device executes kernels over a grid of independent units on a pool of worker
//! threads. Its memory is accounted separately from the host and can only be filled or
//! read back through explicit, blocking copies.

mod launch;
mod memory;

use std::{
    any::Any,
    num::NonZeroUsize,
    sync::{Arc, Mutex, PoisonError},
    thread,
    time::Instant,
};

use thiserror::Error;

pub use launch::{Kernel, LaunchConfig};
pub use memory::{DeviceCopy, DeviceMemory, DeviceSlice};

use memory::MemoryPool;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Out of device memory: requested {requested} bytes, {available} bytes available")]
    OutOfMemory { requested: usize, available: usize },

    #[error("Copy size mismatch: room for {expected} elements, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Launch of kernel `{kernel}` failed: {message}")]
    LaunchFailed {
        kernel: &'static str,
        message: String,
    },
}

#[derive(Copy, Clone, Debug)]
pub enum WorkerCount {
    Auto,
    Manual(NonZeroUsize),
}

#[derive(Copy, Clone, Debug)]
pub struct DeviceConfig {
    pub worker_count: WorkerCount,
    /// Size of the device memory space in bytes
    pub memory_capacity: usize,
    /// Pin worker threads to CPU cores
    pub pin_workers: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            worker_count: WorkerCount::Auto,
            memory_capacity: 4 << 30,
            pin_workers: false,
        }
    }
}

#[derive(Debug)]
pub struct Device {
    worker_count: usize,
    pin_workers: bool,
    memory: Arc<MemoryPool>,
}

impl Device {
    pub fn new(config: DeviceConfig) -> Device {
        let worker_count = match config.worker_count {
            WorkerCount::Auto => num_cpus::get(),
            WorkerCount::Manual(num) => num.get(),
        };
        log::debug!(
            "Device with {worker_count} workers and {} MiB of memory",
            config.memory_capacity >> 20
        );

        Device {
            worker_count,
            pin_workers: config.pin_workers,
            memory: Arc::new(MemoryPool::new(config.memory_capacity)),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Total device memory in bytes.
    pub fn memory_capacity(&self) -> usize {
        self.memory.capacity()
    }

    /// Device memory currently allocated, in bytes.
    pub fn memory_used(&self) -> usize {
        self.memory.used()
    }

    /// Number of device allocations that have not been freed yet.
    pub fn live_allocations(&self) -> usize {
        self.memory.live_allocations()
    }

    /// Allocates device storage for `capacity` elements.
    pub fn allocate<T: DeviceCopy>(&self, capacity: usize) -> Result<DeviceMemory<T>, DeviceError> {
        let memory = DeviceMemory::allocate(&self.memory, capacity)?;
        log::trace!("Allocated {} bytes on device", memory.size_bytes());
        Ok(memory)
    }

    /// Synchronous host to device copy, replacing the content of `dst`.
    pub fn upload<T: DeviceCopy>(
        &self,
        dst: &mut DeviceMemory<T>,
        src: &[T],
    ) -> Result<(), DeviceError> {
        dst.write(src)
    }

    /// Synchronous device to host copy, replacing the content of `dst`.
    pub fn download<T: DeviceCopy>(
        &self,
        src: &DeviceMemory<T>,
        dst: &mut Vec<T>,
    ) -> Result<(), DeviceError> {
        src.read(dst);
        Ok(())
    }

    /// Runs the kernel over the whole launch grid and blocks until every unit has finished.
    /// Unit `i` writes `output[i]`, `output` must hold at least `config.padded_units()`
    /// elements.
    pub fn launch<K: Kernel>(
        &self,
        kernel: &K,
        config: LaunchConfig,
        output: &mut DeviceMemory<K::Output>,
    ) -> Result<(), DeviceError> {
        let units = config.padded_units();
        if output.len() < units {
            return Err(DeviceError::SizeMismatch {
                expected: units,
                actual: output.len(),
            });
        }
        if units == 0 {
            return Ok(());
        }

        let start = Instant::now();
        let block_size = config.block_size.get();
        let blocks = Mutex::new(
            output.as_mut_slice()[..units]
                .chunks_mut(block_size)
                .enumerate(),
        );
        let blocks = &blocks;
        let cores = if self.pin_workers {
            core_affinity::get_core_ids().unwrap_or_default()
        } else {
            Vec::new()
        };
        let worker_count = self.worker_count.min(config.block_count);

        thread::scope(|scope| -> Result<(), DeviceError> {
            let handles = (0..worker_count)
                .map(|worker_id| {
                    let core = (!cores.is_empty()).then(|| cores[worker_id % cores.len()]);
                    thread::Builder::new()
                        .name(format!("worker{worker_id}"))
                        .spawn_scoped(scope, move || {
                            if let Some(core) = core {
                                core_affinity::set_for_current(core);
                            }

                            loop {
                                // Only hold the lock while picking the next block
                                let next = blocks
                                    .lock()
                                    .unwrap_or_else(PoisonError::into_inner)
                                    .next();
                                let Some((block_index, block)) = next else {
                                    break;
                                };

                                let first_unit = block_index * block_size;
                                for (i, slot) in block.iter_mut().enumerate() {
                                    kernel.run(first_unit + i, slot);
                                }
                            }
                        })
                        .map_err(|e| DeviceError::LaunchFailed {
                            kernel: K::NAME,
                            message: e.to_string(),
                        })
                })
                .collect::<Vec<_>>();

            // Join everything before reporting, so that no worker outlives a failed launch
            let results = handles
                .into_iter()
                .map(|handle| {
                    handle?.join().map_err(|payload| DeviceError::LaunchFailed {
                        kernel: K::NAME,
                        message: panic_message(payload.as_ref()),
                    })
                })
                .collect::<Vec<_>>();
            results.into_iter().collect()
        })?;

        log::trace!(
            "Kernel {} ran {} units in {:?}",
            K::NAME,
            units,
            start.elapsed()
        );
        Ok(())
    }
}

impl Default for Device {
    fn default() -> Self {
        Device::new(DeviceConfig::default())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
