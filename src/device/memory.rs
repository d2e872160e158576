use std::{
    ops::Index,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use assert2::debug_assert;

use super::DeviceError;

/// Types that can be bitwise copied between host and device memory.
pub trait DeviceCopy: Copy + Send + Sync + 'static {}

impl<T: Copy + Send + Sync + 'static> DeviceCopy for T {}

/// Book keeping of a device's memory space.
#[derive(Debug)]
pub(super) struct MemoryPool {
    capacity: usize,
    used: AtomicUsize,
    live_allocations: AtomicUsize,
}

impl MemoryPool {
    pub fn new(capacity: usize) -> Self {
        MemoryPool {
            capacity,
            used: AtomicUsize::new(0),
            live_allocations: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    pub fn live_allocations(&self) -> usize {
        self.live_allocations.load(Ordering::Acquire)
    }

    fn reserve(&self, bytes: usize) -> Result<(), DeviceError> {
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(bytes).filter(|total| *total <= self.capacity)
            })
            .map_err(|used| DeviceError::OutOfMemory {
                requested: bytes,
                available: self.capacity - used,
            })?;
        self.live_allocations.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn free(&self, bytes: usize) {
        let previous = self.used.fetch_sub(bytes, Ordering::AcqRel);
        debug_assert!(previous >= bytes);
        self.live_allocations.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Storage living in a device's memory space.
/// The content can only be reached from the host through `Device::upload` and
/// `Device::download`, kernels see it through `DeviceSlice`.
/// The allocation is returned to the device when this is dropped.
#[derive(Debug)]
pub struct DeviceMemory<T: DeviceCopy> {
    data: Vec<T>,
    capacity: usize,
    pool: Arc<MemoryPool>,
}

impl<T: DeviceCopy> DeviceMemory<T> {
    pub(super) fn allocate(pool: &Arc<MemoryPool>, capacity: usize) -> Result<Self, DeviceError> {
        let bytes = Self::bytes_for(capacity)?;
        pool.reserve(bytes)?;

        let mut data = Vec::new();
        if data.try_reserve_exact(capacity).is_err() {
            pool.free(bytes);
            return Err(DeviceError::OutOfMemory {
                requested: bytes,
                available: pool.capacity() - pool.used(),
            });
        }

        Ok(DeviceMemory {
            data,
            capacity,
            pool: Arc::clone(pool),
        })
    }

    fn bytes_for(capacity: usize) -> Result<usize, DeviceError> {
        capacity
            .checked_mul(size_of::<T>())
            .ok_or(DeviceError::OutOfMemory {
                requested: usize::MAX,
                available: 0,
            })
    }

    /// Number of elements currently stored.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of elements this allocation can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Size of the allocation in bytes.
    pub fn size_bytes(&self) -> usize {
        self.capacity * size_of::<T>()
    }

    pub fn view(&self) -> DeviceSlice<'_, T> {
        DeviceSlice { data: &self.data }
    }

    pub(super) fn write(&mut self, src: &[T]) -> Result<(), DeviceError> {
        if src.len() > self.capacity {
            return Err(DeviceError::SizeMismatch {
                expected: self.capacity,
                actual: src.len(),
            });
        }
        self.data.clear();
        self.data.extend_from_slice(src);
        Ok(())
    }

    pub(super) fn read(&self, dst: &mut Vec<T>) {
        dst.clear();
        dst.extend_from_slice(&self.data);
    }

    pub(super) fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: DeviceCopy> Drop for DeviceMemory<T> {
    fn drop(&mut self) {
        self.pool.free(self.capacity * size_of::<T>());
    }
}

/// Read only view of device memory, handed to kernels.
#[derive(Debug)]
pub struct DeviceSlice<'a, T> {
    data: &'a [T],
}

impl<T> Clone for DeviceSlice<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DeviceSlice<'_, T> {}

impl<'a, T> DeviceSlice<'a, T> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a T> {
        self.data.get(index)
    }

    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'a, T> {
        self.data.iter()
    }
}

impl<T> Index<usize> for DeviceSlice<'_, T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        debug_assert!(index < self.data.len());
        &self.data[index]
    }
}
