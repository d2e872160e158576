//! Growable array that lives either in host memory or in device memory.

use std::ops::{Index, IndexMut};

use assert2::{assert, debug_assert};

use crate::device::{Device, DeviceCopy, DeviceError, DeviceMemory, DeviceSlice};

/// Where the authoritative copy of a `DualBuffer`'s content is.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Residency {
    /// No storage allocated anywhere.
    Uninitialized,
    /// Content is in host memory and can be accessed through indexing.
    HostOnly,
    /// Content is in device memory, only kernels can read it.
    /// The host array is kept allocated as the home for the next `to_host`.
    DeviceOnly,
}

/// Array of `T` that is explicitly moved between host and device memory.
///
/// Element accessors work only while the buffer is `HostOnly`. Storage is freed by
/// `release`, or when the buffer is dropped.
#[derive(Debug)]
pub struct DualBuffer<T: DeviceCopy> {
    host: Vec<T>,
    device: Option<DeviceMemory<T>>,
    residency: Residency,
}

impl<T: DeviceCopy> DualBuffer<T> {
    pub fn new() -> Self {
        DualBuffer {
            host: Vec::new(),
            device: None,
            residency: Residency::Uninitialized,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        DualBuffer {
            host: Vec::with_capacity(capacity),
            device: None,
            residency: Residency::HostOnly,
        }
    }

    pub fn from_vec(host: Vec<T>) -> Self {
        DualBuffer {
            host,
            device: None,
            residency: Residency::HostOnly,
        }
    }

    pub fn residency(&self) -> Residency {
        self.residency
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.host.len()
    }

    pub fn is_empty(&self) -> bool {
        self.host.is_empty()
    }

    /// Number of elements that fit without growing.
    pub fn capacity(&self) -> usize {
        self.host.capacity()
    }

    /// Appends an item and returns its index.
    /// Storage doubles when full. Panics if the content is on the device.
    pub fn append(&mut self, item: T) -> usize {
        assert!(
            self.residency != Residency::DeviceOnly,
            "Can't append to a buffer that is on the device"
        );

        if self.host.len() == self.host.capacity() {
            let additional = self.host.capacity().max(1);
            self.host.reserve_exact(additional);
        }
        self.host.push(item);
        self.residency = Residency::HostOnly;

        self.host.len() - 1
    }

    /// Moves the content to the device.
    /// Device storage is sized to the current capacity. No-op if already on the device.
    pub fn to_device(&mut self, device: &Device) -> Result<(), DeviceError> {
        if self.residency == Residency::DeviceOnly {
            return Ok(());
        }

        let mut memory = device.allocate(self.host.capacity())?;
        device.upload(&mut memory, &self.host)?;
        log::trace!("Moved {} elements to device", self.host.len());

        self.device = Some(memory);
        self.residency = Residency::DeviceOnly;
        Ok(())
    }

    /// Copies the content back to host memory and frees the device storage.
    /// No-op unless the content is on the device.
    pub fn to_host(&mut self, device: &Device) -> Result<(), DeviceError> {
        if self.residency != Residency::DeviceOnly {
            return Ok(());
        }

        let Some(memory) = self.device.take() else {
            unreachable!("Device resident buffer must have device storage");
        };
        device.download(&memory, &mut self.host)?;
        log::trace!("Moved {} elements to host", self.host.len());

        self.residency = Residency::HostOnly;
        Ok(())
    }

    /// Frees all storage, leaving the buffer empty and uninitialized.
    /// Releasing a released buffer does nothing.
    pub fn release(&mut self) {
        if self.residency == Residency::Uninitialized && self.host.capacity() == 0 {
            return;
        }
        self.device = None;
        self.host = Vec::new();
        self.residency = Residency::Uninitialized;
    }

    /// View of the device copy for kernels, None unless the content is on the device.
    pub fn device_view(&self) -> Option<DeviceSlice<'_, T>> {
        self.device.as_ref().map(DeviceMemory::view)
    }

    /// Device storage, for use as a kernel output. None unless the content is on the device.
    pub fn device_memory_mut(&mut self) -> Option<&mut DeviceMemory<T>> {
        self.device.as_mut()
    }

    /// Host content. Only meaningful while the buffer is `HostOnly`.
    pub fn as_slice(&self) -> &[T] {
        debug_assert!(self.residency != Residency::DeviceOnly);
        &self.host
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }
}

impl<T: DeviceCopy> Default for DualBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeviceCopy> FromIterator<T> for DualBuffer<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: DeviceCopy> Drop for DualBuffer<T> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Element access, valid only while the buffer is `HostOnly` and `index < len()`.
/// Residency is only checked in debug builds; in release builds, reading a device resident
/// buffer returns the stale host copy.
impl<T: DeviceCopy> Index<usize> for DualBuffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        debug_assert!(self.residency == Residency::HostOnly);
        debug_assert!(index < self.host.len());
        &self.host[index]
    }
}

impl<T: DeviceCopy> IndexMut<usize> for DualBuffer<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(self.residency == Residency::HostOnly);
        debug_assert!(index < self.host.len());
        &mut self.host[index]
    }
}
