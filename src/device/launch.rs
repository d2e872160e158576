use std::num::NonZeroUsize;

use super::memory::DeviceCopy;

/// Code executed on the device, once for every unit of the launch grid.
/// Units are independent: a unit may only read shared (device) inputs and write its own
/// output slot.
pub trait Kernel: Sync {
    type Output: DeviceCopy;

    /// Name used in diagnostics.
    const NAME: &'static str;

    /// Runs the unit with the given global index, writing its result to `output`.
    /// Launch grids are padded to whole blocks, so implementations must treat units past
    /// their actual work size as no-ops.
    fn run(&self, unit: usize, output: &mut Self::Output);
}

/// Shape of a kernel launch: `block_count` blocks of `block_size` units.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LaunchConfig {
    pub block_size: NonZeroUsize,
    pub block_count: usize,
}

impl LaunchConfig {
    /// Smallest launch with the given block size covering at least `units` units.
    pub fn for_units(units: usize, block_size: NonZeroUsize) -> LaunchConfig {
        LaunchConfig {
            block_size,
            block_count: units.div_ceil(block_size.get()),
        }
    }

    /// Total number of units including the padding.
    pub fn padded_units(&self) -> usize {
        self.block_count * self.block_size.get()
    }
}
