//! Per-sample ray tracing and per-pixel reduction as device kernels.
//!
//! A frame is two launches. The trace kernel runs one unit for every (pixel, sample)
//! pair and writes one raw color per unit. The resolve kernel then runs one unit per pixel,
//! averaging that pixel's samples and applying gamma.

mod gpu_scene;
mod intersector;
mod resolve;
mod shading;
mod trace;

use std::num::{NonZeroU32, NonZeroUsize};

use thiserror::Error;

use crate::{
    camera::Projection,
    device::{Device, DeviceError, DeviceMemory, LaunchConfig},
    geometry::FloatType,
    util::Rgb,
};

pub use gpu_scene::{GpuScene, MeshInfo, SceneView};
pub use intersector::{BruteForce, BvhAccelerated, SceneHit, SceneIntersector};
pub use resolve::ResolveKernel;
pub use shading::Shading;
pub use trace::{TraceKernel, unit_seed};

/// Units per block of a launch.
pub const DEFAULT_BLOCK_SIZE: NonZeroUsize = NonZeroUsize::new(256).unwrap();

/// Default maximum number of surface interactions of a path.
pub const MAX_DEPTH: u32 = 5;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("Sample count must be a non-zero perfect square, got {0}")]
pub struct InvalidSampleCount(pub u32);

/// Number of samples per pixel, always a perfect square so that samples can be laid out
/// on a regular grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SampleCount {
    count: NonZeroU32,
    per_axis: u32,
}

impl SampleCount {
    pub const ONE: SampleCount = SampleCount {
        count: NonZeroU32::MIN,
        per_axis: 1,
    };

    pub fn new(count: u32) -> Result<SampleCount, InvalidSampleCount> {
        let per_axis = count.isqrt();
        match NonZeroU32::new(count) {
            Some(nonzero) if per_axis * per_axis == count => Ok(SampleCount {
                count: nonzero,
                per_axis,
            }),
            _ => Err(InvalidSampleCount(count)),
        }
    }

    pub fn get(&self) -> u32 {
        self.count.get()
    }

    /// Side of the sample grid.
    pub fn per_axis(&self) -> u32 {
        self.per_axis
    }
}

impl Default for SampleCount {
    fn default() -> Self {
        SampleCount::ONE
    }
}

impl TryFrom<u32> for SampleCount {
    type Error = InvalidSampleCount;

    fn try_from(count: u32) -> Result<Self, Self::Error> {
        SampleCount::new(count)
    }
}

/// How a frame is computed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Nearest hit color, every primitive tested for every ray
    SimpleRender,
    /// Path tracing, every primitive tested for every ray
    PathTrace,
    /// Path tracing accelerated by per mesh BVHs
    #[default]
    BvhPathTrace,
}

impl RenderMode {
    pub fn shading(&self) -> Shading {
        match self {
            RenderMode::SimpleRender => Shading::Direct,
            RenderMode::PathTrace | RenderMode::BvhPathTrace => Shading::PathTrace,
        }
    }

    pub fn uses_bvh(&self) -> bool {
        *self == RenderMode::BvhPathTrace
    }
}

/// Parameters of one frame's kernel launches.
#[derive(Copy, Clone, Debug)]
pub struct ShaderConfig {
    pub width: u32,
    pub height: u32,
    pub samples: SampleCount,
    pub seed: u64,
    pub block_size: NonZeroUsize,
    /// Color of escaped rays as it appears in the output, after gamma.
    pub background: Rgb,
    pub gamma: FloatType,
    pub max_depth: u32,
}

impl ShaderConfig {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn sample_unit_count(&self) -> usize {
        self.pixel_count() * self.samples.get() as usize
    }

    pub fn trace_launch(&self) -> LaunchConfig {
        LaunchConfig::for_units(self.sample_unit_count(), self.block_size)
    }

    pub fn resolve_launch(&self) -> LaunchConfig {
        LaunchConfig::for_units(self.pixel_count(), self.block_size)
    }

    /// Background in the linear space the trace kernel works in.
    pub fn linear_background(&self) -> Rgb {
        if self.gamma == 1.0 {
            return self.background;
        }
        let decode = |c: FloatType| c.max(0.0).powf(self.gamma);
        Rgb::new(
            decode(self.background.r),
            decode(self.background.g),
            decode(self.background.b),
        )
    }
}

/// Launches the trace kernel with the intersector and shading selected by `mode`.
/// `samples` receives one raw color per (pixel, sample) unit.
pub fn trace(
    device: &Device,
    mode: RenderMode,
    scene: SceneView<'_>,
    projection: &Projection,
    config: &ShaderConfig,
    samples: &mut DeviceMemory<Rgb>,
) -> Result<(), DeviceError> {
    match mode {
        RenderMode::SimpleRender | RenderMode::PathTrace => {
            let kernel = TraceKernel::new(scene, BruteForce, mode.shading(), projection, config);
            device.launch(&kernel, config.trace_launch(), samples)
        }
        RenderMode::BvhPathTrace => {
            let kernel = TraceKernel::new(scene, BvhAccelerated, mode.shading(), projection, config);
            device.launch(&kernel, config.trace_launch(), samples)
        }
    }
}

/// Launches the resolve kernel, reducing `samples` into `pixels`.
pub fn resolve(
    device: &Device,
    config: &ShaderConfig,
    samples: &DeviceMemory<Rgb>,
    pixels: &mut DeviceMemory<Rgb>,
) -> Result<(), DeviceError> {
    let kernel = ResolveKernel::new(samples.view(), config);
    device.launch(&kernel, config.resolve_launch(), pixels)
}
