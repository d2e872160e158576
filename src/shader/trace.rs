use rand::{SeedableRng as _, rngs::SmallRng};

use crate::{
    camera::Projection,
    device::Kernel,
    geometry::FloatType,
    scene::colors,
    util::Rgb,
};

use super::{SampleCount, SceneIntersector, SceneView, ShaderConfig, Shading};

/// Seed of the random generator of one unit.
/// Distinct units of one frame get decorrelated streams, equal (seed, unit) pairs always
/// produce the same stream.
pub fn unit_seed(seed: u64, unit: usize) -> u64 {
    // splitmix64 finalizer over the golden ratio sequence
    let mut z = seed.wrapping_add((unit as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Traces one camera ray per unit.
///
/// Unit `u` handles sample `u % spp` of pixel `u / spp`, pixels are numbered row by row.
/// Samples of a pixel are spread over a regular `n`x`n` grid inside the pixel footprint.
pub struct TraceKernel<'a, I> {
    scene: SceneView<'a>,
    intersector: I,
    shading: Shading,
    projection: Projection,
    width: u32,
    samples: SampleCount,
    seed: u64,
    background: Rgb,
    max_depth: u32,
    unit_count: usize,
}

impl<'a, I: SceneIntersector> TraceKernel<'a, I> {
    pub fn new(
        scene: SceneView<'a>,
        intersector: I,
        shading: Shading,
        projection: &Projection,
        config: &ShaderConfig,
    ) -> Self {
        debug_assert!(projection.resolution().x == config.width);
        debug_assert!(projection.resolution().y == config.height);
        TraceKernel {
            scene,
            intersector,
            shading,
            projection: *projection,
            width: config.width,
            samples: config.samples,
            seed: config.seed,
            background: config.linear_background(),
            max_depth: config.max_depth,
            unit_count: config.sample_unit_count(),
        }
    }

    /// Position of the unit's sample in image coordinates.
    fn sample_position(&self, unit: usize) -> (FloatType, FloatType) {
        let spp = self.samples.get() as usize;
        let n = self.samples.per_axis() as usize;
        let pixel = unit / spp;
        let sample = unit % spp;

        let col = (pixel % self.width as usize) as FloatType;
        let row = (pixel / self.width as usize) as FloatType;
        let offset = |i: usize| (i as FloatType + 0.5) / n as FloatType - 0.5;

        (col + offset(sample % n), row + offset(sample / n))
    }
}

impl<I: SceneIntersector> Kernel for TraceKernel<'_, I> {
    type Output = Rgb;

    const NAME: &'static str = "trace";

    fn run(&self, unit: usize, output: &mut Rgb) {
        if unit >= self.unit_count {
            *output = colors::BLACK;
            return;
        }

        let (col, row) = self.sample_position(unit);
        let ray = self.projection.pixel_ray(col, row);
        let mut rng = SmallRng::seed_from_u64(unit_seed(self.seed, unit));

        *output = self.shading.shade(
            &self.scene,
            self.intersector,
            ray,
            self.background,
            self.max_depth,
            &mut rng,
        );
    }
}
