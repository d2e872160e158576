use crate::{
    device::{DeviceSlice, Kernel},
    geometry::FloatType,
    scene::colors,
    util::Rgb,
};

use super::ShaderConfig;

/// Reduces the samples of each pixel to its final color: the mean of the samples with the
/// gamma curve applied.
pub struct ResolveKernel<'a> {
    samples: DeviceSlice<'a, Rgb>,
    samples_per_pixel: usize,
    pixel_count: usize,
    inv_gamma: FloatType,
    background: Rgb,
    linear_background: Rgb,
}

impl<'a> ResolveKernel<'a> {
    pub fn new(samples: DeviceSlice<'a, Rgb>, config: &ShaderConfig) -> Self {
        debug_assert!(samples.len() >= config.sample_unit_count());
        ResolveKernel {
            samples,
            samples_per_pixel: config.samples.get() as usize,
            pixel_count: config.pixel_count(),
            inv_gamma: 1.0 / config.gamma,
            background: config.background,
            linear_background: config.linear_background(),
        }
    }
}

impl Kernel for ResolveKernel<'_> {
    type Output = Rgb;

    const NAME: &'static str = "resolve";

    fn run(&self, unit: usize, output: &mut Rgb) {
        if unit >= self.pixel_count {
            *output = colors::BLACK;
            return;
        }

        let start = unit * self.samples_per_pixel;
        let samples = &self.samples.as_slice()[start..start + self.samples_per_pixel];
        // Pure background maps back exactly, pow round trips are off by an ulp.
        if samples.iter().all(|&sample| sample == self.linear_background) {
            *output = self.background;
            return;
        }
        let sum = samples
            .iter()
            .fold(colors::BLACK, |acc, &sample| acc + sample);
        let mean = sum * (1.0 / self.samples_per_pixel as FloatType);

        *output = if self.inv_gamma == 1.0 {
            mean
        } else {
            let encode = |c: FloatType| c.max(0.0).powf(self.inv_gamma);
            Rgb::new(encode(mean.r), encode(mean.g), encode(mean.b))
        };
    }
}
