mod stats;

pub use stats::Stats;

/// Linear color with f32 channels, nominally in 0-1.
pub type Rgb = rgb::RGB<f32>;

/// Maps a 0-1 f32 rgb pixel to pixel type compatible with module image.
pub fn color_to_image(color: Rgb) -> image::Rgb<u8> {
    image::Rgb([
        channel_to_u8(color.r),
        channel_to_u8(color.g),
        channel_to_u8(color.b),
    ])
}

fn channel_to_u8(value: f32) -> u8 {
    // NaN maps to zero through the saturating cast
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}
