use assert2::debug_assert;
use bon::bon;
use image::RgbImage;
use nalgebra::Unit;
use thiserror::Error;

use crate::{
    geometry::{EPSILON, FloatType, Ray, ScreenSize, WorldPoint, WorldVector},
    scene::colors,
    util::{Rgb, color_to_image},
};

#[derive(Debug, Error, PartialEq)]
pub enum CameraError {
    #[error("Forward vector must be non-zero")]
    ZeroForward,

    #[error("`up` and `forward` must be linearly independent")]
    DegenerateUp,

    #[error("Resolution must be non-zero, got {0}x{1}")]
    EmptyResolution(u32, u32),

    #[error("Field of view must be between 0 and 180 degrees, got {0}")]
    InvalidFov(FloatType),

    #[error("Gamma must be positive, got {0}")]
    InvalidGamma(FloatType),
}

/// Pinhole projection of a camera: everything needed to generate rays, nothing else.
/// Small and `Copy`, so it can be handed to kernels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Projection {
    position: WorldPoint,
    forward: Unit<WorldVector>,
    up: Unit<WorldVector>,
    right: Unit<WorldVector>,
    resolution: ScreenSize,
    /// Distance between pixel centers on a film one unit in front of the position
    pixel_pitch: FloatType,
}

impl Projection {
    pub fn resolution(&self) -> ScreenSize {
        self.resolution
    }

    pub fn position(&self) -> WorldPoint {
        self.position
    }

    pub fn forward(&self) -> WorldVector {
        self.forward.into_inner()
    }

    /// Ray through a point of the image.
    /// Pixel centers are at integer coordinates, column grows to the right and row grows
    /// downwards. The middle of the image looks straight forward.
    pub fn pixel_ray(&self, col: FloatType, row: FloatType) -> Ray {
        let center_col = (self.resolution.x - 1) as FloatType / 2.0;
        let center_row = (self.resolution.y - 1) as FloatType / 2.0;

        let direction = self.forward.as_ref()
            + self.right.as_ref() * ((col - center_col) * self.pixel_pitch)
            - self.up.as_ref() * ((row - center_row) * self.pixel_pitch);

        Ray::new(self.position, direction)
    }
}

/// Camera with its pixel store.
#[derive(Clone, Debug)]
pub struct Camera {
    projection: Projection,
    gamma: FloatType,

    /// Indexed by `row * width + col`
    pixels: Vec<Rgb>,
    fps: f32,
}

#[bon]
impl Camera {
    /// Creates a camera, `fov` is the vertical field of view in degrees.
    #[builder]
    pub fn new(
        position: WorldPoint,
        forward: WorldVector,
        up: WorldVector,
        resolution: ScreenSize,
        #[builder(default = 60.0)] fov: FloatType,
        #[builder(default = 2.2)] gamma: FloatType,
    ) -> Result<Self, CameraError> {
        let forward = Unit::try_new(forward, EPSILON).ok_or(CameraError::ZeroForward)?;
        let up = Unit::try_new(up, EPSILON).ok_or(CameraError::DegenerateUp)?;
        let right =
            Unit::try_new(forward.cross(&up), EPSILON).ok_or(CameraError::DegenerateUp)?;
        let up = Unit::new_normalize(right.cross(&forward));

        if resolution.x == 0 || resolution.y == 0 {
            return Err(CameraError::EmptyResolution(resolution.x, resolution.y));
        }
        if !(fov > 0.0 && fov < 180.0) {
            return Err(CameraError::InvalidFov(fov));
        }
        if !(gamma > 0.0) {
            return Err(CameraError::InvalidGamma(gamma));
        }

        let film_height = 2.0 * (fov.to_radians() / 2.0).tan();
        let pixel_count = resolution.x as usize * resolution.y as usize;

        Ok(Camera {
            projection: Projection {
                position,
                forward,
                up,
                right,
                resolution,
                pixel_pitch: film_height / resolution.y as FloatType,
            },
            gamma,
            pixels: vec![colors::BLACK; pixel_count],
            fps: 0.0,
        })
    }
}

impl Camera {
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn resolution(&self) -> ScreenSize {
        self.projection.resolution
    }

    pub fn width(&self) -> u32 {
        self.projection.resolution.x
    }

    pub fn height(&self) -> u32 {
        self.projection.resolution.y
    }

    pub fn gamma(&self) -> FloatType {
        self.gamma
    }

    pub fn pixel_ray(&self, col: FloatType, row: FloatType) -> Ray {
        self.projection.pixel_ray(col, row)
    }

    pub fn translate(&mut self, offset: &WorldVector) {
        self.projection.position += offset;
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgb] {
        &mut self.pixels
    }

    pub fn pixel(&self, col: u32, row: u32) -> Rgb {
        self.pixels[self.pixel_index(col, row)]
    }

    pub fn set_pixel(&mut self, col: u32, row: u32, color: Rgb) {
        let index = self.pixel_index(col, row);
        self.pixels[index] = color;
    }

    pub fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    /// Frames per second of the last rendered frame.
    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn set_fps(&mut self, fps: f32) {
        self.fps = fps;
    }

    /// Converts the pixel store to an 8 bit image.
    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width(), self.height(), |col, row| {
            color_to_image(self.pixel(col, row))
        })
    }

    fn pixel_index(&self, col: u32, row: u32) -> usize {
        debug_assert!(col < self.width());
        debug_assert!(row < self.height());
        row as usize * self.width() as usize + col as usize
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::{assert, let_assert};

    fn camera(width: u32, height: u32) -> Camera {
        // X goes right, Y goes away, Z goes up
        Camera::builder()
            .position(WorldPoint::new(0.0, 0.0, 0.0))
            .forward(WorldVector::new(0.0, 1.0, 0.0))
            .up(WorldVector::new(0.0, 0.0, 1.0))
            .resolution(ScreenSize::new(width, height))
            .fov(90.0)
            .build()
            .unwrap()
    }

    #[test]
    fn left_right_up_down() {
        let camera = camera(800, 600);

        let ray_center = camera.pixel_ray(399.5, 299.5);
        let ray_left = camera.pixel_ray(0.0, 299.5);
        let ray_right = camera.pixel_ray(799.0, 299.5);
        let ray_up = camera.pixel_ray(399.5, 0.0);
        let ray_down = camera.pixel_ray(399.5, 599.0);

        assert!(ray_center.direction.x.abs() < 1e-6);
        assert!(ray_center.direction.z.abs() < 1e-6);
        assert!(ray_left.direction.x < ray_center.direction.x);
        assert!(ray_right.direction.x > ray_center.direction.x);
        assert!(ray_up.direction.z > ray_center.direction.z);
        assert!(ray_down.direction.z < ray_center.direction.z);
    }

    #[test]
    fn vertical_field_of_view() {
        let camera = camera(3, 2);
        // Film edges are half a pixel away from the outermost pixel centers
        let top = camera.pixel_ray(1.0, -0.5);
        assert!((top.direction.z - top.direction.y).abs() < 1e-6);
    }

    #[test]
    fn single_pixel_looks_forward() {
        let camera = camera(1, 1);
        let ray = camera.pixel_ray(0.0, 0.0);
        assert!(ray.direction == WorldVector::new(0.0, 1.0, 0.0));
        assert!(ray.origin == WorldPoint::origin());
    }

    #[test]
    fn up_is_orthogonalized() {
        let camera = Camera::builder()
            .position(WorldPoint::new(-8.0, 0.0, 3.0))
            .forward(WorldVector::new(1.0, 0.0, -0.2))
            .up(WorldVector::new(0.0, 0.0, 1.0))
            .resolution(ScreenSize::new(16, 9))
            .build()
            .unwrap();
        let center = camera.pixel_ray(7.5, 4.0);
        assert!((center.direction - WorldVector::new(1.0, 0.0, -0.2).normalize()).norm() < 1e-6);
    }

    #[test]
    fn invalid_vectors() {
        let builder = || {
            Camera::builder()
                .position(WorldPoint::origin())
                .resolution(ScreenSize::new(4, 4))
        };
        let_assert!(
            Err(CameraError::ZeroForward) = builder()
                .forward(WorldVector::zeros())
                .up(WorldVector::z())
                .build()
        );
        let_assert!(
            Err(CameraError::DegenerateUp) = builder()
                .forward(WorldVector::z())
                .up(WorldVector::z() * 2.0)
                .build()
        );
    }

    #[test]
    fn invalid_parameters() {
        let builder = || {
            Camera::builder()
                .position(WorldPoint::origin())
                .forward(WorldVector::y())
                .up(WorldVector::z())
        };
        let_assert!(
            Err(CameraError::EmptyResolution(0, 4)) =
                builder().resolution(ScreenSize::new(0, 4)).build()
        );
        let_assert!(
            Err(CameraError::InvalidFov(_)) = builder()
                .resolution(ScreenSize::new(4, 4))
                .fov(180.0)
                .build()
        );
        let_assert!(
            Err(CameraError::InvalidGamma(_)) = builder()
                .resolution(ScreenSize::new(4, 4))
                .gamma(0.0)
                .build()
        );
    }

    #[test]
    fn pixel_store_layout() {
        let mut camera = camera(4, 3);
        assert!(camera.pixels().len() == 12);

        camera.set_pixel(1, 2, colors::RED);
        assert!(camera.pixels()[2 * 4 + 1] == colors::RED);
        assert!(camera.pixel(1, 2) == colors::RED);

        let image = camera.to_image();
        assert!(image.dimensions() == (4, 3));
        assert!(image.get_pixel(1, 2).0 == [255, 0, 0]);
        assert!(image.get_pixel(2, 1).0 == [0, 0, 0]);
    }
}
