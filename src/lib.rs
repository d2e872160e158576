pub mod bvh;
mod camera;
pub mod device;
pub mod dual_buffer;
mod environment;
pub mod geometry;
pub mod scene;
pub mod shader;
mod util;

pub use camera::{Camera, CameraError, Projection};
pub use environment::{Environment, FrameStats, RenderError, RenderSettings};
pub use scene::{Material, Mesh, Scene};
pub use shader::{RenderMode, SampleCount};
pub use util::Rgb;
