//! Render loop tying the scene, the camera and the device together.

use std::{
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use bon::{Builder, bon};
use rand::{Rng as _, SeedableRng as _, rngs::SmallRng};
use thiserror::Error;

use crate::{
    bvh::Bvh,
    camera::Camera,
    device::{Device, DeviceError},
    dual_buffer::DualBuffer,
    geometry::{WorldPoint, WorldVector},
    scene::{Material, Mesh, Primitive, Scene, colors},
    shader::{
        self, DEFAULT_BLOCK_SIZE, GpuScene, MAX_DEPTH, RenderMode, SampleCount, ShaderConfig,
    },
    util::Rgb,
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Uploading to the device failed")]
    Upload(#[source] DeviceError),

    #[error("Kernel dispatch failed")]
    Dispatch(#[source] DeviceError),

    #[error("Downloading the frame failed")]
    Download(#[source] DeviceError),
}

/// Per frame rendering parameters.
#[derive(Copy, Clone, Debug, Builder)]
pub struct RenderSettings {
    #[builder(default)]
    pub sample_count: SampleCount,
    #[builder(default = DEFAULT_BLOCK_SIZE)]
    pub block_size: NonZeroUsize,
    /// Maximum number of surface interactions of a path
    #[builder(default = MAX_DEPTH)]
    pub max_depth: u32,
    /// Seed of the per frame seeds, taken from the OS when missing
    pub seed: Option<u64>,
    #[builder(default = colors::BLACK)]
    pub background: Rgb,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings::builder().build()
    }
}

/// Outcome of one `Environment::render` call.
#[derive(Copy, Clone, Debug)]
pub struct FrameStats {
    /// Zero based index of the frame
    pub frame: u64,
    pub duration: Duration,
    pub fps: f32,
    /// Number of traced samples, excluding launch padding
    pub samples: usize,
    /// True if the scene had to be uploaded for this frame
    pub scene_uploaded: bool,
}

/// Owns everything needed to render frames of a scene.
///
/// Scene geometry and BVHs are uploaded on the first render and kept on the device until
/// the scene changes. Sample and pixel buffers live only for the duration of a frame.
#[derive(Debug)]
pub struct Environment {
    camera: Camera,
    scene: Scene,
    mode: RenderMode,
    settings: RenderSettings,
    device: Device,

    bvhs: Option<Vec<Bvh>>,
    gpu_scene: Option<GpuScene>,

    rng: SmallRng,
    frame: u64,
}

#[bon]
impl Environment {
    #[builder]
    pub fn new(
        camera: Camera,
        #[builder(default)] scene: Scene,
        #[builder(default)] mode: RenderMode,
        #[builder(default)] settings: RenderSettings,
        #[builder(default)] device: Device,
    ) -> Self {
        let rng = match settings.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        let mut environment = Environment {
            camera,
            scene,
            mode,
            settings,
            device,
            bvhs: None,
            gpu_scene: None,
            rng,
            frame: 0,
        };
        environment.camera.fill(environment.settings.background);
        environment
    }
}

impl Environment {
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Camera changes don't affect the uploaded scene.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu_scene.is_some()
    }

    /// Adds a mesh to the scene and returns its index.
    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        let degenerate = mesh
            .primitives()
            .iter()
            .filter(|primitive| primitive.geometric_normal() == WorldVector::zeros())
            .count();
        let index = self.scene.add_mesh(mesh);
        if degenerate > 0 {
            log::warn!("Mesh {index} contains {degenerate} degenerate triangles");
        }
        self.invalidate();
        index
    }

    /// Adds a single triangle as a new mesh.
    pub fn add_triangle(
        &mut self,
        a: WorldPoint,
        b: WorldPoint,
        c: WorldPoint,
        material: Material,
    ) -> usize {
        self.add_mesh(Primitive::new(a, b, c, material).into())
    }

    /// Adds a quad with vertices `a`, `b`, `c`, `d` in order around it as a new mesh.
    pub fn add_square(
        &mut self,
        a: WorldPoint,
        b: WorldPoint,
        c: WorldPoint,
        d: WorldPoint,
        material: Material,
    ) -> usize {
        self.add_mesh(Mesh::square(a, b, c, d, material))
    }

    /// Mutable access to a mesh. Drops the uploaded scene.
    pub fn mesh_mut(&mut self, index: usize) -> &mut Mesh {
        self.invalidate();
        self.scene.mesh_mut(index)
    }

    pub fn set_background(&mut self, color: Rgb) {
        self.settings.background = color;
        self.camera.fill(color);
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
    }

    pub fn set_sample_count(&mut self, sample_count: SampleCount) {
        self.settings.sample_count = sample_count;
    }

    /// Builds the BVHs of all meshes and uploads them with the scene.
    /// Rendering does this on demand, calling it up front keeps the cost out of the first
    /// frame.
    pub fn compute_bvhs(&mut self) -> Result<(), RenderError> {
        self.gpu_scene = None;
        let bvhs = self.bvhs.get_or_insert_with(|| build_bvhs(&self.scene));
        let gpu_scene = GpuScene::upload(&self.device, &self.scene, Some(bvhs.as_slice()))
            .map_err(RenderError::Upload)?;
        self.gpu_scene = Some(gpu_scene);
        Ok(())
    }

    /// Renders one frame into the camera's pixel store.
    /// The pixel store is left untouched if rendering fails.
    pub fn render(&mut self) -> Result<FrameStats, RenderError> {
        let start = Instant::now();

        let reusable = self
            .gpu_scene
            .take()
            .filter(|gpu_scene| gpu_scene.has_bvhs() || !self.mode.uses_bvh());
        let (gpu_scene, scene_uploaded) = match reusable {
            Some(gpu_scene) => (gpu_scene, false),
            None => (self.upload_scene()?, true),
        };
        let seed = self.rng.random();
        let result = self.render_frame(&gpu_scene, seed);
        self.gpu_scene = Some(gpu_scene);
        let samples = result?;

        let duration = start.elapsed();
        let fps = 1.0 / duration.as_secs_f32().max(f32::EPSILON);
        self.camera.set_fps(fps);

        let stats = FrameStats {
            frame: self.frame,
            duration,
            fps,
            samples,
            scene_uploaded,
        };
        self.frame += 1;
        log::info!(
            "Frame {} rendered in {:.2?} ({:.1} fps, {} samples)",
            stats.frame,
            stats.duration,
            stats.fps,
            stats.samples
        );
        Ok(stats)
    }

    fn upload_scene(&mut self) -> Result<GpuScene, RenderError> {
        let bvhs = if self.mode.uses_bvh() {
            Some(
                self.bvhs
                    .get_or_insert_with(|| build_bvhs(&self.scene))
                    .as_slice(),
            )
        } else {
            None
        };
        GpuScene::upload(&self.device, &self.scene, bvhs).map_err(RenderError::Upload)
    }

    /// Traces and resolves one frame, returns the number of samples traced.
    fn render_frame(&mut self, gpu_scene: &GpuScene, seed: u64) -> Result<usize, RenderError> {
        let config = ShaderConfig {
            width: self.camera.width(),
            height: self.camera.height(),
            samples: self.settings.sample_count,
            seed,
            block_size: self.settings.block_size,
            background: self.settings.background,
            gamma: self.camera.gamma(),
            max_depth: self.settings.max_depth,
        };

        let mut samples =
            DualBuffer::from_vec(vec![colors::BLACK; config.trace_launch().padded_units()]);
        let mut pixels =
            DualBuffer::from_vec(vec![colors::BLACK; config.resolve_launch().padded_units()]);
        samples.to_device(&self.device).map_err(RenderError::Upload)?;
        pixels.to_device(&self.device).map_err(RenderError::Upload)?;

        let (Some(sample_memory), Some(pixel_memory)) =
            (samples.device_memory_mut(), pixels.device_memory_mut())
        else {
            unreachable!("Buffers were just moved to the device");
        };

        shader::trace(
            &self.device,
            self.mode,
            gpu_scene.view(),
            self.camera.projection(),
            &config,
            sample_memory,
        )
        .map_err(RenderError::Dispatch)?;
        shader::resolve(&self.device, &config, sample_memory, pixel_memory)
            .map_err(RenderError::Dispatch)?;

        samples.release();
        pixels.to_host(&self.device).map_err(RenderError::Download)?;

        let pixel_count = config.pixel_count();
        self.camera
            .pixels_mut()
            .copy_from_slice(&pixels.as_slice()[..pixel_count]);

        Ok(config.sample_unit_count())
    }

    fn invalidate(&mut self) {
        self.bvhs = None;
        self.gpu_scene = None;
    }
}

fn build_bvhs(scene: &Scene) -> Vec<Bvh> {
    let start = Instant::now();
    let bvhs: Vec<_> = scene
        .meshes()
        .iter()
        .map(|mesh| Bvh::build(mesh.primitives()))
        .collect();
    log::info!("Built {} BVHs in {:.2?}", bvhs.len(), start.elapsed());
    bvhs
}
