use assert2::debug_assert;

use crate::{
    bvh::{Bvh, BvhNode, BvhView},
    device::{Device, DeviceCopy, DeviceError},
    dual_buffer::DualBuffer,
    scene::{Primitive, Scene},
};

/// Location of one mesh's data in the concatenated scene buffers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshInfo {
    pub primitive_offset: u32,
    pub primitive_count: u32,
    pub node_offset: u32,
    /// Zero when the mesh has no BVH uploaded
    pub node_count: u32,
}

/// Scene geometry and BVHs resident in device memory.
///
/// All meshes share one buffer per kind of data. Node child indices and primitive indices
/// stay relative to their mesh, kernels slice the buffers using the mesh's `MeshInfo`.
#[derive(Debug)]
pub struct GpuScene {
    primitives: DualBuffer<Primitive>,
    nodes: DualBuffer<BvhNode>,
    primitive_indices: DualBuffer<u32>,
    meshes: DualBuffer<MeshInfo>,
    has_bvhs: bool,
}

impl GpuScene {
    /// Uploads the scene, together with one BVH per mesh if `bvhs` is given.
    pub fn upload(
        device: &Device,
        scene: &Scene,
        bvhs: Option<&[Bvh]>,
    ) -> Result<GpuScene, DeviceError> {
        if let Some(bvhs) = bvhs {
            debug_assert!(bvhs.len() == scene.meshes().len());
            device_index(bvhs.iter().map(|bvh| bvh.nodes().len()).sum());
        }
        device_index(scene.primitive_count());

        let mut primitives = DualBuffer::with_capacity(scene.primitive_count());
        let mut nodes = DualBuffer::new();
        let mut primitive_indices = DualBuffer::with_capacity(scene.primitive_count());
        let mut meshes = DualBuffer::with_capacity(scene.meshes().len());

        for (i, mesh) in scene.meshes().iter().enumerate() {
            let mut info = MeshInfo {
                primitive_offset: device_index(primitives.len()),
                primitive_count: device_index(mesh.len()),
                node_offset: device_index(nodes.len()),
                node_count: 0,
            };
            for primitive in mesh.primitives() {
                primitives.append(*primitive);
            }

            if let Some(bvh) = bvhs.and_then(|bvhs| bvhs.get(i)) {
                info.node_count = device_index(bvh.nodes().len());
                for node in bvh.nodes().iter() {
                    nodes.append(*node);
                }
                for index in bvh.primitive_indices() {
                    primitive_indices.append(*index);
                }
            }

            meshes.append(info);
        }

        primitives.to_device(device)?;
        nodes.to_device(device)?;
        primitive_indices.to_device(device)?;
        meshes.to_device(device)?;

        log::info!(
            "Uploaded {} meshes with {} primitives and {} BVH nodes",
            meshes.len(),
            primitives.len(),
            nodes.len()
        );

        Ok(GpuScene {
            primitives,
            nodes,
            primitive_indices,
            meshes,
            has_bvhs: bvhs.is_some(),
        })
    }

    pub fn has_bvhs(&self) -> bool {
        self.has_bvhs
    }

    pub fn view(&self) -> SceneView<'_> {
        SceneView {
            primitives: device_slice(&self.primitives),
            nodes: device_slice(&self.nodes),
            primitive_indices: device_slice(&self.primitive_indices),
            meshes: device_slice(&self.meshes),
        }
    }
}

/// Offsets and counts are `u32` on the device.
fn device_index(value: usize) -> u32 {
    debug_assert!(
        u32::try_from(value).is_ok(),
        "Scene too large for u32 offsets: {value}"
    );
    value as u32
}

fn device_slice<T: DeviceCopy>(buffer: &DualBuffer<T>) -> &[T] {
    debug_assert!(buffer.device_view().is_some());
    buffer
        .device_view()
        .map(|view| view.as_slice())
        .unwrap_or_default()
}

/// Kernel side view of a `GpuScene`.
#[derive(Copy, Clone, Debug)]
pub struct SceneView<'a> {
    primitives: &'a [Primitive],
    nodes: &'a [BvhNode],
    primitive_indices: &'a [u32],
    meshes: &'a [MeshInfo],
}

impl<'a> SceneView<'a> {
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn meshes(&self) -> &'a [MeshInfo] {
        self.meshes
    }

    pub fn primitives(&self) -> &'a [Primitive] {
        self.primitives
    }

    /// Primitives of one mesh.
    pub fn mesh_primitives(&self, mesh: &MeshInfo) -> &'a [Primitive] {
        let start = mesh.primitive_offset as usize;
        &self.primitives[start..start + mesh.primitive_count as usize]
    }

    /// BVH of one mesh, None if the mesh was uploaded without one.
    pub fn mesh_bvh(&self, mesh: &MeshInfo) -> Option<BvhView<'a>> {
        if mesh.node_count == 0 {
            return None;
        }
        let node_start = mesh.node_offset as usize;
        let primitive_start = mesh.primitive_offset as usize;
        let primitive_end = primitive_start + mesh.primitive_count as usize;
        Some(BvhView::new(
            &self.nodes[node_start..node_start + mesh.node_count as usize],
            &self.primitive_indices[primitive_start..primitive_end],
            &self.primitives[primitive_start..primitive_end],
        ))
    }
}
