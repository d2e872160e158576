mod material;
mod primitive;

pub use material::{Material, MaterialKind, colors};
pub use primitive::Primitive;

use crate::geometry::{WorldBox, WorldPoint, WorldVector};

/// Ordered collection of primitives that share one acceleration structure.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    primitives: Vec<Primitive>,
}

impl Mesh {
    pub fn new() -> Mesh {
        Mesh::default()
    }

    pub fn push(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn primitives_mut(&mut self) -> &mut [Primitive] {
        &mut self.primitives
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn bounds(&self) -> WorldBox {
        self.primitives
            .iter()
            .fold(WorldBox::empty(), |acc, p| acc.union(p.bounds()))
    }

    pub fn translate(&mut self, offset: &WorldVector) {
        for p in &mut self.primitives {
            p.translate(offset);
        }
    }

    /// Two triangle quad `(a, b, d)`, `(b, c, d)`, vertices are expected in order around
    /// the quad.
    pub fn square(
        a: WorldPoint,
        b: WorldPoint,
        c: WorldPoint,
        d: WorldPoint,
        material: Material,
    ) -> Mesh {
        [
            Primitive::new(a, b, d, material),
            Primitive::new(b, c, d, material),
        ]
        .into_iter()
        .collect()
    }
}

impl From<Primitive> for Mesh {
    fn from(primitive: Primitive) -> Self {
        Mesh {
            primitives: vec![primitive],
        }
    }
}

impl FromIterator<Primitive> for Mesh {
    fn from_iter<I: IntoIterator<Item = Primitive>>(iter: I) -> Self {
        Mesh {
            primitives: iter.into_iter().collect(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Scene {
    meshes: Vec<Mesh>,
}

impl Scene {
    pub fn new() -> Scene {
        Scene::default()
    }

    /// Adds a mesh and returns its index.
    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn mesh_mut(&mut self, index: usize) -> &mut Mesh {
        &mut self.meshes[index]
    }

    pub fn primitive_count(&self) -> usize {
        self.meshes.iter().map(Mesh::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.primitive_count() == 0
    }

    pub fn bounds(&self) -> WorldBox {
        self.meshes
            .iter()
            .fold(WorldBox::empty(), |acc, m| acc.union(&m.bounds()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;

    #[test]
    fn square_splits_into_two_triangles() {
        let [a, b, c, d] = [
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(1.0, 1.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
        ];
        let mesh = Mesh::square(a, b, c, d, Material::default());

        assert!(mesh.len() == 2);
        assert!(*mesh.primitives()[0].vertices() == crate::geometry::Triangle::new(a, b, d));
        assert!(*mesh.primitives()[1].vertices() == crate::geometry::Triangle::new(b, c, d));
        assert!(mesh.bounds() == WorldBox::new(a, c));
    }

    #[test]
    fn empty_scene_has_empty_bounds() {
        let mut scene = Scene::new();
        assert!(scene.bounds().is_empty());
        scene.add_mesh(Mesh::new());
        assert!(scene.is_empty());
        assert!(scene.bounds().is_empty());
    }

    #[test]
    fn translated_mesh_bounds() {
        let mut mesh = Mesh::square(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(1.0, 1.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
            Material::default(),
        );
        mesh.translate(&WorldVector::new(0.0, 0.0, 2.0));
        assert!(mesh.bounds().min.z == 2.0);
        assert!(mesh.bounds().max.z == 2.0);
    }
}
