use crate::geometry::{
    BarycentricCoordinates, FloatType, Ray, Triangle, WorldBox, WorldPoint, WorldVector,
};

use super::Material;

/// Triangle with its material and a cached bounding box.
/// The bounding box is kept up to date by every mutator.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Primitive {
    vertices: Triangle<WorldPoint>,
    normals: Option<Triangle<WorldVector>>,
    material: Material,
    bounds: WorldBox,
}

impl Primitive {
    pub fn new(a: WorldPoint, b: WorldPoint, c: WorldPoint, material: Material) -> Primitive {
        Self::from_triangle(Triangle::new(a, b, c), material)
    }

    pub fn from_triangle(vertices: Triangle<WorldPoint>, material: Material) -> Primitive {
        Primitive {
            vertices,
            normals: None,
            material,
            bounds: vertices.bounding_box(),
        }
    }

    pub fn vertices(&self) -> &Triangle<WorldPoint> {
        &self.vertices
    }

    pub fn vertex(&self, index: usize) -> WorldPoint {
        self.vertices[index]
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn bounds(&self) -> &WorldBox {
        &self.bounds
    }

    pub fn centroid(&self) -> WorldPoint {
        self.vertices.centroid()
    }

    pub fn set_vertex(&mut self, index: usize, position: WorldPoint) {
        self.vertices[index] = position;
        self.update_bounds();
    }

    pub fn translate(&mut self, offset: &WorldVector) {
        self.vertices = self.vertices.map(|p| p + offset);
        self.update_bounds();
    }

    /// Sets the shading normal of one vertex.
    /// Vertices without an explicit normal use the geometric one.
    pub fn set_normal(&mut self, index: usize, normal: WorldVector) {
        let geometric = self.geometric_normal();
        let normals = self
            .normals
            .get_or_insert_with(|| Triangle::new(geometric, geometric, geometric));
        normals[index] = normal.try_normalize(0.0).unwrap_or(geometric);
    }

    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    /// Normalized geometric normal, follows the winding order.
    /// Zero for degenerate triangles.
    pub fn geometric_normal(&self) -> WorldVector {
        self.vertices
            .normal()
            .try_normalize(0.0)
            .unwrap_or_else(WorldVector::zeros)
    }

    /// Normalized normal at the given point of the triangle.
    pub fn normal_at(&self, uv: &BarycentricCoordinates<FloatType>) -> WorldVector {
        match &self.normals {
            Some(normals) => uv
                .interpolate_triangle(normals)
                .try_normalize(0.0)
                .unwrap_or_else(|| self.geometric_normal()),
            None => self.geometric_normal(),
        }
    }

    pub fn intersect(&self, ray: &Ray) -> Option<(FloatType, BarycentricCoordinates<FloatType>)> {
        self.vertices.intersect(ray)
    }

    fn update_bounds(&mut self) {
        self.bounds = self.vertices.bounding_box();
    }
}
