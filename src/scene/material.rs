use crate::{geometry::FloatType, util::Rgb};

pub mod colors {
    use crate::util::Rgb;

    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
    pub const RED: Rgb = Rgb::new(1.0, 0.0, 0.0);
    pub const GREEN: Rgb = Rgb::new(0.0, 1.0, 0.0);
    pub const BLUE: Rgb = Rgb::new(0.0, 0.0, 1.0);
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MaterialKind {
    /// Lambertian surface
    Diffuse,
    /// Perfect mirror, tinted by the color
    Reflective,
    /// Dielectric with the given index of refraction
    Refractive { index: FloatType },
    /// Emits its color, paths end here
    Light,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Material {
    pub color: Rgb,
    pub kind: MaterialKind,
}

impl Material {
    pub const GLASS_INDEX: FloatType = 1.5;

    pub const fn diffuse(color: Rgb) -> Material {
        Material {
            color,
            kind: MaterialKind::Diffuse,
        }
    }

    pub const fn reflective(color: Rgb) -> Material {
        Material {
            color,
            kind: MaterialKind::Reflective,
        }
    }

    pub const fn glass(color: Rgb) -> Material {
        Material {
            color,
            kind: MaterialKind::Refractive {
                index: Self::GLASS_INDEX,
            },
        }
    }

    pub const fn light(color: Rgb) -> Material {
        Material {
            color,
            kind: MaterialKind::Light,
        }
    }

    pub fn with_color(self, color: Rgb) -> Material {
        Material { color, ..self }
    }

    pub fn is_light(&self) -> bool {
        self.kind == MaterialKind::Light
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::diffuse(colors::WHITE)
    }
}

impl From<Rgb> for Material {
    fn from(color: Rgb) -> Self {
        Material::diffuse(color)
    }
}
