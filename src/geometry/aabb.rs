use std::ops::Sub;

use super::{FloatType, WorldBox, WorldPoint, WorldVector};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct AABB<Point> {
    pub min: Point,
    pub max: Point,
}

impl<Point> AABB<Point> {
    pub fn new(min: Point, max: Point) -> AABB<Point> {
        AABB { min, max }
    }
}

impl<Point: Sub + Copy> AABB<Point> {
    pub fn size(&self) -> Point::Output {
        self.max - self.min
    }
}

impl WorldBox {
    /// Box that contains nothing, identity element of `union`.
    pub fn empty() -> WorldBox {
        AABB {
            min: WorldPoint::from(WorldVector::repeat(FloatType::INFINITY)),
            max: WorldPoint::from(WorldVector::repeat(FloatType::NEG_INFINITY)),
        }
    }

    /// Smallest box containing all the points, None if the iterator is empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a WorldPoint>) -> Option<WorldBox> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut ret = AABB::new(*first, *first);
        for p in points {
            ret.grow(p);
        }
        Some(ret)
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Extend the box to contain the point.
    pub fn grow(&mut self, p: &WorldPoint) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn union(&self, other: &WorldBox) -> WorldBox {
        AABB {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn center(&self) -> WorldPoint {
        nalgebra::center(&self.min, &self.max)
    }

    /// Index of the axis along which the box is widest.
    /// Ties go to the lower axis index.
    pub fn largest_axis(&self) -> usize {
        self.size().imax()
    }

    /// Returns true if `other` lies completely inside this box (boundaries included).
    /// Empty box is enclosed in everything.
    pub fn encloses(&self, other: &WorldBox) -> bool {
        other.is_empty()
            || (self.min.x <= other.min.x
                && self.min.y <= other.min.y
                && self.min.z <= other.min.z
                && self.max.x >= other.max.x
                && self.max.y >= other.max.y
                && self.max.z >= other.max.z)
    }
}
