use crate::math::Point3;
use crate::ray::Ray;

/// An axis-aligned bounding box, `min ≤ max` componentwise.
///
/// Boxes bound every object stored in the spatial index and every internal
/// node above them. The infinite plane advertises the full-extent box so
/// traversal always descends into whichever leaf holds it.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb {
    pub const fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// The box covering all of space, used by unbounded primitives.
    pub const fn everything() -> Self {
        Self::new(
            Point3::splat(f32::NEG_INFINITY),
            Point3::splat(f32::INFINITY),
        )
    }

    /// Smallest box enclosing both operands.
    pub fn merge(&self, other: &Aabb) -> Aabb {
        Aabb::new(
            self.min.min_components(other.min),
            self.max.max_components(other.max),
        )
    }

    /// Volume of the box. Degenerate (flat) boxes report zero; unbounded
    /// ones report infinity, and callers comparing enlargements must cope.
    pub fn volume(&self) -> f32 {
        (self.max.x - self.min.x) * (self.max.y - self.min.y) * (self.max.z - self.min.z)
    }

    /// Slab-test intersection against the half-line `t ≥ 0`.
    ///
    /// Intersects the ray's parameter interval with the slab between each
    /// pair of parallel planes; returns the surviving `(tmin, tmax)` with
    /// `tmin` clamped to zero, or `None` when the interval is empty or lies
    /// entirely behind the origin.
    pub fn raycast(&self, ray: &Ray) -> Option<(f32, f32)> {
        let mut t0 = f32::NEG_INFINITY;
        let mut t1 = f32::INFINITY;
        for axis in 0..3 {
            let mut near = (self.min[axis] - ray.origin()[axis]) * ray.inv_direction()[axis];
            let mut far = (self.max[axis] - ray.origin()[axis]) * ray.inv_direction()[axis];
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            // f32::max/min drop a NaN operand, which shows up when an
            // axis-parallel ray starts exactly on a slab plane.
            t0 = t0.max(near);
            t1 = t1.min(far);
            if t0 > t1 {
                return None;
            }
        }
        if t1 < 0.0 {
            return None;
        }
        Some((t0.max(0.0), t1))
    }
}
