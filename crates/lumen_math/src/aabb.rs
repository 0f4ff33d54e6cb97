use crate::Vec3;

/// Axis-Aligned Bounding Box used for scene bounds and photon range queries.
///
/// Stored as inclusive `min`/`max` corners. An empty box has `min > max` on
/// every axis and contains nothing.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// An empty box (contains nothing, grows to fit whatever is added).
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a box from its corners. The corners are reordered per axis.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create the cube centered at `center` with half-extent `radius`.
    pub fn around(center: Vec3, radius: f32) -> Self {
        let r = Vec3::splat(radius.abs());
        Self {
            min: center - r,
            max: center + r,
        }
    }

    /// Create the smallest box containing all points (EMPTY for none).
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        points
            .into_iter()
            .fold(Self::EMPTY, |acc, p| acc.include(p))
    }

    /// Returns true if no point is inside the box.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to include a point.
    pub fn include(&self, p: Vec3) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    /// Create a box that surrounds two other boxes.
    pub fn surrounding(a: &Aabb, b: &Aabb) -> Self {
        Self {
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        }
    }

    /// Grow each side by `fraction` of the box's own extent on that axis.
    pub fn expanded(&self, fraction: f32) -> Self {
        let pad = self.extent() * fraction;
        Self {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    /// Size along each axis.
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Length of the main diagonal.
    pub fn diagonal(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.extent().length()
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns true if `p` is inside or on the boundary.
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Returns true if the two boxes share at least one point.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Returns true if `other` lies entirely inside this box.
    pub fn encloses(&self, other: &Aabb) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let e = self.extent();
        if e.x > e.y && e.x > e.z {
            0
        } else if e.y > e.z {
            1
        } else {
            2
        }
    }

    /// Cut the box with the plane `axis = value`, returning (lower, upper).
    pub fn split(&self, axis: usize, value: f32) -> (Aabb, Aabb) {
        let mut lower = *self;
        let mut upper = *self;
        lower.max[axis] = value;
        upper.min[axis] = value;
        (lower, upper)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_new_orders_corners() {
        let aabb = Aabb::new(Vec3::new(10.0, 0.0, 5.0), Vec3::new(0.0, 10.0, -5.0));
        assert_eq!(aabb.min, Vec3::new(0.0, 0.0, -5.0));
        assert_eq!(aabb.max, Vec3::new(10.0, 10.0, 5.0));
    }

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points([Vec3::ZERO, Vec3::new(1.0, -2.0, 3.0), Vec3::splat(0.5)]);
        assert_eq!(aabb.min, Vec3::new(0.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 0.5, 3.0));

        let empty = Aabb::from_points(std::iter::empty());
        assert!(empty.is_empty());
        assert!(!empty.contains(Vec3::ZERO));
    }

    #[test]
    fn test_aabb_expanded() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::new(10.0, 20.0, 0.0)).expanded(0.1);
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(11.0, 22.0, 0.0));
    }

    #[test]
    fn test_aabb_contains_and_overlaps() {
        let a = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
        assert!(a.contains(Vec3::ONE));
        assert!(a.contains(Vec3::splat(2.0)));
        assert!(!a.contains(Vec3::new(2.1, 1.0, 1.0)));

        let b = Aabb::around(Vec3::splat(3.0), 1.0);
        assert!(a.overlaps(&b));
        let c = Aabb::around(Vec3::splat(5.0), 1.0);
        assert!(!a.overlaps(&c));
        assert!(a.encloses(&Aabb::around(Vec3::ONE, 0.5)));
        assert!(!a.encloses(&b));
    }

    #[test]
    fn test_aabb_longest_axis() {
        assert_eq!(Aabb::new(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0)).longest_axis(), 0);
        assert_eq!(Aabb::new(Vec3::ZERO, Vec3::new(1.0, 10.0, 1.0)).longest_axis(), 1);
        assert_eq!(Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 10.0)).longest_axis(), 2);
    }

    #[test]
    fn test_aabb_split() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::new(4.0, 2.0, 2.0));
        let (lo, hi) = aabb.split(0, 1.0);
        assert_eq!(lo.max.x, 1.0);
        assert_eq!(hi.min.x, 1.0);
        assert_eq!(lo.min, aabb.min);
        assert_eq!(hi.max, aabb.max);
    }

    #[test]
    fn test_aabb_centroid_and_diagonal() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::new(0.0, 3.0, 4.0));
        assert_eq!(aabb.centroid(), Vec3::new(0.0, 1.5, 2.0));
        assert!((aabb.diagonal() - 5.0).abs() < 1e-6);
        assert_eq!(Aabb::EMPTY.diagonal(), 0.0);
    }
}
