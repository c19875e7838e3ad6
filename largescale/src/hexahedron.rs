//! Eight-corner bounding volumes
//!
//! Corner ordering: 0 at the local origin, 1..3 walk the bottom face
//! (+x, +x+y, +y), 4..7 repeat the same walk on the top (+z) face. Grid
//! cells derive their corners by trilinear interpolation of the global
//! volume, so a grid of cells tiles its parent exactly.

use nalgebra::{Point3, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hexahedron {
    pub corners: [Point3<f64>; 8],
}

/// Quad faces in corner indices, outward order irrelevant (orientation is
/// resolved against the centroid in `contains`).
const FACES: [[usize; 4]; 6] = [
    [0, 1, 2, 3],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 3, 7, 6],
    [3, 0, 4, 7],
];

impl Hexahedron {
    pub fn new(corners: [Point3<f64>; 8]) -> Self {
        Self { corners }
    }

    /// Axis-aligned box from its min/max corners.
    pub fn from_aabb(min: Point3<f64>, max: Point3<f64>) -> Self {
        let c = |x, y, z| {
            Point3::new(
                if x { max.x } else { min.x },
                if y { max.y } else { min.y },
                if z { max.z } else { min.z },
            )
        };
        Self {
            corners: [
                c(false, false, false),
                c(true, false, false),
                c(true, true, false),
                c(false, true, false),
                c(false, false, true),
                c(true, false, true),
                c(true, true, true),
                c(false, true, true),
            ],
        }
    }

    /// Trilinear interpolation of the corners at fractional coordinates in
    /// `[0, 1]^3`.
    pub fn trilinear(&self, f: Vector3<f64>) -> Point3<f64> {
        let lerp = |a: Point3<f64>, b: Point3<f64>, t: f64| a + (b - a) * t;
        let c = &self.corners;
        let bottom = lerp(lerp(c[0], c[1], f.x), lerp(c[3], c[2], f.x), f.y);
        let top = lerp(lerp(c[4], c[5], f.x), lerp(c[7], c[6], f.x), f.y);
        lerp(bottom, top, f.z)
    }

    /// Sub-hexahedron spanning fractional range `[lo, hi]` of this volume.
    pub fn sub_volume(&self, lo: Vector3<f64>, hi: Vector3<f64>) -> Hexahedron {
        let f = |x, y, z| {
            self.trilinear(Vector3::new(
                if x { hi.x } else { lo.x },
                if y { hi.y } else { lo.y },
                if z { hi.z } else { lo.z },
            ))
        };
        Hexahedron {
            corners: [
                f(false, false, false),
                f(true, false, false),
                f(true, true, false),
                f(false, true, false),
                f(false, false, true),
                f(true, false, true),
                f(true, true, true),
                f(false, true, true),
            ],
        }
    }

    pub fn center(&self) -> Point3<f64> {
        let sum: Vector3<f64> = self.corners.iter().map(|c| c.coords).sum();
        Point3::from(sum / 8.0)
    }

    /// Scale all corners about the centroid. Factor 1.0 is the identity;
    /// factors above 1.0 grow the volume.
    pub fn inflate(&self, factor: f64) -> Hexahedron {
        let c = self.center();
        let mut corners = self.corners;
        for corner in &mut corners {
            *corner = c + (*corner - c) * factor;
        }
        Hexahedron { corners }
    }

    pub fn aabb(&self) -> (Point3<f64>, Point3<f64>) {
        let mut min = self.corners[0];
        let mut max = self.corners[0];
        for c in &self.corners[1..] {
            min = Point3::new(min.x.min(c.x), min.y.min(c.y), min.z.min(c.z));
            max = Point3::new(max.x.max(c.x), max.y.max(c.y), max.z.max(c.z));
        }
        (min, max)
    }

    /// Point containment via the six face half-spaces, oriented against the
    /// centroid.
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        let center = self.center();
        for face in &FACES {
            let a = self.corners[face[0]];
            let b = self.corners[face[1]];
            let c = self.corners[face[2]];
            let normal = (b - a).cross(&(c - a));
            if normal.norm_squared() < 1e-24 {
                continue;
            }
            let side_p = normal.dot(&(p - a));
            let side_c = normal.dot(&(center - a));
            if side_p * side_c < 0.0 {
                return false;
            }
        }
        true
    }

    /// Overlap test: mutual corner containment with an AABB fallback.
    /// Exact for axis-aligned boxes, conservative otherwise.
    pub fn intersects(&self, other: &Hexahedron) -> bool {
        if other.corners.iter().any(|c| self.contains(c))
            || self.corners.iter().any(|c| other.contains(c))
        {
            return true;
        }
        let (amin, amax) = self.aabb();
        let (bmin, bmax) = other.aabb();
        amin.x <= bmax.x
            && amax.x >= bmin.x
            && amin.y <= bmax.y
            && amax.y >= bmin.y
            && amin.z <= bmax.z
            && amax.z >= bmin.z
    }

    /// Volume, exact for axis-aligned boxes.
    pub fn aabb_volume(&self) -> f64 {
        let (min, max) = self.aabb();
        (max.x - min.x) * (max.y - min.y) * (max.z - min.z)
    }
}
