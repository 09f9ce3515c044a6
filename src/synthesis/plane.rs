use crate::core::error::{Result, SurfaceError};
use crate::core::structure::{Lattice, EPS};
use crate::math::integer_basis;
use log::debug;
use nalgebra::Vector3;

/// Geometry of a crystallographic plane relative to a bulk lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlane {
    /// Coprime Miller index.
    pub miller_index: [i32; 3],
    /// Unit surface normal (cartesian).
    pub normal: Vector3<f64>,
    /// Two integer rows, in the bulk basis, lying in the plane.
    pub in_plane_rows: [Vector3<i32>; 2],
    /// Index of the bulk vector repeated through the slab and vacuum.
    pub thickness_index: usize,
    /// Projection of that vector on the normal: the per-cell interlayer spacing.
    pub interlayer_spacing: f64,
}

impl ResolvedPlane {
    /// Integer row for the thickness vector repeated `repeats` times, oriented along `+normal`.
    pub fn thickness_row(&self, repeats: i32) -> Vector3<i32> {
        let mut row = Vector3::zeros();
        row[self.thickness_index] = repeats * self.miller_index[self.thickness_index].signum();
        row
    }
}

pub struct MillerPlaneResolver;

impl MillerPlaneResolver {
    pub fn resolve(lattice: &Lattice, miller: [i32; 3]) -> Result<ResolvedPlane> {
        let miller_index = integer_basis::reduce_miller(miller)?;
        let invalid = |reason: &str| SurfaceError::InvalidPlane {
            miller,
            reason: reason.to_string(),
        };

        // 1. Normal from the reciprocal lattice vector G = h a* + k b* + l c*.
        let hkl = Vector3::new(miller_index[0] as f64, miller_index[1] as f64, miller_index[2] as f64);
        let reciprocal = lattice.reciprocal_matrix * hkl;
        let g_norm = reciprocal.norm();
        if !g_norm.is_finite() || g_norm < EPS {
            return Err(invalid("reciprocal lattice vector has zero length"));
        }
        let normal = reciprocal / g_norm;

        // 2. Thickness vector: the out-of-plane lattice vector with the smallest projection.
        let mut thickness: Option<(usize, f64)> = None;
        for i in (0..3).filter(|&i| miller_index[i] != 0) {
            let d = lattice.vector(i).dot(&normal).abs();
            if d > EPS && thickness.map_or(true, |(_, best)| d < best) {
                thickness = Some((i, d));
            }
        }
        let (thickness_index, interlayer_spacing) =
            thickness.ok_or_else(|| invalid("no lattice vector has a nonzero projection on the normal"))?;

        // 3. In-plane rows.
        let rows = integer_basis::in_plane_rows(&miller_index);
        let in_plane_rows = match rows.as_slice() {
            [u, v] => [*u, *v],
            _ => return Err(invalid("could not build two in-plane lattice vectors")),
        };

        debug!(
            "plane {:?} -> reduced {:?}, thickness vector {}, dist {:.4}",
            miller, miller_index, thickness_index, interlayer_spacing
        );

        Ok(ResolvedPlane {
            miller_index,
            normal,
            in_plane_rows,
            thickness_index,
            interlayer_spacing,
        })
    }
}
