use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};

/// A reduced slab basis together with the unimodular integer mapping that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedBasis {
    /// Reduced lattice vectors as columns.
    pub basis: Matrix3<f64>,
    /// Columns express the reduced vectors in the input vectors: `basis = input * mapping`.
    pub mapping: Matrix3<i32>,
}

/// Reduces a slab basis whose first two columns span the surface plane.
///
/// The in-plane pair is Lagrange-Gauss reduced, then the out-of-plane vector is size-reduced
/// against it. Both steps are integer column operations, so the in-plane pair stays in-plane,
/// the height of the third vector along the normal is preserved, and `det(mapping) == 1`.
pub fn reduce_slab_basis(input: &Matrix3<f64>) -> ReducedBasis {
    let mut u = input.column(0).into_owned();
    let mut v = input.column(1).into_owned();
    let mut cu = Vector3::new(1, 0, 0);
    let mut cv = Vector3::new(0, 1, 0);

    // 1. Lagrange-Gauss on the in-plane pair.
    if u.norm_squared() > v.norm_squared() {
        std::mem::swap(&mut u, &mut v);
        std::mem::swap(&mut cu, &mut cv);
    }
    loop {
        let norm_sq = u.norm_squared();
        if norm_sq == 0.0 {
            break;
        }
        let mu = (u.dot(&v) / norm_sq).round();
        if mu == 0.0 {
            break;
        }
        v -= u * mu;
        cv -= cu * mu as i32;
        if v.norm_squared() >= u.norm_squared() {
            break;
        }
        std::mem::swap(&mut u, &mut v);
        std::mem::swap(&mut cu, &mut cv);
    }

    // 2. Size-reduce the third vector against the reduced plane.
    let mut w = input.column(2).into_owned();
    let mut cw = Vector3::new(0, 0, 1);
    let gram = Matrix2::new(u.dot(&u), u.dot(&v), u.dot(&v), v.dot(&v));
    if let Some(gram_inv) = gram.try_inverse() {
        let coeffs = gram_inv * Vector2::new(w.dot(&u), w.dot(&v));
        let (x, y) = (coeffs.x.round(), coeffs.y.round());
        w -= u * x + v * y;
        cw -= cu * x as i32 + cv * y as i32;
    }

    // 3. Keep the handedness of the input.
    let mut mapping = Matrix3::from_columns(&[cu, cv, cw]);
    if super::integer_basis::determinant(&mapping) < 0 {
        u = -u;
        mapping.set_column(0, &(-cu));
    }

    ReducedBasis {
        basis: Matrix3::from_columns(&[u, v, w]),
        mapping,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_mapping_consistent(input: &Matrix3<f64>, reduced: &ReducedBasis) {
        let rebuilt = input * reduced.mapping.map(|x| x as f64);
        assert!((rebuilt - reduced.basis).norm() < 1e-9);
        assert_eq!(super::super::integer_basis::determinant(&reduced.mapping), 1);
    }

    #[test]
    fn skewed_plane_is_reduced() {
        let input = Matrix3::from_columns(&[
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(7.0, 2.0, 0.0),
            Vector3::new(5.0, 4.0, 10.0),
        ]);
        let reduced = reduce_slab_basis(&input);
        assert_mapping_consistent(&input, &reduced);

        let u = reduced.basis.column(0);
        let v = reduced.basis.column(1);
        assert!(u.dot(&v).abs() <= 0.5 * u.norm_squared() + 1e-9);
        // in-plane vectors keep a zero z component, the third keeps its height
        assert!(u.z.abs() < 1e-12 && v.z.abs() < 1e-12);
        let w = reduced.basis.column(2);
        assert!((w.z - 10.0).abs() < 1e-12);
        assert!(w.x.hypot(w.y) < 1e-9);
    }

    #[test]
    fn orthogonal_basis_is_unchanged() {
        let input = Matrix3::from_diagonal(&Vector3::new(3.0, 3.0, 12.0));
        let reduced = reduce_slab_basis(&input);
        assert_eq!(reduced.mapping, Matrix3::identity());
        assert_eq!(reduced.basis, input);
    }
}
