use crate::core::error::{Result, SurfaceError};
use nalgebra::{Matrix3, Vector3};

/// Calculates the Greatest Common Divisor (Euclidean algorithm). Always non-negative.
pub fn gcd(a: i32, b: i32) -> i32 {
    let mut a = a.abs();
    let mut b = b.abs();
    while b != 0 {
        let temp = b;
        b = a % b;
        a = temp;
    }
    a
}

/// Least common multiple of two integers. Always non-negative; `lcm(0, x) == 0`.
pub fn lcm(a: i32, b: i32) -> i32 {
    if a == 0 || b == 0 {
        return 0;
    }
    (a / gcd(a, b) * b).abs()
}

pub fn gcd_all(values: &[i32]) -> i32 {
    values.iter().fold(0, |acc, &v| gcd(acc, v))
}

pub fn lcm_all(values: &[i32]) -> i32 {
    values.iter().fold(1, |acc, &v| lcm(acc, v))
}

/// Determinant of an integer 3x3 matrix, computed exactly.
pub fn determinant(m: &Matrix3<i32>) -> i64 {
    let e = |r: usize, c: usize| m[(r, c)] as i64;
    e(0, 0) * (e(1, 1) * e(2, 2) - e(1, 2) * e(2, 1))
        - e(0, 1) * (e(1, 0) * e(2, 2) - e(1, 2) * e(2, 0))
        + e(0, 2) * (e(1, 0) * e(2, 1) - e(1, 1) * e(2, 0))
}

/// Divides a Miller triple by the gcd of its components.
pub fn reduce_miller(miller: [i32; 3]) -> Result<[i32; 3]> {
    let d = gcd_all(&miller);
    if d == 0 {
        return Err(SurfaceError::InvalidPlane {
            miller,
            reason: "Miller indices cannot be (0,0,0)".into(),
        });
    }
    Ok(miller.map(|m| m / d))
}

/// Integer rows (in the bulk basis) spanning the plane of a reduced Miller index.
///
/// Lattice vectors whose Miller component is zero already lie in the plane and are taken
/// as-is. The remaining axes are combined pairwise as `-L/m_i · e_i + L/m_j · e_j`, with `L`
/// the lcm of their components, which is orthogonal to (h, k, l) by construction.
pub fn in_plane_rows(miller: &[i32; 3]) -> Vec<Vector3<i32>> {
    let mut rows: Vec<Vector3<i32>> = (0..3)
        .filter(|&i| miller[i] == 0)
        .map(|i| {
            let mut e = Vector3::zeros();
            e[i] = 1;
            e
        })
        .collect();

    let out_of_plane: Vec<usize> = (0..3).filter(|&i| miller[i] != 0).collect();
    if out_of_plane.len() > 1 {
        let components: Vec<i32> = out_of_plane.iter().map(|&i| miller[i]).collect();
        let lcm_miller = lcm_all(&components);

        'pairs: for (n, &i) in out_of_plane.iter().enumerate() {
            for &j in &out_of_plane[n + 1..] {
                if rows.len() == 2 {
                    break 'pairs;
                }
                let mut row = Vector3::zeros();
                row[i] = -lcm_miller / miller[i];
                row[j] = lcm_miller / miller[j];
                rows.push(row);
            }
        }
    }
    rows
}
