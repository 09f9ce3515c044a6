use crate::core::error::{Result, SurfaceError};
use nalgebra::{Matrix3, Vector3};
use std::collections::BTreeMap;

/// Tolerance shared by every inclusion and boundary test (fractional or length units).
pub const EPS: f64 = 1e-8;

// ============================================================================
// TRAITS
// ============================================================================

pub trait CifRepresentable {
    fn lattice(&self) -> &Lattice;
    fn sites(&self) -> &[Site];
}

// ============================================================================
// HELPERS
// ============================================================================

/// Maps a fractional coordinate into [0, 1). Values within `EPS` of 1 fold to 0.
pub fn wrap_fractional(x: f64) -> f64 {
    let w = x - x.floor();
    if w >= 1.0 - EPS {
        0.0
    } else {
        w
    }
}

fn wrap_vector(v: &Vector3<f64>) -> Vector3<f64> {
    v.map(wrap_fractional)
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Lattice vectors are the COLUMNS of `matrix`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    pub matrix: Matrix3<f64>,
    /// Crystallographic reciprocal vectors (no 2π) as columns: a_i · b*_j = δ_ij.
    pub reciprocal_matrix: Matrix3<f64>,
}

impl Lattice {
    pub fn new(matrix: Matrix3<f64>) -> Result<Self> {
        if matrix.iter().any(|x| !x.is_finite()) {
            return Err(SurfaceError::DegenerateLattice("non-finite lattice vector".into()));
        }
        if matrix.determinant().abs() < 1e-6 {
            return Err(SurfaceError::DegenerateLattice(
                "lattice has zero or near-zero volume".into(),
            ));
        }
        let reciprocal_matrix = matrix
            .try_inverse()
            .ok_or_else(|| SurfaceError::DegenerateLattice("lattice is not invertible".into()))?
            .transpose();
        Ok(Self {
            matrix,
            reciprocal_matrix,
        })
    }

    pub fn from_parameters(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Result<Self> {
        let alpha_r = alpha.to_radians();
        let beta_r = beta.to_radians();
        let gamma_r = gamma.to_radians();

        let term = 1.0 - alpha_r.cos().powi(2) - beta_r.cos().powi(2) - gamma_r.cos().powi(2)
            + 2.0 * alpha_r.cos() * beta_r.cos() * gamma_r.cos();

        if term <= 0.0 {
            return Err(SurfaceError::DegenerateLattice(format!(
                "invalid lattice angles ({alpha}, {beta}, {gamma})"
            )));
        }

        let v_factor = term.sqrt();
        let matrix = Matrix3::new(
            a, b * gamma_r.cos(), c * beta_r.cos(),
            0.0, b * gamma_r.sin(), c * (alpha_r.cos() - beta_r.cos() * gamma_r.cos()) / gamma_r.sin(),
            0.0, 0.0, c * v_factor / gamma_r.sin(),
        );
        Self::new(matrix)
    }

    pub fn cubic(a: f64) -> Result<Self> {
        Self::from_parameters(a, a, a, 90.0, 90.0, 90.0)
    }

    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Result<Self> {
        Self::from_parameters(a, b, c, 90.0, 90.0, 90.0)
    }

    pub fn hexagonal(a: f64, c: f64) -> Result<Self> {
        Self::from_parameters(a, a, c, 90.0, 90.0, 120.0)
    }

    pub fn to_cartesian(&self, frac: &Vector3<f64>) -> Vector3<f64> { self.matrix * frac }
    pub fn to_fractional(&self, cart: &Vector3<f64>) -> Vector3<f64> { self.inverse() * cart }

    /// Inverse of the basis matrix (maps cartesian to fractional coordinates).
    pub fn inverse(&self) -> Matrix3<f64> {
        self.reciprocal_matrix.transpose()
    }

    pub fn vector(&self, i: usize) -> Vector3<f64> {
        self.matrix.column(i).into_owned()
    }

    pub fn reciprocal_vector(&self, i: usize) -> Vector3<f64> {
        self.reciprocal_matrix.column(i).into_owned()
    }

    pub fn abc(&self) -> [f64; 3] {
        [0, 1, 2].map(|i| self.matrix.column(i).norm())
    }

    pub fn angles(&self) -> [f64; 3] {
        let [a, b, c] = self.abc();
        let alpha = (self.matrix.column(1).dot(&self.matrix.column(2)) / (b * c)).acos().to_degrees();
        let beta = (self.matrix.column(0).dot(&self.matrix.column(2)) / (a * c)).acos().to_degrees();
        let gamma = (self.matrix.column(0).dot(&self.matrix.column(1)) / (a * b)).acos().to_degrees();
        [alpha, beta, gamma]
    }

    pub fn to_parameters(&self) -> (f64, f64, f64, f64, f64, f64) {
        let [a, b, c] = self.abc();
        let [alpha, beta, gamma] = self.angles();
        (a, b, c, alpha, beta, gamma)
    }

    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    /// Height of the cell along `normal`, i.e. the projection of the third vector.
    pub fn height_along(&self, normal: &Vector3<f64>) -> f64 {
        self.matrix.column(2).dot(normal)
    }

    /// Area spanned by the first two lattice vectors.
    pub fn ab_area(&self) -> f64 {
        self.vector(0).cross(&self.vector(1)).norm()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub species: String,
    pub frac_coords: Vector3<f64>,
    /// Arbitrary scalar annotations (magnetic moment, charge, ...), carried through every transform.
    pub properties: BTreeMap<String, f64>,
}

impl Site {
    pub fn new(species: impl Into<String>, frac_coords: Vector3<f64>) -> Self {
        Self {
            species: species.into(),
            frac_coords,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: f64) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    fn moved_to(&self, frac_coords: Vector3<f64>) -> Self {
        Self {
            species: self.species.clone(),
            frac_coords,
            properties: self.properties.clone(),
        }
    }
}

/// A periodic structure. Transforms never mutate `self`; they return new instances.
#[derive(Debug, Clone, PartialEq)]
pub struct Crystal {
    pub lattice: Lattice,
    pub sites: Vec<Site>,
}

impl CifRepresentable for Crystal {
    fn lattice(&self) -> &Lattice { &self.lattice }
    fn sites(&self) -> &[Site] { &self.sites }
}

impl Crystal {
    pub fn new(lattice: Lattice, sites: Vec<Site>) -> Self {
        Self { lattice, sites }
    }

    pub fn from_species(lattice: Lattice, species: &[&str], coords: &[[f64; 3]]) -> Result<Self> {
        if species.len() != coords.len() {
            return Err(SurfaceError::InvalidParameter {
                name: "species/coords length",
                value: coords.len() as f64,
            });
        }
        let sites = species
            .iter()
            .zip(coords)
            .map(|(sp, c)| Site::new(*sp, Vector3::new(c[0], c[1], c[2])))
            .collect();
        Ok(Self { lattice, sites })
    }

    pub fn len(&self) -> usize { self.sites.len() }
    pub fn is_empty(&self) -> bool { self.sites.is_empty() }

    /// Translates every site by a fractional vector.
    pub fn translated(&self, vector: &Vector3<f64>, wrap: bool) -> Crystal {
        self.translated_where(vector, wrap, |_| true)
    }

    /// Translates the sites accepted by `select`; the others are copied unchanged.
    pub fn translated_where<F>(&self, vector: &Vector3<f64>, wrap: bool, select: F) -> Crystal
    where
        F: Fn(&Site) -> bool,
    {
        let sites = self
            .sites
            .iter()
            .map(|site| {
                if !select(site) {
                    return site.clone();
                }
                let moved = site.frac_coords + vector;
                site.moved_to(if wrap { wrap_vector(&moved) } else { moved })
            })
            .collect();
        Crystal::new(self.lattice.clone(), sites)
    }

    /// Returns a copy with the sites rearranged into `order` (a permutation of indices).
    pub fn reordered(&self, order: &[usize]) -> Crystal {
        let sites = order.iter().map(|&i| self.sites[i].clone()).collect();
        Crystal::new(self.lattice.clone(), sites)
    }

    /// Returns a copy with one extra site appended.
    pub fn with_site(&self, site: Site) -> Crystal {
        let mut sites = self.sites.clone();
        sites.push(site);
        Crystal::new(self.lattice.clone(), sites)
    }

    /// Expresses the same atoms in an equivalent `lattice`, wrapping into [0, 1).
    pub fn rebased(&self, lattice: Lattice) -> Crystal {
        let sites = self
            .sites
            .iter()
            .map(|site| {
                let cart = self.lattice.to_cartesian(&site.frac_coords);
                site.moved_to(wrap_vector(&lattice.to_fractional(&cart)))
            })
            .collect();
        Crystal::new(lattice, sites)
    }

    /// Replicates the structure under an integer transform.
    ///
    /// Rows of `scale` are the new lattice vectors expressed in the current ones, so the new
    /// basis is `matrix * scaleᵀ` and the site count grows by `|det scale|`.
    pub fn make_supercell(&self, scale: &Matrix3<i32>) -> Result<Crystal> {
        let multiplicity = crate::math::integer_basis::determinant(scale).unsigned_abs() as usize;
        if multiplicity == 0 {
            return Err(SurfaceError::Supercell(format!("singular scale matrix {scale:?}")));
        }

        let transform = scale.transpose().map(|x| x as f64);
        let lattice = Lattice::new(self.lattice.matrix * transform)?;
        let inv_transform = transform
            .try_inverse()
            .ok_or_else(|| SurfaceError::Supercell("scale matrix is not invertible".into()))?;

        // 1. Bounding box of the new cell in old fractional coordinates.
        let mut lo = [i32::MAX; 3];
        let mut hi = [i32::MIN; 3];
        for corner in 0..8 {
            let unit = Vector3::new((corner & 1) as f64, ((corner >> 1) & 1) as f64, ((corner >> 2) & 1) as f64);
            let p = transform * unit;
            for axis in 0..3 {
                lo[axis] = lo[axis].min(p[axis].floor() as i32);
                hi[axis] = hi[axis].max(p[axis].ceil() as i32);
            }
        }

        // 2. Keep every lattice translation of every site that lands inside the new cell.
        let folded: Vec<Vector3<f64>> = self.sites.iter().map(|s| wrap_vector(&s.frac_coords)).collect();
        let mut sites = Vec::with_capacity(self.sites.len() * multiplicity);
        for i in lo[0]..=hi[0] {
            for j in lo[1]..=hi[1] {
                for k in lo[2]..=hi[2] {
                    let t = Vector3::new(i as f64, j as f64, k as f64);
                    for (site, frac) in self.sites.iter().zip(&folded) {
                        let f = inv_transform * (frac + t);
                        if f.iter().all(|&x| x >= -EPS && x < 1.0 - EPS) {
                            sites.push(site.moved_to(f.map(|x| x.max(0.0))));
                        }
                    }
                }
            }
        }

        if sites.len() != self.sites.len() * multiplicity {
            return Err(SurfaceError::Supercell(format!(
                "expected {} sites, replicated {}",
                self.sites.len() * multiplicity,
                sites.len()
            )));
        }
        Ok(Crystal::new(lattice, sites))
    }
}
