use crate::core::error::{ensure_positive, Result, SurfaceError};
use crate::core::structure::{Crystal, Site, EPS};
use log::debug;
use nalgebra::Vector3;

/// Reference site of an adsorption, with the coordinate system it is expressed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SiteCoordinates {
    /// Fractional coordinates, each in [0, 1].
    Fractional(Vector3<f64>),
    /// Cartesian coordinates, each in [0, corresponding cell length].
    Cartesian(Vector3<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdsorptionRequest {
    pub site: SiteCoordinates,
    pub species: String,
    /// Distance between the reference site and the adsorbate.
    pub distance: f64,
    /// Direction of the surface, in the reciprocal basis (same basis as Miller indices).
    pub surface: Vector3<f64>,
}

impl AdsorptionRequest {
    /// Request along the out-of-plane axis `[0, 0, 1]`.
    pub fn new(site: SiteCoordinates, species: impl Into<String>, distance: f64) -> Self {
        Self {
            site,
            species: species.into(),
            distance,
            surface: Vector3::z(),
        }
    }

    pub fn with_surface(mut self, surface: Vector3<f64>) -> Self {
        self.surface = surface;
        self
    }
}

pub struct AdsorptionPlacer;

impl AdsorptionPlacer {
    /// Returns a copy of `structure` with the adsorbate appended. The input is not modified.
    pub fn adsorb(structure: &Crystal, request: &AdsorptionRequest) -> Result<Crystal> {
        let position = Self::placement(structure, request)?;
        debug!("adsorbing {} at {:?}", request.species, position.as_slice());
        Ok(structure.with_site(Site::new(request.species.clone(), position)))
    }

    /// Fractional position the adsorbate would occupy.
    pub fn placement(structure: &Crystal, request: &AdsorptionRequest) -> Result<Vector3<f64>> {
        ensure_positive("distance", request.distance)?;
        let lattice = &structure.lattice;
        let abc = Vector3::from(lattice.abc());

        // 1. Displacement along the surface direction.
        let direction = lattice.reciprocal_matrix * request.surface;
        let length = direction.norm();
        if !(length.is_finite() && length > EPS) {
            return Err(SurfaceError::InvalidParameter {
                name: "surface direction length",
                value: length,
            });
        }
        let displacement = (direction / length * request.distance).component_div(&abc);

        // 2. Reference site in fractional coordinates.
        let origin = match request.site {
            SiteCoordinates::Fractional(frac) => {
                if frac.iter().any(|&x| x < -EPS || x > 1.0 + EPS) {
                    return Err(out_of_cell(&frac, "fractional site must lie in [0, 1]"));
                }
                frac
            }
            SiteCoordinates::Cartesian(cart) => {
                if cart.iter().zip(abc.iter()).any(|(&x, &len)| x < -EPS || x > len + EPS) {
                    return Err(out_of_cell(&cart, "cartesian site must lie within the cell lengths"));
                }
                lattice.to_fractional(&cart)
            }
        };

        // 3. The adsorbate itself must stay in the cell.
        let position = origin + displacement;
        if position.iter().any(|&x| x < -EPS || x > 1.0 + EPS) {
            return Err(out_of_cell(&position, "adsorbate would land outside the cell"));
        }
        Ok(position)
    }
}

fn out_of_cell(coords: &Vector3<f64>, reason: &str) -> SurfaceError {
    SurfaceError::OutOfCell {
        coords: [coords.x, coords.y, coords.z],
        reason: reason.to_string(),
    }
}
