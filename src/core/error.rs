use thiserror::Error;

/// Failures raised while resolving planes, building slabs or placing adsorbates.
///
/// Every variant carries the offending value so callers can adjust their configuration
/// and re-invoke; nothing here is retried internally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    /// The Miller index is all-zero or does not define a usable surface normal.
    #[error("invalid Miller plane {miller:?}: {reason}")]
    InvalidPlane { miller: [i32; 3], reason: String },

    /// An adsorption site (before or after displacement) lies outside the cell.
    #[error("coordinates [{:.6}, {:.6}, {:.6}] are outside the cell: {reason}", .coords[0], .coords[1], .coords[2])]
    OutOfCell { coords: [f64; 3], reason: String },

    #[error("degenerate lattice: {0}")]
    DegenerateLattice(String),

    #[error("invalid value for `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("unknown {kind} `{name}`")]
    UnknownOption { kind: &'static str, name: String },

    #[error("supercell construction failed: {0}")]
    Supercell(String),

    #[error("slicing retained no sites (min_slab_size = {min_slab_size})")]
    EmptySlab { min_slab_size: f64 },
}

pub type Result<T> = std::result::Result<T, SurfaceError>;

/// Rejects values that are not finite and strictly positive.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SurfaceError::InvalidParameter { name, value })
    }
}
