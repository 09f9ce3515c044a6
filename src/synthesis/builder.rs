use crate::core::error::{ensure_positive, Result, SurfaceError};
use crate::core::structure::{Crystal, Lattice, EPS};
use crate::math::{integer_basis, lll};
use crate::synthesis::plane::ResolvedPlane;
use log::{debug, warn};
use nalgebra::Matrix3;

/// The slab-only region cut from the replicated bulk, before any termination is chosen.
#[derive(Debug, Clone)]
pub struct SlabRegion {
    /// Sites of the slab; the rest of the cell (the vacuum) is empty.
    pub structure: Crystal,
    /// Rows map the bulk lattice onto `structure.lattice` (after reduction, if any).
    pub scale_factor: Matrix3<i32>,
    pub n_layers_slab: usize,
    pub n_layers_vacuum: usize,
}

impl SlabRegion {
    /// Sites in one interlayer period of the slab. The slice holds `n_layers_slab` whole periods.
    pub fn sites_per_period(&self) -> usize {
        self.structure.len() / self.n_layers_slab.max(1)
    }
}

pub struct SupercellBuilder {
    min_slab_size: f64,
    min_vacuum_size: f64,
    shift: f64,
    lll_reduce: bool,
}

impl SupercellBuilder {
    pub fn new(min_slab_size: f64, min_vacuum_size: f64) -> Self {
        Self {
            min_slab_size,
            min_vacuum_size,
            shift: 0.0,
            lll_reduce: true,
        }
    }

    pub fn with_shift(mut self, shift: f64) -> Self {
        self.shift = shift;
        self
    }

    pub fn with_lll_reduce(mut self, lll_reduce: bool) -> Self {
        self.lll_reduce = lll_reduce;
        self
    }

    pub fn build(&self, bulk: &Crystal, plane: &ResolvedPlane) -> Result<SlabRegion> {
        ensure_positive("min_slab_size", self.min_slab_size)?;
        ensure_positive("min_vacuum_size", self.min_vacuum_size)?;
        let dist = plane.interlayer_spacing;

        // 1. LAYER QUANTISATION
        let n_layers_slab = (self.min_slab_size / dist).ceil() as usize;
        let n_layers_vacuum = (self.min_vacuum_size / dist).ceil() as usize;
        let total = (n_layers_slab + n_layers_vacuum) as i32;

        // 2. SCALE FACTOR
        let [u, v] = plane.in_plane_rows;
        let w = plane.thickness_row(total);
        let mut scale_factor = Matrix3::from_rows(&[u.transpose(), v.transpose(), w.transpose()]);
        if integer_basis::determinant(&scale_factor) < 0 {
            scale_factor.set_row(0, &(-u).transpose());
        }
        debug!(
            "{} slab + {} vacuum layers, scale factor rows {:?}",
            n_layers_slab, n_layers_vacuum, scale_factor
        );

        // 3. REPLICATE AND SLICE
        let supercell = bulk.make_supercell(&scale_factor)?;
        let lower = self.shift - EPS;
        let upper = n_layers_slab as f64 * dist + self.shift - EPS;
        let sites: Vec<_> = supercell
            .sites
            .iter()
            .filter(|site| {
                let height = supercell.lattice.to_cartesian(&site.frac_coords).dot(&plane.normal);
                height >= lower && height < upper
            })
            .cloned()
            .collect();
        if sites.is_empty() {
            return Err(SurfaceError::EmptySlab { min_slab_size: self.min_slab_size });
        }
        debug!("kept {} of {} replicated sites", sites.len(), supercell.len());
        let mut structure = Crystal::new(supercell.lattice, sites);

        // 4. OPTIONAL REDUCTION
        if self.lll_reduce {
            let reduced = lll::reduce_slab_basis(&structure.lattice.matrix);
            scale_factor = reduced.mapping.transpose() * scale_factor;
            structure = structure.rebased(Lattice::new(reduced.basis)?);
        }

        // 5. ASPECT RATIO CHECK
        let [len_a, len_b, _] = structure.lattice.abc();
        let ratio = len_a.max(len_b) / len_a.min(len_b);
        if ratio > 5.0 {
            warn!(
                "high in-plane aspect ratio ({:.1}) for surface {:?}",
                ratio, plane.miller_index
            );
        }

        Ok(SlabRegion {
            structure,
            scale_factor,
            n_layers_slab,
            n_layers_vacuum,
        })
    }
}
