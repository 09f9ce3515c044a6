// ============================================================================
// MODULE DECLARATIONS
// ============================================================================
pub mod core;
pub mod io;
pub mod math;
pub mod analysis;
pub mod synthesis;
pub mod chemistry;

// ============================================================================
// RE-EXPORTS (Public API)
// ============================================================================
pub use crate::core::error::{Result, SurfaceError};
pub use crate::core::structure::{CifRepresentable, Crystal, Lattice, Site};
pub use crate::io::{parser, writer};

pub use crate::analysis::clustering::{Criterion, HierarchicalClustering, LayerClustering, Linkage};
pub use crate::analysis::layers::{ClusteringWarning, LayerClusterer, TerminationBoundary};
pub use crate::synthesis::assembler::SlabAssembler;
pub use crate::synthesis::builder::SupercellBuilder;
pub use crate::synthesis::plane::{MillerPlaneResolver, ResolvedPlane};
pub use crate::synthesis::slab::{SlabMetadata, SlabSet, SlabVariant};
pub use crate::chemistry::adsorption::{AdsorptionPlacer, AdsorptionRequest, SiteCoordinates};

use crate::core::error::ensure_positive;
use log::{debug, info};
use std::sync::Arc;

// ============================================================================
// HIGH-LEVEL INTERFACE
// ============================================================================

/// Configuration for the slab generation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SlabConfig {
    pub miller_index: [i32; 3],
    /// Minimum slab thickness along the normal (Å).
    pub min_slab_size: f64,
    /// Minimum vacuum thickness along the normal (Å).
    pub min_vacuum_size: f64,
    /// Cut distance for layer clustering, in fractional units of the slab cell height.
    pub thresh: f64,
    pub criterion: Criterion,
    pub linkage: Linkage,
    /// Reduce the slab lattice to a more compact equivalent cell.
    pub lll_reduce: bool,
    /// Centre every slab so the vacuum is split evenly around it.
    pub standardize: bool,
    /// Origin shift along the normal (Å).
    pub shift: f64,
}

impl Default for SlabConfig {
    fn default() -> Self {
        Self {
            miller_index: [0, 0, 1],
            min_slab_size: 10.0,
            min_vacuum_size: 10.0,
            thresh: 1e-4,
            criterion: Criterion::Distance,
            linkage: Linkage::Single,
            lll_reduce: true,
            standardize: true,
            shift: 0.0,
        }
    }
}

impl SlabConfig {
    pub fn new(miller_index: [i32; 3], min_slab_size: f64, min_vacuum_size: f64) -> Self {
        Self { miller_index, min_slab_size, min_vacuum_size, ..Self::default() }
    }

    pub fn with_thresh(mut self, thresh: f64) -> Self {
        self.thresh = thresh;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    pub fn with_lll_reduce(mut self, lll_reduce: bool) -> Self {
        self.lll_reduce = lll_reduce;
        self
    }

    pub fn with_standardize(mut self, standardize: bool) -> Self {
        self.standardize = standardize;
        self
    }

    pub fn with_shift(mut self, shift: f64) -> Self {
        self.shift = shift;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.miller_index == [0, 0, 0] {
            return Err(SurfaceError::InvalidPlane {
                miller: self.miller_index,
                reason: "Miller indices cannot be (0,0,0)".into(),
            });
        }
        ensure_positive("min_slab_size", self.min_slab_size)?;
        ensure_positive("min_vacuum_size", self.min_vacuum_size)?;
        ensure_positive("thresh", self.thresh)?;
        if !self.shift.is_finite() {
            return Err(SurfaceError::InvalidParameter { name: "shift", value: self.shift });
        }
        Ok(())
    }
}

/// Generates one slab per distinct termination of `structure` along `config.miller_index`.
pub fn generate_slabs(structure: &Crystal, config: &SlabConfig) -> Result<SlabSet> {
    generate_slabs_with(structure, config, HierarchicalClustering::new(config.linkage))
}

/// Same as [`generate_slabs`] with a caller-supplied clustering backend.
pub fn generate_slabs_with<C: LayerClustering>(
    structure: &Crystal,
    config: &SlabConfig,
    backend: C,
) -> Result<SlabSet> {
    config.validate()?;
    if structure.is_empty() {
        return Err(SurfaceError::InvalidParameter { name: "structure site count", value: 0.0 });
    }

    // 1. PLANE PHASE
    let plane = MillerPlaneResolver::resolve(&structure.lattice, config.miller_index)?;

    // 2. SUPERCELL PHASE
    let region = SupercellBuilder::new(config.min_slab_size, config.min_vacuum_size)
        .with_shift(config.shift)
        .with_lll_reduce(config.lll_reduce)
        .build(structure, &plane)?;

    // 3. LAYER PHASE
    let mut layers = LayerClusterer::with_backend(backend, config.thresh, config.criterion).analyze(
        &region.structure,
        &plane.normal,
        config.shift,
        structure.len(),
    )?;
    let period_sites = region.sites_per_period();
    debug!("{} sites per period, {} scanned", period_sites, layers.scan_limit);
    layers.check_scan_coverage(period_sites);

    // 4. ASSEMBLY PHASE
    let metadata = Arc::new(SlabMetadata {
        parent: structure.clone(),
        miller_index: plane.miller_index,
        normal: plane.normal,
        scale_factor: region.scale_factor,
        min_slab_size: config.min_slab_size,
        min_vacuum_size: config.min_vacuum_size,
        n_layers_slab: region.n_layers_slab,
        n_layers_vacuum: region.n_layers_vacuum,
        interlayer_spacing: plane.interlayer_spacing,
        thresh: config.thresh,
        criterion: config.criterion,
        linkage: config.linkage,
        shift: config.shift,
    });
    let vacuum_thickness = metadata.vacuum_thickness();
    let variants = SlabAssembler::new(vacuum_thickness, config.standardize).assemble(&layers, &metadata);

    info!(
        "generated {} terminations for {:?} ({} sites each)",
        variants.len(),
        plane.miller_index,
        region.structure.len()
    );

    Ok(SlabSet::new(metadata, region.structure, variants, layers.warning))
}
