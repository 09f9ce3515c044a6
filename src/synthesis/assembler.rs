use crate::analysis::layers::{LayerAnalysis, TerminationBoundary};
use crate::core::structure::{Crystal, EPS};
use crate::synthesis::slab::{SlabMetadata, SlabVariant};
use nalgebra::Vector3;
use std::sync::Arc;

/// Opens a vacuum gap at every termination boundary.
pub struct SlabAssembler {
    vacuum_thickness: f64,
    standardize: bool,
}

impl SlabAssembler {
    pub fn new(vacuum_thickness: f64, standardize: bool) -> Self {
        Self { vacuum_thickness, standardize }
    }

    pub fn assemble(&self, layers: &LayerAnalysis, metadata: &Arc<SlabMetadata>) -> Vec<SlabVariant> {
        let mut first_surface_site = 0;
        layers
            .boundaries
            .iter()
            .map(|boundary| {
                let structure = self.terminate(&layers.sorted, boundary, layers.height);
                let surface_sites = layers.sorted.sites[first_surface_site..=boundary.index].to_vec();
                first_surface_site = boundary.index + 1;
                SlabVariant::new(structure, *boundary, surface_sites, Arc::clone(metadata))
            })
            .collect()
    }

    /// Builds one variant from an independent copy of `sorted`.
    fn terminate(&self, sorted: &Crystal, boundary: &TerminationBoundary, height: f64) -> Crystal {
        let vacuum = self.vacuum_thickness / height;
        let cut = sorted.sites[boundary.index].frac_coords.z;

        // 1. Lift everything above the cut by the vacuum thickness.
        let opened = sorted.translated_where(&Vector3::new(0.0, 0.0, vacuum), false, |site| {
            site.frac_coords.z > cut + EPS
        });
        if !self.standardize {
            return opened;
        }

        // 2. Centre: half of the inserted vacuum above the cut layer, half below the bottom one.
        let offset = -(cut + 0.5 * vacuum);
        opened.translated(&Vector3::new(0.0, 0.0, offset), true)
    }
}
