use crate::analysis::clustering::{Criterion, Linkage};
use crate::analysis::layers::{ClusteringWarning, TerminationBoundary};
use crate::core::structure::{wrap_fractional, CifRepresentable, Crystal, Lattice, Site};
use nalgebra::{Matrix3, Vector3};
use std::fmt::Write as _;
use std::sync::Arc;

/// Quantities shared by every termination of one generation call.
#[derive(Debug, Clone)]
pub struct SlabMetadata {
    pub parent: Crystal,
    pub miller_index: [i32; 3],
    pub normal: Vector3<f64>,
    /// Rows map the parent lattice onto the slab lattice.
    pub scale_factor: Matrix3<i32>,
    pub min_slab_size: f64,
    pub min_vacuum_size: f64,
    pub n_layers_slab: usize,
    pub n_layers_vacuum: usize,
    pub interlayer_spacing: f64,
    pub thresh: f64,
    pub criterion: Criterion,
    pub linkage: Linkage,
    pub shift: f64,
}

impl SlabMetadata {
    /// Thickness of the vacuum inserted at each cut.
    pub fn vacuum_thickness(&self) -> f64 {
        self.n_layers_vacuum as f64 * self.interlayer_spacing
    }
}

/// One termination: an independent slab structure cut at `boundary`.
#[derive(Debug, Clone)]
pub struct SlabVariant {
    pub structure: Crystal,
    pub boundary: TerminationBoundary,
    /// Sites between the previous boundary (exclusive) and this one (inclusive), before the
    /// vacuum was opened.
    pub surface_sites: Vec<Site>,
    metadata: Arc<SlabMetadata>,
}

impl CifRepresentable for SlabVariant {
    fn lattice(&self) -> &Lattice { &self.structure.lattice }
    fn sites(&self) -> &[Site] { &self.structure.sites }
}

impl SlabVariant {
    pub(crate) fn new(
        structure: Crystal,
        boundary: TerminationBoundary,
        surface_sites: Vec<Site>,
        metadata: Arc<SlabMetadata>,
    ) -> Self {
        Self { structure, boundary, surface_sites, metadata }
    }

    pub fn metadata(&self) -> &SlabMetadata { &self.metadata }
    pub fn parent(&self) -> &Crystal { &self.metadata.parent }
    pub fn miller_index(&self) -> [i32; 3] { self.metadata.miller_index }
    pub fn normal(&self) -> &Vector3<f64> { &self.metadata.normal }
    pub fn scale_factor(&self) -> &Matrix3<i32> { &self.metadata.scale_factor }

    pub fn atom_count(&self) -> usize { self.structure.len() }
    pub fn surface_area(&self) -> f64 { self.structure.lattice.ab_area() }

    /// Occupied extent along the normal.
    pub fn slab_thickness(&self) -> f64 {
        self.height() - self.vacuum_thickness()
    }

    /// Widest empty extent along the normal, across the periodic boundary if needed.
    pub fn vacuum_thickness(&self) -> f64 {
        let mut z: Vec<f64> = self
            .structure
            .sites
            .iter()
            .map(|s| wrap_fractional(s.frac_coords.z))
            .collect();
        if z.is_empty() {
            return self.height();
        }
        z.sort_by(f64::total_cmp);
        let wrap_gap = z[0] + 1.0 - z[z.len() - 1];
        let widest = z.windows(2).map(|w| w[1] - w[0]).fold(wrap_gap, f64::max);
        widest * self.height()
    }

    fn height(&self) -> f64 {
        self.structure.lattice.height_along(&self.metadata.normal)
    }
}

/// Every termination generated for one plane, in boundary order.
#[derive(Debug, Clone)]
pub struct SlabSet {
    metadata: Arc<SlabMetadata>,
    base: Crystal,
    variants: Vec<SlabVariant>,
    warning: Option<ClusteringWarning>,
}

impl SlabSet {
    pub(crate) fn new(
        metadata: Arc<SlabMetadata>,
        base: Crystal,
        variants: Vec<SlabVariant>,
        warning: Option<ClusteringWarning>,
    ) -> Self {
        Self { metadata, base, variants, warning }
    }

    pub fn metadata(&self) -> &SlabMetadata { &self.metadata }
    pub fn parent(&self) -> &Crystal { &self.metadata.parent }
    pub fn miller_index(&self) -> [i32; 3] { self.metadata.miller_index }
    pub fn normal(&self) -> &Vector3<f64> { &self.metadata.normal }
    pub fn scale_factor(&self) -> &Matrix3<i32> { &self.metadata.scale_factor }

    /// The slab region before any vacuum gap was opened.
    pub fn base(&self) -> &Crystal { &self.base }

    pub fn variants(&self) -> &[SlabVariant] { &self.variants }
    pub fn len(&self) -> usize { self.variants.len() }
    pub fn is_empty(&self) -> bool { self.variants.is_empty() }
    pub fn get(&self, index: usize) -> Option<&SlabVariant> { self.variants.get(index) }
    pub fn iter(&self) -> std::slice::Iter<'_, SlabVariant> { self.variants.iter() }

    pub fn boundaries(&self) -> Vec<TerminationBoundary> {
        self.variants.iter().map(|v| v.boundary).collect()
    }

    /// Exposed-surface sites, one list per termination.
    pub fn surface_sites(&self) -> Vec<&[Site]> {
        self.variants.iter().map(|v| v.surface_sites.as_slice()).collect()
    }

    pub fn surface_area(&self) -> f64 { self.base.lattice.ab_area() }

    /// Set when the threshold failed to resolve any layering.
    pub fn warning(&self) -> Option<ClusteringWarning> { self.warning }

    pub fn report(&self) -> String {
        let m = &*self.metadata;
        let [h, k, l] = m.miller_index;
        let mut out = String::from("--- Surface Generation Report ---\n");
        let _ = writeln!(out, "• Plane:                ({h} {k} {l})");
        let _ = writeln!(out, "• Interplanar Spacing:  {:.4} Å", m.interlayer_spacing);
        let _ = writeln!(
            out,
            "• Quantization:        Requested {:.2} Å → {} Full Layers ({:.4} Å)",
            m.min_slab_size,
            m.n_layers_slab,
            m.n_layers_slab as f64 * m.interlayer_spacing
        );
        let _ = writeln!(
            out,
            "• Vacuum:              Requested {:.2} Å → {} Layers ({:.4} Å)",
            m.min_vacuum_size,
            m.n_layers_vacuum,
            m.vacuum_thickness()
        );
        let _ = writeln!(out, "• Cut Offset:          {:.4} Å", m.shift);
        let _ = writeln!(
            out,
            "• Clustering:          thresh {} ({} criterion, {} linkage)",
            m.thresh, m.criterion, m.linkage
        );
        let _ = writeln!(out, "• Surface Area:        {:.4} Å²", self.surface_area());
        let _ = writeln!(out, "• Sites per Slab:      {}", self.base.len());
        let _ = write!(out, "• Terminations:        {}", self.variants.len());
        if let Some(w) = self.warning {
            let _ = write!(out, "\n• Warning:             {w}");
        }
        out
    }
}

impl<'a> IntoIterator for &'a SlabSet {
    type Item = &'a SlabVariant;
    type IntoIter = std::slice::Iter<'a, SlabVariant>;

    fn into_iter(self) -> Self::IntoIter {
        self.variants.iter()
    }
}
