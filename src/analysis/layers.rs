use crate::analysis::clustering::{Criterion, HierarchicalClustering, LayerClustering};
use crate::core::error::Result;
use crate::core::structure::Crystal;
use log::{debug, warn};
use nalgebra::Vector3;
use std::fmt;

/// Advisory raised when the threshold does not resolve any layering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusteringWarning {
    /// Every site fell into one cluster.
    SingleLayer { sites: usize },
    /// Every site formed its own cluster.
    NoLayering { sites: usize },
    /// One period of the slab holds more sites than were scanned for boundaries, so
    /// terminations beyond the scanned sites are missed.
    PartialScan { scanned: usize, period_sites: usize },
}

impl fmt::Display for ClusteringWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleLayer { sites } => write!(
                f,
                "all {sites} sites were merged into a single layer; consider a smaller thresh"
            ),
            Self::NoLayering { sites } => write!(
                f,
                "each of the {sites} sites forms its own layer; consider a larger thresh"
            ),
            Self::PartialScan { scanned, period_sites } => write!(
                f,
                "boundaries were searched among {scanned} sites but one period holds {period_sites}; \
                 some terminations may be missing"
            ),
        }
    }
}

/// A cut point: the last site (in sorted order) below a vacuum gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminationBoundary {
    /// Index into the c-sorted site sequence.
    pub index: usize,
    /// Height of that site along the normal, measured from the shifted origin.
    pub position: f64,
}

/// Result of layer detection on a slab region.
#[derive(Debug, Clone)]
pub struct LayerAnalysis {
    /// The slab with the origin shift undone and sites sorted along the normal.
    pub sorted: Crystal,
    /// Cluster label of every site in `sorted`.
    pub labels: Vec<usize>,
    pub boundaries: Vec<TerminationBoundary>,
    /// Number of leading sorted sites scanned for boundaries.
    pub scan_limit: usize,
    /// Height of the cell along the normal.
    pub height: f64,
    pub warning: Option<ClusteringWarning>,
}

impl LayerAnalysis {
    /// Flags a scan that stops short of one full period of the slab.
    ///
    /// `period_sites` is the number of slab sites per interlayer period. It exceeds the scan
    /// limit when the in-plane cell is a multiple of the bulk one.
    pub fn check_scan_coverage(&mut self, period_sites: usize) {
        if self.warning.is_some() || period_sites <= self.scan_limit {
            return;
        }
        let w = ClusteringWarning::PartialScan {
            scanned: self.scan_limit,
            period_sites,
        };
        warn!("{w}");
        self.warning = Some(w);
    }
}

pub struct LayerClusterer<C = HierarchicalClustering> {
    backend: C,
    thresh: f64,
    criterion: Criterion,
}

impl LayerClusterer<HierarchicalClustering> {
    pub fn new(thresh: f64, criterion: Criterion) -> Self {
        Self::with_backend(HierarchicalClustering::default(), thresh, criterion)
    }
}

impl<C: LayerClustering> LayerClusterer<C> {
    pub fn with_backend(backend: C, thresh: f64, criterion: Criterion) -> Self {
        Self { backend, thresh, criterion }
    }

    /// Groups the sites of `slab` into layers and finds the termination boundaries.
    ///
    /// Only the first `scan_limit` sorted sites (one bulk cell's worth) are scanned, which
    /// assumes one period of the bulk sorts ahead of its repeats along the normal.
    pub fn analyze(
        &self,
        slab: &Crystal,
        normal: &Vector3<f64>,
        shift: f64,
        scan_limit: usize,
    ) -> Result<LayerAnalysis> {
        let height = slab.lattice.height_along(normal);
        let unshifted = slab.translated(&Vector3::new(0.0, 0.0, -shift / height), true);

        let heights: Vec<f64> = unshifted.sites.iter().map(|s| s.frac_coords.z).collect();
        let raw_labels = self.backend.cluster(&heights, self.thresh, self.criterion)?;

        // Stable: sites at equal height keep their replication order.
        let mut order: Vec<usize> = (0..heights.len()).collect();
        order.sort_by(|&i, &j| heights[i].total_cmp(&heights[j]));
        let sorted = unshifted.reordered(&order);
        let labels: Vec<usize> = order.iter().map(|&i| raw_labels[i]).collect();

        let scanned = labels.len().min(scan_limit);
        let last = scanned.saturating_sub(1);
        let boundaries: Vec<TerminationBoundary> = (0..scanned)
            .filter(|&i| i == last || labels[i] != labels[i + 1])
            .map(|i| TerminationBoundary {
                index: i,
                position: sorted.sites[i].frac_coords.z * height,
            })
            .collect();
        debug!(
            "{} sites, {} boundaries at {:?}",
            sorted.len(),
            boundaries.len(),
            boundaries.iter().map(|b| b.index).collect::<Vec<_>>()
        );

        let warning = Self::check_degenerate(&labels);
        if let Some(w) = &warning {
            warn!("degenerate clustering: {w}");
        }

        Ok(LayerAnalysis {
            sorted,
            labels,
            boundaries,
            scan_limit,
            height,
            warning,
        })
    }

    fn check_degenerate(labels: &[usize]) -> Option<ClusteringWarning> {
        if labels.len() < 2 {
            return None;
        }
        let mut unique = labels.to_vec();
        unique.sort_unstable();
        unique.dedup();
        match unique.len() {
            1 => Some(ClusteringWarning::SingleLayer { sites: labels.len() }),
            n if n == labels.len() => Some(ClusteringWarning::NoLayering { sites: labels.len() }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::structure::Lattice;

    /// Two-species stack along z with layers at 0.0, 0.1 (two sites), 0.3 (two sites) and 0.4.
    fn stack() -> Crystal {
        Crystal::from_species(
            Lattice::orthorhombic(3.0, 3.0, 20.0).unwrap(),
            &["A", "B", "B", "A", "A", "B"],
            &[
                [0.0, 0.0, 0.3],
                [0.5, 0.5, 0.1],
                [0.0, 0.0, 0.1],
                [0.5, 0.5, 0.0],
                [0.0, 0.0, 0.4],
                [0.5, 0.5, 0.3],
            ],
        )
        .unwrap()
    }

    #[test]
    fn boundaries_close_each_layer() {
        let z = Vector3::z();
        let analysis = LayerClusterer::new(1e-4, Criterion::Distance).analyze(&stack(), &z, 0.0, 5).unwrap();

        let heights: Vec<f64> = analysis.sorted.sites.iter().map(|s| s.frac_coords.z).collect();
        assert!(heights.windows(2).all(|w| w[0] <= w[1]));
        // stable order inside the 0.1 layer
        assert_eq!(analysis.sorted.sites[1].frac_coords.x, 0.5);

        let indices: Vec<usize> = analysis.boundaries.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![0, 2, 4]);
        assert!((analysis.boundaries[1].position - 2.0).abs() < 1e-9);
        assert_eq!(analysis.warning, None);
    }

    #[test]
    fn shift_is_undone_before_sorting() {
        let z = Vector3::z();
        let analysis = LayerClusterer::new(1e-4, Criterion::Distance).analyze(&stack(), &z, 2.0, 6).unwrap();
        assert!(analysis.sorted.sites[0].frac_coords.z.abs() < 1e-9);
        assert_eq!(analysis.sorted.sites[0].species, "B");
        // the layer that sat at the origin wraps to the top
        assert!((analysis.sorted.sites[5].frac_coords.z - 0.9).abs() < 1e-9);
    }

    #[test]
    fn last_scanned_site_closes_a_boundary() {
        let z = Vector3::z();
        // The fourth sorted site shares its layer with the fifth, which is not scanned.
        let analysis = LayerClusterer::new(1e-4, Criterion::Distance).analyze(&stack(), &z, 0.0, 4).unwrap();
        let indices: Vec<usize> = analysis.boundaries.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![0, 2, 3]);

        let short = LayerClusterer::new(1e-4, Criterion::Distance).analyze(&stack(), &z, 0.0, 2).unwrap();
        let indices: Vec<usize> = short.boundaries.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn short_scan_is_reported() {
        let z = Vector3::z();
        let clusterer = LayerClusterer::new(1e-4, Criterion::Distance);

        let mut analysis = clusterer.analyze(&stack(), &z, 0.0, 2).unwrap();
        analysis.check_scan_coverage(6);
        assert_eq!(analysis.warning, Some(ClusteringWarning::PartialScan { scanned: 2, period_sites: 6 }));

        let mut full = clusterer.analyze(&stack(), &z, 0.0, 6).unwrap();
        full.check_scan_coverage(6);
        assert_eq!(full.warning, None);
    }

    #[test]
    fn degenerate_thresholds_are_reported() {
        let z = Vector3::z();
        let merged = LayerClusterer::new(1.0, Criterion::Distance).analyze(&stack(), &z, 0.0, 6).unwrap();
        assert_eq!(merged.warning, Some(ClusteringWarning::SingleLayer { sites: 6 }));
        assert_eq!(merged.boundaries.len(), 1);

        let split = LayerClusterer::new(3.0, Criterion::MaxClust).analyze(&stack(), &z, 0.0, 6).unwrap();
        assert_eq!(split.warning, None);
    }
}
