use crate::core::error::{Result, SurfaceError};
use petgraph::unionfind::UnionFind;
use std::fmt;
use std::str::FromStr;

/// How the distance between two clusters is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Linkage {
    /// Closest members.
    #[default]
    Single,
    /// Farthest members.
    Complete,
    /// Mean pairwise distance.
    Average,
}

/// When agglomeration stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Criterion {
    /// Merge while the linkage distance is at most the threshold.
    #[default]
    Distance,
    /// Merge until at most `round(threshold)` clusters remain.
    MaxClust,
}

impl FromStr for Linkage {
    type Err = SurfaceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "complete" => Ok(Self::Complete),
            "average" => Ok(Self::Average),
            _ => Err(SurfaceError::UnknownOption { kind: "linkage", name: s.to_string() }),
        }
    }
}

impl FromStr for Criterion {
    type Err = SurfaceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "distance" => Ok(Self::Distance),
            "maxclust" => Ok(Self::MaxClust),
            _ => Err(SurfaceError::UnknownOption { kind: "criterion", name: s.to_string() }),
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Single => "single",
            Self::Complete => "complete",
            Self::Average => "average",
        })
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Distance => "distance",
            Self::MaxClust => "maxclust",
        })
    }
}

/// A 1-D clustering backend.
///
/// Implementations return one label per input value, in input order. Labels only need to
/// be equal for values in the same cluster; their numeric values carry no other meaning.
pub trait LayerClustering {
    fn cluster(&self, values: &[f64], threshold: f64, criterion: Criterion) -> Result<Vec<usize>>;
}

/// Agglomerative clustering of scalars.
///
/// On a line the closest pair of clusters is always a pair of neighbours for single,
/// complete and average linkage, so clusters stay contiguous intervals of the sorted values
/// and only adjacent intervals are ever compared.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchicalClustering {
    pub linkage: Linkage,
}

impl HierarchicalClustering {
    pub fn new(linkage: Linkage) -> Self {
        Self { linkage }
    }

    /// Single linkage with a distance cut: neighbours closer than the threshold are joined.
    fn single_linkage_cut(sorted: &[f64], threshold: f64) -> Vec<usize> {
        let mut sets = UnionFind::<usize>::new(sorted.len());
        for k in 1..sorted.len() {
            if sorted[k] - sorted[k - 1] <= threshold {
                sets.union(k - 1, k);
            }
        }
        let mut labels = Vec::with_capacity(sorted.len());
        let mut current = 0;
        for k in 0..sorted.len() {
            if k > 0 && sets.find(k) != sets.find(k - 1) {
                current += 1;
            }
            labels.push(current);
        }
        labels
    }

    fn linkage_distance(&self, sorted: &[f64], prefix: &[f64], a: (usize, usize), b: (usize, usize)) -> f64 {
        match self.linkage {
            Linkage::Single => sorted[b.0] - sorted[a.1],
            Linkage::Complete => sorted[b.1] - sorted[a.0],
            Linkage::Average => {
                // Every member of `b` lies above every member of `a`, so the mean pairwise
                // distance is the difference of the means.
                let mean = |(lo, hi): (usize, usize)| (prefix[hi + 1] - prefix[lo]) / (hi + 1 - lo) as f64;
                mean(b) - mean(a)
            }
        }
    }

    fn agglomerate(&self, sorted: &[f64], threshold: f64, criterion: Criterion) -> Vec<usize> {
        let mut prefix = Vec::with_capacity(sorted.len() + 1);
        prefix.push(0.0);
        for &v in sorted {
            prefix.push(prefix[prefix.len() - 1] + v);
        }

        let max_clusters = threshold.round().max(1.0) as usize;
        let mut intervals: Vec<(usize, usize)> = (0..sorted.len()).map(|k| (k, k)).collect();

        while intervals.len() > 1 {
            let (best, distance) = intervals
                .windows(2)
                .enumerate()
                .map(|(i, w)| (i, self.linkage_distance(sorted, &prefix, w[0], w[1])))
                .min_by(|x, y| x.1.total_cmp(&y.1))
                .unwrap_or((0, f64::INFINITY));

            let stop = match criterion {
                Criterion::Distance => distance > threshold,
                Criterion::MaxClust => intervals.len() <= max_clusters,
            };
            if stop {
                break;
            }
            intervals[best].1 = intervals[best + 1].1;
            intervals.remove(best + 1);
        }

        let mut labels = vec![0; sorted.len()];
        for (label, &(lo, hi)) in intervals.iter().enumerate() {
            labels[lo..=hi].iter_mut().for_each(|l| *l = label);
        }
        labels
    }
}

impl LayerClustering for HierarchicalClustering {
    fn cluster(&self, values: &[f64], threshold: f64, criterion: Criterion) -> Result<Vec<usize>> {
        if let Some(&bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(SurfaceError::InvalidParameter { name: "clustering value", value: bad });
        }
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(SurfaceError::InvalidParameter { name: "thresh", value: threshold });
        }

        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));
        let sorted: Vec<f64> = order.iter().map(|&i| values[i]).collect();

        let sorted_labels = match (self.linkage, criterion) {
            (Linkage::Single, Criterion::Distance) => Self::single_linkage_cut(&sorted, threshold),
            _ => self.agglomerate(&sorted, threshold, criterion),
        };

        let mut labels = vec![0; values.len()];
        for (rank, &i) in order.iter().enumerate() {
            labels[i] = sorted_labels[rank];
        }
        Ok(labels)
    }
}
