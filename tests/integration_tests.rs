use nalgebra::Vector3;
use slab_terminations::math::integer_basis;
use slab_terminations::{
    generate_slabs, generate_slabs_with, parser, AdsorptionPlacer, AdsorptionRequest, ClusteringWarning, Criterion,
    Crystal, Lattice, LayerClustering, SiteCoordinates, SlabConfig, SurfaceError,
};

fn cu() -> Crystal {
    Crystal::from_species(
        Lattice::cubic(3.0).unwrap(),
        &["Cu", "Cu", "Cu", "Cu"],
        &[[0.0, 0.0, 0.0], [0.5, 0.5, 0.0], [0.5, 0.0, 0.5], [0.0, 0.5, 0.5]],
    )
    .unwrap()
}

fn zno() -> Crystal {
    Crystal::from_species(
        Lattice::from_parameters(3.253, 3.253, 5.213, 90.0, 90.0, 120.0).unwrap(),
        &["Zn", "Zn", "O", "O"],
        &[[0.6667, 0.3334, 0.5], [0.3333, 0.6666, 0.0], [0.6667, 0.3334, 0.882], [0.3333, 0.6666, 0.382]],
    )
    .unwrap()
}

fn lifepo4() -> Crystal {
    let mut species = vec!["Li"; 4];
    species.extend(["Fe"; 4]);
    species.extend(["P"; 4]);
    species.extend(["O"; 16]);
    Crystal::from_species(
        Lattice::orthorhombic(10.332, 6.01, 4.787).unwrap(),
        &species,
        &[
            [0.5, 0.0, 0.5],
            [0.0, 0.5, 0.0],
            [0.5, 0.5, 0.5],
            [0.0, 0.0, 0.0],
            [0.78221, 0.25, 0.52527],
            [0.28221, 0.25, 0.97473],
            [0.21779, 0.75, 0.47473],
            [0.71779, 0.75, 0.02527],
            [0.59485, 0.25, 0.08079],
            [0.09485, 0.25, 0.41921],
            [0.40515, 0.75, 0.91921],
            [0.90515, 0.75, 0.58079],
            [0.5968, 0.25, 0.757],
            [0.0968, 0.25, 0.743],
            [0.4032, 0.75, 0.243],
            [0.9032, 0.75, 0.257],
            [0.9567, 0.25, 0.294],
            [0.4567, 0.25, 0.206],
            [0.0433, 0.75, 0.706],
            [0.5433, 0.75, 0.794],
            [0.66567, 0.0466, 0.2153],
            [0.16567, 0.4534, 0.2847],
            [0.33433, 0.5466, 0.7847],
            [0.83433, 0.9534, 0.7153],
            [0.33433, 0.9534, 0.7847],
            [0.83433, 0.5466, 0.7153],
            [0.66567, 0.4534, 0.2153],
            [0.16567, 0.0466, 0.2847],
        ],
    )
    .unwrap()
}

#[test]
fn test_cu_011_slab() {
    let slabs = generate_slabs(&cu(), &SlabConfig::new([0, 1, 1], 6.0, 10.0)).expect("slab generation failed");

    assert!(!slabs.is_empty());
    assert!((slabs.surface_area() - 12.727922061357855).abs() < 1e-9);
    for variant in &slabs {
        // Three (011) layers of two atoms each. Counting 13 would mean one site on the upper
        // slicing edge was kept by rounding noise, which the shared EPS window excludes.
        assert_eq!(variant.atom_count(), 12);
        assert!((variant.surface_area() - 12.727922061357855).abs() < 1e-9);
    }
    println!("{}", slabs.report());
}

#[test]
fn test_scale_factor_rebuilds_slab_lattice_for_all_planes() {
    let bulk = cu();
    for h in 0..4 {
        for k in 0..4 {
            for l in 0..4 {
                if (h, k, l) == (0, 0, 0) {
                    continue;
                }
                let slabs = generate_slabs(&bulk, &SlabConfig::new([h, k, l], 6.0, 10.0))
                    .unwrap_or_else(|e| panic!("({h} {k} {l}) failed: {e}"));

                assert!(integer_basis::determinant(slabs.scale_factor()) > 0, "({h} {k} {l})");

                let manual = bulk.make_supercell(slabs.scale_factor()).unwrap();
                let (expected, actual) = (manual.lattice.abc(), slabs.base().lattice.abc());
                let (expected_angles, actual_angles) = (manual.lattice.angles(), slabs.base().lattice.angles());
                for i in 0..3 {
                    assert!((expected[i] - actual[i]).abs() < 1e-6, "({h} {k} {l}) lengths");
                    assert!((expected_angles[i] - actual_angles[i]).abs() < 1e-6, "({h} {k} {l}) angles");
                }

                let normal = slabs.normal();
                for i in 0..2 {
                    let v = slabs.base().lattice.vector(i);
                    assert!(v.dot(normal).abs() < 1e-8 * v.norm().max(1.0), "({h} {k} {l}) in-plane");
                }

                assert!(!slabs.is_empty(), "({h} {k} {l}) produced no terminations");
                assert!(slabs.boundaries().iter().all(|b| b.index < bulk.len()), "({h} {k} {l}) boundaries");
                let count = slabs.base().len();
                assert!(slabs.iter().all(|v| v.atom_count() == count), "({h} {k} {l}) site counts");
            }
        }
    }
}

#[test]
fn test_adsorb_on_cu_001() {
    let slabs = generate_slabs(&cu(), &SlabConfig::new([0, 0, 1], 5.0, 5.0)).unwrap();
    let slab = &slabs.variants()[0].structure;
    assert_eq!(slab.len(), 8);

    let requests = [
        AdsorptionRequest::new(SiteCoordinates::Fractional(Vector3::new(0.5, 0.5, 0.25)), "O", 2.0),
        AdsorptionRequest::new(SiteCoordinates::Cartesian(Vector3::new(1.5, 1.5, 3.0)), "O", 2.0),
    ];
    for request in &requests {
        let adsorbed = AdsorptionPlacer::adsorb(slab, request).unwrap();
        assert_eq!(adsorbed.len(), 9);
        assert_eq!(slab.len(), 8);
        assert_eq!(adsorbed.lattice.abc(), slab.lattice.abc());

        let oxygen = adsorbed.sites.iter().find(|s| s.species == "O").unwrap();
        assert!((oxygen.frac_coords.x - 0.5).abs() < 1e-7);
        assert!((oxygen.frac_coords.y - 0.5).abs() < 1e-7);
        assert!((oxygen.frac_coords.z - 0.4166667).abs() < 1e-7);
    }
}

#[test]
fn test_zno_termination_counts() {
    let z001 = generate_slabs(&zno(), &SlabConfig::new([0, 0, 1], 10.0, 3.0).with_thresh(0.025).with_shift(2.0))
        .unwrap();
    assert_eq!(z001.len(), 4);

    let z100 = generate_slabs(&zno(), &SlabConfig::new([1, 0, 0], 10.0, 5.0).with_thresh(0.01)).unwrap();
    assert_eq!(z100.len(), 2);
}

#[test]
fn test_lifepo4_termination_counts() {
    let l001 = generate_slabs(&lifepo4(), &SlabConfig::new([0, 0, 1], 10.0, 10.0).with_thresh(0.0031)).unwrap();
    assert_eq!(l001.len(), 16);

    let l100 = generate_slabs(&lifepo4(), &SlabConfig::new([1, 0, 0], 30.0, 10.0).with_thresh(0.0031)).unwrap();
    assert_eq!(l100.len(), 18);

    // Requested sizes are honoured to within one interplanar spacing.
    let dist = l100.metadata().interlayer_spacing;
    let first = &l100.variants()[0];
    assert!(first.slab_thickness() >= 30.0 - dist);
    assert!(first.slab_thickness() < 30.0 + dist);
    assert!(first.vacuum_thickness() >= 10.0 - dist);
    assert!(first.vacuum_thickness() < 10.0 + 2.0 * dist);
}

#[test]
fn test_surface_sites_precede_each_boundary() {
    let slabs = generate_slabs(&zno(), &SlabConfig::new([0, 0, 1], 10.0, 3.0).with_thresh(0.025)).unwrap();
    let boundaries = slabs.boundaries();
    let surfaces = slabs.surface_sites();

    assert_eq!(boundaries[0].index + 1, surfaces[0].len());
    for i in 1..boundaries.len() {
        assert_eq!(boundaries[i].index - boundaries[i - 1].index, surfaces[i].len());
    }
    let total: usize = surfaces.iter().map(|s| s.len()).sum();
    assert_eq!(total, boundaries.last().unwrap().index + 1);
}

#[test]
fn test_shift_by_one_period_keeps_terminations() {
    let plain = generate_slabs(&cu(), &SlabConfig::new([0, 0, 1], 5.0, 5.0)).unwrap();
    let shifted = generate_slabs(&cu(), &SlabConfig::new([0, 0, 1], 5.0, 5.0).with_shift(3.0)).unwrap();

    assert_eq!(plain.len(), shifted.len());
    for (a, b) in plain.boundaries().iter().zip(shifted.boundaries()) {
        assert_eq!(a.index, b.index);
        assert!((a.position - b.position).abs() < 1e-9);
    }
}

#[test]
fn test_shift_moves_boundaries_by_the_same_amount() {
    let config = SlabConfig::new([0, 0, 1], 10.0, 3.0).with_thresh(0.025);
    let plain = generate_slabs(&zno(), &config).unwrap();
    let delta = 0.5;
    let shifted = generate_slabs(&zno(), &config.clone().with_shift(delta)).unwrap();

    // Positions agree modulo one bulk period along the normal.
    let period = plain.metadata().interlayer_spacing;
    assert_eq!(plain.len(), shifted.len());
    for b in shifted.boundaries() {
        let matched = plain.boundaries().iter().any(|p| {
            let r = (p.position - delta - b.position).rem_euclid(period);
            r < 1e-6 || period - r < 1e-6
        });
        assert!(matched, "no unshifted boundary matches {:.6}", b.position);
    }
}

#[test]
fn test_enlarged_in_plane_cell_still_terminates() {
    let slabs = generate_slabs(&cu(), &SlabConfig::new([1, 1, 3], 6.0, 10.0)).unwrap();
    assert!(!slabs.is_empty());
    assert!(matches!(slabs.warning(), Some(ClusteringWarning::PartialScan { scanned: 4, .. })));
}

#[test]
fn test_site_on_cell_face_matches_site_at_origin() {
    let config = SlabConfig::new([0, 0, 1], 10.0, 3.0).with_thresh(0.025).with_shift(2.0);
    let mut on_face = zno();
    on_face.sites[1].frac_coords.z = 1.0;

    let reference = generate_slabs(&zno(), &config).unwrap();
    let folded = generate_slabs(&on_face, &config).unwrap();
    assert_eq!(folded.len(), 4);
    assert_eq!(folded.base().len(), reference.base().len());
    assert_eq!(folded.boundaries().len(), reference.boundaries().len());
}

/// Labels sites by rounding their height to a fixed grid.
struct GridClustering;

impl LayerClustering for GridClustering {
    fn cluster(&self, values: &[f64], _threshold: f64, _criterion: Criterion) -> slab_terminations::Result<Vec<usize>> {
        Ok(values.iter().map(|z| (z * 1000.0).round() as usize).collect())
    }
}

#[test]
fn test_custom_clustering_backend() {
    let config = SlabConfig::new([0, 0, 1], 5.0, 5.0);
    let custom = generate_slabs_with(&cu(), &config, GridClustering).unwrap();
    let default = generate_slabs(&cu(), &config).unwrap();

    assert_eq!(custom.len(), 2);
    assert_eq!(custom.boundaries(), default.boundaries());
}

#[test]
fn test_parsed_cif_matches_in_memory_structure() {
    let cif = "\
data_ZnO
_cell_length_a    3.253
_cell_length_b    3.253
_cell_length_c    5.213
_cell_angle_alpha 90
_cell_angle_beta  90
_cell_angle_gamma 120
loop_
_atom_site_label
_atom_site_type_symbol
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
Zn1 Zn 0.6667 0.3334 0.5
Zn2 Zn 0.3333 0.6666 0.0
O1 O 0.6667 0.3334 0.882
O2 O 0.3333 0.6666 0.382
";
    let parsed = parser::parse_cif(cif).unwrap();
    let config = SlabConfig::new([0, 0, 1], 10.0, 3.0).with_thresh(0.025).with_shift(2.0);
    assert_eq!(generate_slabs(&parsed, &config).unwrap().len(), 4);
}

#[test]
fn test_invalid_inputs() {
    let err = generate_slabs(&cu(), &SlabConfig::new([0, 0, 0], 6.0, 10.0)).unwrap_err();
    assert!(matches!(err, SurfaceError::InvalidPlane { .. }));

    let err = generate_slabs(&cu(), &SlabConfig::new([1, 1, 1], -1.0, 10.0)).unwrap_err();
    assert!(matches!(err, SurfaceError::InvalidParameter { name: "min_slab_size", .. }));

    let err = "ward".parse::<Criterion>().unwrap_err();
    assert!(matches!(err, SurfaceError::UnknownOption { .. }));
}
