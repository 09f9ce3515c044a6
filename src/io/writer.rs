use crate::core::structure::CifRepresentable;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Renders a structure as a P1 CIF block.
pub fn to_cif_string<T: CifRepresentable + ?Sized>(structure: &T, name: &str) -> String {
    let (a, b, c, alpha, beta, gamma) = structure.lattice().to_parameters();
    let mut out = String::new();

    let _ = writeln!(out, "data_{}", name.replace(char::is_whitespace, "_"));
    let _ = writeln!(out, "_symmetry_space_group_name_H-M   'P 1'");
    let _ = writeln!(out, "_cell_length_a    {a:.8}");
    let _ = writeln!(out, "_cell_length_b    {b:.8}");
    let _ = writeln!(out, "_cell_length_c    {c:.8}");
    let _ = writeln!(out, "_cell_angle_alpha {alpha:.8}");
    let _ = writeln!(out, "_cell_angle_beta  {beta:.8}");
    let _ = writeln!(out, "_cell_angle_gamma {gamma:.8}");
    let _ = writeln!(out, "_symmetry_Int_Tables_number 1");
    let _ = writeln!(out, "loop_");
    let _ = writeln!(out, " _symmetry_equiv_pos_as_xyz");
    let _ = writeln!(out, "  'x, y, z'");
    let _ = writeln!(out, "loop_");
    for header in [
        "_atom_site_label",
        "_atom_site_type_symbol",
        "_atom_site_fract_x",
        "_atom_site_fract_y",
        "_atom_site_fract_z",
        "_atom_site_occupancy",
    ] {
        let _ = writeln!(out, " {header}");
    }
    for (i, site) in structure.sites().iter().enumerate() {
        let f = site.frac_coords;
        let _ = writeln!(
            out,
            "  {}{} {} {:.8} {:.8} {:.8} 1",
            site.species,
            i + 1,
            site.species,
            f.x,
            f.y,
            f.z
        );
    }
    out
}

/// Writes a structure to `path` as a P1 CIF.
pub fn to_cif<T: CifRepresentable + ?Sized>(structure: &T, path: &Path) -> Result<()> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "structure".to_string());
    fs::write(path, to_cif_string(structure, &name))
        .with_context(|| format!("Could not write CIF file: {:?}", path))
}
