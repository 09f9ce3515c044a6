use crate::core::structure::{Crystal, Lattice, Site};
use anyhow::{anyhow, Context, Result};
use nalgebra::Vector3;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Parses a float value from a CIF string, safely removing uncertainty parentheses.
/// Example: "1.234(5)" -> 1.234
fn parse_cif_float(s: &str) -> Result<f64> {
    let clean_s = s.split('(').next().unwrap_or(s);
    clean_s.parse::<f64>().with_context(|| format!("Failed to parse '{}' as float", s))
}

/// Element symbol from a site label such as "Fe2" or "O1a".
fn species_from_label(label: &str) -> String {
    label.chars().take_while(|c| c.is_ascii_alphabetic()).collect()
}

/// Parses a CIF file into a Crystal structure.
pub fn from_cif(path: &Path) -> Result<Crystal> {
    let contents = fs::read_to_string(path).with_context(|| format!("Could not read CIF file: {:?}", path))?;
    parse_cif(&contents).with_context(|| format!("Invalid CIF file: {:?}", path))
}

/// Parses CIF text. Symmetry operations are ignored, so the input must list every site (P1).
pub fn parse_cif(contents: &str) -> Result<Crystal> {
    let lines: Vec<&str> = contents.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with('#')).collect();

    let mut lattice_params: HashMap<&str, f64> = HashMap::new();
    let mut sites = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if line.starts_with("_cell_") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 {
                if let Ok(value) = parse_cif_float(parts[1]) {
                    lattice_params.insert(parts[0], value);
                }
            }
        } else if line.starts_with("loop_") {
            i += 1;

            let mut headers = Vec::new();
            while i < lines.len() && lines[i].starts_with('_') {
                headers.push(lines[i]);
                i += 1;
            }

            if headers.contains(&"_atom_site_fract_x") {
                let column = |name: &str| headers.iter().position(|&h| h == name);
                let symbol_idx = column("_atom_site_type_symbol");
                let label_idx = column("_atom_site_label");
                let species_idx = symbol_idx
                    .or(label_idx)
                    .context("CIF missing '_atom_site_type_symbol' and '_atom_site_label'")?;
                let x_idx = column("_atom_site_fract_x").context("CIF missing '_atom_site_fract_x'")?;
                let y_idx = column("_atom_site_fract_y").context("CIF missing '_atom_site_fract_y'")?;
                let z_idx = column("_atom_site_fract_z").context("CIF missing '_atom_site_fract_z'")?;

                let max_idx = species_idx.max(x_idx).max(y_idx).max(z_idx);

                while i < lines.len() && !lines[i].starts_with('_') && !lines[i].starts_with("loop_") {
                    let parts: Vec<&str> = lines[i].split_whitespace().collect();
                    if parts.len() > max_idx {
                        let species = if symbol_idx.is_some() {
                            parts[species_idx].to_string()
                        } else {
                            species_from_label(parts[species_idx])
                        };
                        let x = parse_cif_float(parts[x_idx])?;
                        let y = parse_cif_float(parts[y_idx])?;
                        let z = parse_cif_float(parts[z_idx])?;
                        sites.push(Site::new(species, Vector3::new(x, y, z)));
                    }
                    i += 1;
                }
                // Step back one, as the outer loop increments i
                i -= 1;
            } else {
                i -= 1;
            }
        }
        i += 1;
    }

    let get_param = |key: &str| -> Result<f64> {
        lattice_params.get(key).copied().ok_or_else(|| anyhow!("CIF missing tag: {}", key))
    };

    let lattice = Lattice::from_parameters(
        get_param("_cell_length_a")?,
        get_param("_cell_length_b")?,
        get_param("_cell_length_c")?,
        get_param("_cell_angle_alpha")?,
        get_param("_cell_angle_beta")?,
        get_param("_cell_angle_gamma")?,
    )?;

    if sites.is_empty() {
        return Err(anyhow!("No atoms found in CIF file."));
    }

    Ok(Crystal::new(lattice, sites))
}
