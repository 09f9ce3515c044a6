use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use nalgebra::Vector3;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use slab_terminations::{
    generate_slabs, parser, writer, AdsorptionPlacer, AdsorptionRequest, Criterion, Linkage, SiteCoordinates,
    SlabConfig,
};

#[derive(Parser)]
#[command(author, version, about = "Surface slab termination generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Writes one slab per surface termination of a bulk CIF.
    Generate {
        /// CIF file, or a glob pattern matching several.
        #[arg(short, long)]
        input: String,

        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        #[arg(allow_hyphen_values = true)]
        h: i32,
        #[arg(allow_hyphen_values = true)]
        k: i32,
        #[arg(allow_hyphen_values = true)]
        l: i32,

        /// Minimum slab thickness (Å).
        #[arg(long, default_value_t = 10.0)]
        slab: f64,

        /// Minimum vacuum thickness (Å).
        #[arg(long, default_value_t = 10.0)]
        vacuum: f64,

        /// Layer clustering threshold (fractional c).
        #[arg(long, default_value_t = 1e-4)]
        thresh: f64,

        /// Clustering criterion: distance or maxclust.
        #[arg(long, default_value = "distance")]
        criterion: String,

        /// Clustering linkage: single, complete or average.
        #[arg(long, default_value = "single")]
        linkage: String,

        /// Keep the unreduced slab lattice.
        #[arg(long)]
        no_lll: bool,

        /// Leave the vacuum where the cut opened it instead of centring the slab.
        #[arg(long)]
        no_standardize: bool,

        /// Origin shift along the normal (Å).
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        shift: f64,
    },

    /// Places one adsorbate atom above a site of a slab CIF.
    Adsorb {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        species: String,

        /// Reference site (fractional unless --cartesian).
        #[arg(long, num_args = 3, allow_hyphen_values = true)]
        site: Vec<f64>,

        /// Adsorbate distance (Å).
        #[arg(long)]
        distance: f64,

        /// Surface direction in the reciprocal basis.
        #[arg(long, num_args = 3, default_values_t = [0.0, 0.0, 1.0], allow_hyphen_values = true)]
        surface: Vec<f64>,

        /// Interpret --site as cartesian coordinates (Å).
        #[arg(long)]
        cartesian: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let start_time = Instant::now();

    match cli.command {
        Commands::Generate {
            input, output_dir, h, k, l,
            slab, vacuum, thresh, criterion, linkage,
            no_lll, no_standardize, shift,
        } => {
            let config = SlabConfig::new([h, k, l], slab, vacuum)
                .with_thresh(thresh)
                .with_criterion(criterion.parse::<Criterion>()?)
                .with_linkage(linkage.parse::<Linkage>()?)
                .with_lll_reduce(!no_lll)
                .with_standardize(!no_standardize)
                .with_shift(shift);
            config.validate()?;

            let inputs = expand_inputs(&input)?;
            fs::create_dir_all(&output_dir)
                .with_context(|| format!("Could not create output directory {:?}", output_dir))?;

            for path in inputs {
                generate_one(&path, &output_dir, &config)?;
            }
        }
        Commands::Adsorb {
            input, output, species, site, distance, surface, cartesian,
        } => {
            let site = Vector3::from_column_slice(&site);
            let request = AdsorptionRequest::new(
                if cartesian { SiteCoordinates::Cartesian(site) } else { SiteCoordinates::Fractional(site) },
                species,
                distance,
            )
            .with_surface(Vector3::from_column_slice(&surface));

            let slab = parser::from_cif(&input)?;
            info!("Loaded {} atoms from {:?}", slab.len(), input);
            let adsorbed = AdsorptionPlacer::adsorb(&slab, &request)?;
            writer::to_cif(&adsorbed, &output)?;
            info!("Wrote {} atoms to {:?}", adsorbed.len(), output);
        }
    }

    info!("Done in {:.2?}", start_time.elapsed());
    Ok(())
}

/// Resolves a path or glob pattern to the list of input files.
fn expand_inputs(pattern: &str) -> Result<Vec<PathBuf>> {
    let direct = PathBuf::from(pattern);
    if direct.is_file() {
        return Ok(vec![direct]);
    }
    let paths: Vec<PathBuf> = glob::glob(pattern)
        .with_context(|| format!("Invalid input pattern {:?}", pattern))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                None
            }
        })
        .collect();
    if paths.is_empty() {
        anyhow::bail!("No input files match {:?}", pattern);
    }
    Ok(paths)
}

fn generate_one(input: &Path, output_dir: &Path, config: &SlabConfig) -> Result<()> {
    let crystal = parser::from_cif(input)?;
    info!("Loaded {} atoms from {:?}", crystal.len(), input);

    let slabs = generate_slabs(&crystal, config)
        .with_context(|| format!("Slab generation failed for {:?}", input))?;
    println!("{}", slabs.report());

    let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "slab".into());
    let [h, k, l] = slabs.miller_index();
    for (i, variant) in slabs.iter().enumerate() {
        let path = output_dir.join(format!("{stem}_{h}{k}{l}_term{i}.cif"));
        writer::to_cif(variant, &path)?;
        info!(
            "termination {}: {} surface sites -> {:?}",
            i,
            variant.surface_sites.len(),
            path
        );
    }
    Ok(())
}
