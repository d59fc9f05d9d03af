use std::path::PathBuf;

use anyhow::{Context, Result};
use canopy_core::source::CatalogSource;
use clap::Args;

#[derive(Args)]
pub struct InfoArgs {
    /// Archive directory containing catalog.json
    pub catalog: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let source = CatalogSource::open(&args.catalog)
        .with_context(|| format!("Failed to open catalog in {}", args.catalog.display()))?;
    let scenes = &source.catalog().scenes;

    println!("Catalog:     {}", args.catalog.display());
    println!("Scenes:      {}", scenes.len());

    if let Some(first) = scenes.first() {
        let grid = source.scene_grid(first)?;
        let bounds = grid.bounds();
        println!("Dimensions:  {}x{}", grid.cols, grid.rows);
        println!(
            "Pixel size:  {} x {}",
            grid.transform.pixel_width,
            grid.transform.pixel_height.abs()
        );
        println!(
            "Bounds:      ({:.6}, {:.6}) - ({:.6}, {:.6})",
            bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y
        );

        let first_date = scenes.iter().map(|s| s.acquired).min().unwrap_or(first.acquired);
        let last_date = scenes.iter().map(|s| s.acquired).max().unwrap_or(first.acquired);
        println!(
            "Span:        {} to {}",
            first_date.format("%Y-%m-%d"),
            last_date.format("%Y-%m-%d")
        );
    }
    println!();

    println!("{:<28} {:<19} {:>6}  Bands", "Scene", "Acquired (UTC)", "Cloud");
    for scene in scenes {
        let bands: Vec<&str> = scene.bands.keys().map(String::as_str).collect();
        println!(
            "{:<28} {:<19} {:>5.1}%  {}",
            scene.id,
            scene.acquired.format("%Y-%m-%d %H:%M:%S"),
            scene.cloud_cover,
            bands.join(", ")
        );
    }

    Ok(())
}
