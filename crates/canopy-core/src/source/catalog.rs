use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::consts::CATALOG_FILE_NAME;
use crate::error::{CanopyError, Result};
use crate::frame::{Frame, FrameCollection, GridSpec};
use crate::io::catalog::{load_catalog, Catalog, SceneEntry};
use crate::io::grid::GridReader;

use super::{QueryControl, RasterQuery, RasterSource};

/// A directory archive described by `catalog.json`.
///
/// Scenes are filtered on manifest metadata first. Band-file headers are read
/// only for scenes that pass, to test the footprint; pixel data is decoded
/// only for scenes that match.
pub struct CatalogSource {
    root: PathBuf,
    catalog: Catalog,
}

impl CatalogSource {
    pub fn open(root: &Path) -> Result<Self> {
        let catalog = load_catalog(&root.join(CATALOG_FILE_NAME))?;
        info!(scenes = catalog.scenes.len(), root = %root.display(), "Opened catalog");
        Ok(Self {
            root: root.to_path_buf(),
            catalog,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Grid of a scene, read from its first band file header.
    pub fn scene_grid(&self, scene: &SceneEntry) -> Result<GridSpec> {
        let (_, path) = scene.bands.iter().next().ok_or_else(|| {
            CanopyError::InvalidCatalog(format!("scene '{}' has no bands", scene.id))
        })?;
        Ok(GridReader::open(&self.root.join(path))?.grid)
    }

    fn load_scene(&self, scene: &SceneEntry, grid: GridSpec) -> Result<Frame> {
        let mut frame = Frame::new(scene.id.clone(), scene.acquired, scene.cloud_cover, grid);
        for (name, path) in &scene.bands {
            let reader = GridReader::open(&self.root.join(path))?;
            if reader.grid != grid {
                return Err(CanopyError::InvalidCatalog(format!(
                    "scene '{}': band '{}' grid differs from the scene grid",
                    scene.id, name
                )));
            }
            frame = frame.with_band(name.clone(), reader.read()?)?;
        }
        debug!(scene = %scene.id, bands = scene.bands.len(), "Loaded scene");
        Ok(frame)
    }
}

impl RasterSource for CatalogSource {
    fn name(&self) -> &str {
        "catalog"
    }

    fn query(&self, query: &RasterQuery, control: &QueryControl) -> Result<FrameCollection> {
        let guard = control.start();

        let mut matched = Vec::new();
        for scene in &self.catalog.scenes {
            guard.check()?;
            if !query.matches_acquisition(&scene.acquired, scene.cloud_cover) {
                continue;
            }
            let grid = self.scene_grid(scene)?;
            if query.matches_footprint(&grid.bounds()) {
                matched.push((scene, grid));
            }
        }
        if matched.is_empty() {
            return Err(CanopyError::NoData);
        }
        info!(
            matched = matched.len(),
            total = self.catalog.scenes.len(),
            "Scenes match query"
        );

        let mut frames = Vec::with_capacity(matched.len());
        for (scene, grid) in matched {
            guard.check()?;
            frames.push(self.load_scene(scene, grid)?);
        }
        FrameCollection::new(frames)
    }
}
