//! Archive manifest (`catalog.json`) describing scenes and their band files.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CanopyError, Result};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub scenes: Vec<SceneEntry>,
}

/// One acquisition; band paths are relative to the catalog directory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneEntry {
    pub id: String,
    pub acquired: DateTime<Utc>,
    pub cloud_cover: f32,
    pub bands: BTreeMap<String, PathBuf>,
}

impl Catalog {
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for scene in &self.scenes {
            if !ids.insert(scene.id.as_str()) {
                return Err(CanopyError::InvalidCatalog(format!(
                    "duplicate scene id '{}'",
                    scene.id
                )));
            }
            if !(0.0..=100.0).contains(&scene.cloud_cover) {
                return Err(CanopyError::InvalidCatalog(format!(
                    "scene '{}' cloud cover {} outside 0-100",
                    scene.id, scene.cloud_cover
                )));
            }
            if scene.bands.is_empty() {
                return Err(CanopyError::InvalidCatalog(format!(
                    "scene '{}' has no bands",
                    scene.id
                )));
            }
        }
        Ok(())
    }
}

pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let contents = std::fs::read_to_string(path)?;
    let catalog: Catalog = serde_json::from_str(&contents)?;
    catalog.validate()?;
    Ok(catalog)
}

pub fn save_catalog(catalog: &Catalog, path: &Path) -> Result<()> {
    catalog.validate()?;
    let json = serde_json::to_string_pretty(catalog)?;
    std::fs::write(path, json)?;
    Ok(())
}
