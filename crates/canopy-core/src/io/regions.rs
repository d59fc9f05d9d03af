//! GeoJSON region input.
//!
//! Accepts a `FeatureCollection` of `Polygon` features. The label comes from
//! the `label` property, falling back to `field_name`. Only the exterior ring
//! of each polygon is used.

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{CanopyError, Result};
use crate::region::{Region, RegionSet, RegionValidation};

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Value,
}

pub fn load_regions(path: &Path, validation: RegionValidation) -> Result<RegionSet> {
    let contents = std::fs::read_to_string(path)?;
    parse_regions(&contents, validation)
}

pub fn parse_regions(geojson: &str, validation: RegionValidation) -> Result<RegionSet> {
    let collection: FeatureCollection = serde_json::from_str(geojson)?;
    if collection.kind != "FeatureCollection" {
        return Err(CanopyError::InvalidRegion(format!(
            "expected FeatureCollection, got {}",
            collection.kind
        )));
    }

    let regions = collection
        .features
        .into_iter()
        .enumerate()
        .map(|(i, feature)| feature_to_region(i, feature, validation))
        .collect::<Result<Vec<_>>>()?;
    RegionSet::new(regions)
}

fn feature_to_region(
    index: usize,
    feature: Feature,
    validation: RegionValidation,
) -> Result<Region> {
    if feature.kind != "Feature" {
        return Err(CanopyError::InvalidRegion(format!(
            "feature {index}: expected Feature, got {}",
            feature.kind
        )));
    }
    if feature.geometry.kind != "Polygon" {
        return Err(CanopyError::InvalidRegion(format!(
            "feature {index}: expected a Polygon, got {}",
            feature.geometry.kind
        )));
    }

    let label = feature
        .properties
        .as_ref()
        .and_then(|p| p.get("label").or_else(|| p.get("field_name")))
        .and_then(Value::as_str)
        .ok_or_else(|| CanopyError::InvalidRegion(format!("feature {index}: no label")))?
        .to_string();

    let rings: Vec<Vec<Vec<f64>>> = serde_json::from_value(feature.geometry.coordinates)
        .map_err(|_| {
            CanopyError::InvalidRegion(format!(
                "'{label}': expected a list of coordinate rings"
            ))
        })?;
    let exterior = rings
        .first()
        .ok_or_else(|| CanopyError::InvalidRegion(format!("'{label}': polygon has no rings")))?;

    let vertices = exterior
        .iter()
        .map(|pos| match pos.as_slice() {
            [x, y, ..] => Ok((*x, *y)),
            _ => Err(CanopyError::InvalidRegion(format!(
                "'{label}': position needs longitude and latitude"
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    Region::with_validation(label, &vertices, validation)
}
