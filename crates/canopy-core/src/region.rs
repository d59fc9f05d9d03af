//! Labelled regions of interest and their rasterization onto frame grids.

use geo::{Area, Intersects, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::{CanopyError, Result};
use crate::frame::GridSpec;

/// Axis-aligned bounding box in geographic coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    fn from_points(points: &[(f64, f64)]) -> Self {
        let mut bbox = Self::new(
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        );
        for &(x, y) in points {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        bbox
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }
}

/// How thoroughly region rings are checked on construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionValidation {
    /// Vertex count and finite coordinates only.
    #[default]
    Basic,
    /// Additionally reject zero-area and self-intersecting rings.
    Strict,
}

impl std::fmt::Display for RegionValidation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic => write!(f, "Basic"),
            Self::Strict => write!(f, "Strict"),
        }
    }
}

/// A labelled polygon. The ring is implicitly closed.
#[derive(Clone, Debug)]
pub struct Region {
    label: String,
    vertices: Vec<(f64, f64)>,
    polygon: Polygon<f64>,
    bbox: BoundingBox,
}

impl Region {
    pub fn new(label: impl Into<String>, vertices: &[(f64, f64)]) -> Result<Self> {
        Self::with_validation(label, vertices, RegionValidation::Basic)
    }

    /// Build a region from (lon, lat) vertices. A trailing vertex equal to the
    /// first is treated as the explicit closing vertex.
    pub fn with_validation(
        label: impl Into<String>,
        vertices: &[(f64, f64)],
        validation: RegionValidation,
    ) -> Result<Self> {
        let label = label.into();
        if label.is_empty() {
            return Err(CanopyError::InvalidRegion("empty label".into()));
        }

        let mut ring = vertices.to_vec();
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if ring.len() < 3 {
            return Err(CanopyError::InvalidRegion(format!(
                "'{label}' has {} vertices, need at least 3",
                ring.len()
            )));
        }
        if ring.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(CanopyError::InvalidRegion(format!(
                "'{label}' has non-finite coordinates"
            )));
        }

        let polygon = Polygon::new(LineString::from(ring.clone()), vec![]);

        if validation == RegionValidation::Strict {
            if polygon.unsigned_area() == 0.0 {
                return Err(CanopyError::InvalidRegion(format!(
                    "'{label}' has zero area"
                )));
            }
            if ring_self_intersects(&ring) {
                return Err(CanopyError::InvalidRegion(format!(
                    "'{label}' ring is self-intersecting"
                )));
            }
        }

        let bbox = BoundingBox::from_points(&ring);
        Ok(Self {
            label,
            vertices: ring,
            polygon,
            bbox,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Ring vertices without the closing vertex.
    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Point-in-polygon test; points on the boundary are inside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.bbox.contains_point(x, y) && self.polygon.intersects(&Point::new(x, y))
    }

    /// Rasterize onto `grid`: every pixel whose centroid lies in the polygon.
    pub fn mask(&self, grid: &GridSpec) -> RegionMask {
        let mut pixels = Vec::new();
        if let Some((rows, cols)) = pixel_window(&self.bbox, grid) {
            for row in rows.0..=rows.1 {
                for col in cols.0..=cols.1 {
                    let (x, y) = grid.transform.pixel_center(row, col);
                    if self.contains(x, y) {
                        pixels.push((row, col));
                    }
                }
            }
        }
        RegionMask {
            shape: grid.shape(),
            pixels,
        }
    }
}

/// Pixels of one grid covered by a region, in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionMask {
    shape: (usize, usize),
    pixels: Vec<(usize, usize)>,
}

impl RegionMask {
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn pixels(&self) -> &[(usize, usize)] {
        &self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// Inclusive (row, col) ranges whose centroids may fall inside `bbox`.
///
/// Padded by one pixel on each side; the caller still runs the exact test.
fn pixel_window(
    bbox: &BoundingBox,
    grid: &GridSpec,
) -> Option<((usize, usize), (usize, usize))> {
    if grid.rows == 0 || grid.cols == 0 {
        return None;
    }
    let t = &grid.transform;
    let (c0, r0) = t.geo_to_pixel(bbox.min_x, bbox.min_y);
    let (c1, r1) = t.geo_to_pixel(bbox.max_x, bbox.max_y);

    let span = |a: f64, b: f64, len: usize| -> Option<(usize, usize)> {
        let lo = (a.min(b) - 0.5).ceil() as i64 - 1;
        let hi = (a.max(b) - 0.5).floor() as i64 + 1;
        let lo = lo.max(0);
        let hi = hi.min(len as i64 - 1);
        (lo <= hi).then_some((lo as usize, hi as usize))
    };

    let rows = span(r0, r1, grid.rows)?;
    let cols = span(c0, c1, grid.cols)?;
    Some((rows, cols))
}

fn ring_self_intersects(ring: &[(f64, f64)]) -> bool {
    let n = ring.len();
    for i in 0..n {
        let a = (ring[i], ring[(i + 1) % n]);
        for j in (i + 1)..n {
            // Adjacent edges share a vertex by construction.
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let b = (ring[j], ring[(j + 1) % n]);
            if segments_intersect(a, b) {
                return true;
            }
        }
    }
    false
}

type Segment = ((f64, f64), (f64, f64));

fn segments_intersect((p1, p2): Segment, (q1, q2): Segment) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

fn orientation(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0) && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}

/// Ordered regions with unique labels.
#[derive(Clone, Debug, Default)]
pub struct RegionSet {
    regions: Vec<Region>,
}

impl RegionSet {
    pub fn new(regions: Vec<Region>) -> Result<Self> {
        for (i, region) in regions.iter().enumerate() {
            if regions[..i].iter().any(|r| r.label == region.label) {
                return Err(CanopyError::DuplicateRegion(region.label.clone()));
            }
        }
        Ok(Self { regions })
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }

    pub fn get(&self, label: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.label == label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(Region::label)
    }

    /// Union of all region bounding boxes, or `None` if the set is empty.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.regions
            .iter()
            .map(|r| r.bbox)
            .reduce(|acc, b| acc.union(&b))
    }
}

impl<'a> IntoIterator for &'a RegionSet {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::GeoTransform;

    fn square() -> Vec<(f64, f64)> {
        vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]
    }

    #[test]
    fn test_closing_vertex_is_dropped() {
        let mut ring = square();
        ring.push((0.0, 0.0));
        let region = Region::new("a", &ring).unwrap();
        assert_eq!(region.vertices().len(), 4);
    }

    #[test]
    fn test_too_few_vertices() {
        let err = Region::new("a", &[(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]).unwrap_err();
        assert!(matches!(err, CanopyError::InvalidRegion(_)));
    }

    #[test]
    fn test_boundary_point_is_inside() {
        let region = Region::new("a", &square()).unwrap();
        assert!(region.contains(4.0, 2.0));
        assert!(region.contains(0.0, 0.0));
        assert!(region.contains(2.0, 2.0));
        assert!(!region.contains(4.1, 2.0));
    }

    #[test]
    fn test_strict_rejects_bowtie() {
        let bowtie = [(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)];
        assert!(Region::new("bow", &bowtie).is_ok());
        let err =
            Region::with_validation("bow", &bowtie, RegionValidation::Strict).unwrap_err();
        assert!(matches!(err, CanopyError::InvalidRegion(_)));
    }

    #[test]
    fn test_strict_accepts_square() {
        assert!(Region::with_validation("sq", &square(), RegionValidation::Strict).is_ok());
    }

    #[test]
    fn test_mask_uses_pixel_centroids() {
        // 4x4 grid of unit pixels, origin at (0, 4), north-up.
        let grid = GridSpec::new(4, 4, GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        // Covers centroids (0.5..1.5, 2.5..3.5): rows 0-1, cols 0-1.
        let region = Region::new("a", &[(0.2, 2.2), (1.8, 2.2), (1.8, 3.8), (0.2, 3.8)]).unwrap();
        let mask = region.mask(&grid);
        assert_eq!(mask.pixels(), &[(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_mask_outside_grid_is_empty() {
        let grid = GridSpec::new(4, 4, GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        let region = Region::new("far", &[(10.0, 10.0), (12.0, 10.0), (12.0, 12.0)]).unwrap();
        assert!(region.mask(&grid).is_empty());
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let a = Region::new("a", &square()).unwrap();
        let err = RegionSet::new(vec![a.clone(), a]).unwrap_err();
        assert!(matches!(err, CanopyError::DuplicateRegion(label) if label == "a"));
    }

    #[test]
    fn test_region_set_bounds() {
        let a = Region::new("a", &square()).unwrap();
        let b = Region::new("b", &[(5.0, 5.0), (6.0, 5.0), (6.0, 7.0)]).unwrap();
        let set = RegionSet::new(vec![a, b]).unwrap();
        assert_eq!(set.bounding_box(), Some(BoundingBox::new(0.0, 0.0, 6.0, 7.0)));
    }
}
