#[allow(dead_code)]
mod common;

use approx::assert_relative_eq;
use ndarray::Array2;

use canopy_core::aggregate::Statistic;
use canopy_core::frame::FrameCollection;
use canopy_core::index::{compute_indices_collection, IndexDefinition};
use canopy_core::region::RegionSet;
use canopy_core::series::build_series;

use common::{at, constant_frame, covering_region, frame_with, rect_region, unit_grid};

#[test]
fn test_single_region_ndvi_series() {
    let grid = unit_grid(4, 4);
    // NIR/red chosen so NDVI is 0.2, 0.5 and 0.8.
    let frames = vec![
        constant_frame("s1", at(2019, 7, 5), grid, &[("B8", 0.6), ("B4", 0.4)]),
        constant_frame("s2", at(2019, 7, 15), grid, &[("B8", 0.75), ("B4", 0.25)]),
        constant_frame("s3", at(2019, 8, 4), grid, &[("B8", 0.9), ("B4", 0.1)]),
    ];
    let collection = FrameCollection::new(frames).unwrap();
    let collection = compute_indices_collection(&collection, &[IndexDefinition::ndvi()]).unwrap();
    let regions = RegionSet::new(vec![covering_region("Field1", &grid)]).unwrap();

    let series = build_series(&collection, &regions, "NDVI", Statistic::Mean).unwrap();
    let points = series.get("Field1").unwrap();
    assert_eq!(points.len(), 3);
    let expected = [0.2, 0.5, 0.8];
    for (point, want) in points.iter().zip(expected) {
        assert_eq!(point.label, "Field1");
        assert_relative_eq!(point.value.unwrap(), want, epsilon = 1e-6);
    }
    assert_eq!(points[0].timestamp, at(2019, 7, 5));
    assert_eq!(points[2].timestamp, at(2019, 8, 4));
}

#[test]
fn test_points_ordered_by_timestamp_regardless_of_input() {
    let grid = unit_grid(2, 2);
    let frames = vec![
        constant_frame("c", at(2018, 8, 20), grid, &[("NDVI", 0.3)]),
        constant_frame("a", at(2016, 7, 1), grid, &[("NDVI", 0.1)]),
        constant_frame("b", at(2017, 7, 9), grid, &[("NDVI", 0.2)]),
        constant_frame("d", at(2020, 8, 30), grid, &[("NDVI", 0.4)]),
        constant_frame("e", at(2019, 7, 1), grid, &[("NDVI", 0.35)]),
    ];
    let collection = FrameCollection::new(frames).unwrap();
    let regions = RegionSet::new(vec![covering_region("Field1", &grid)]).unwrap();
    let series = build_series(&collection, &regions, "NDVI", Statistic::Mean).unwrap();

    let points = series.get("Field1").unwrap();
    assert!(points.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[test]
fn test_equal_timestamps_keep_input_order() {
    let grid = unit_grid(2, 2);
    let when = at(2019, 7, 10);
    let frames = vec![
        constant_frame("first", when, grid, &[("NDVI", 0.1)]),
        constant_frame("second", when, grid, &[("NDVI", 0.9)]),
    ];
    let collection = FrameCollection::new(frames).unwrap();
    let regions = RegionSet::new(vec![covering_region("Field1", &grid)]).unwrap();
    let series = build_series(&collection, &regions, "NDVI", Statistic::Mean).unwrap();

    let values: Vec<f64> = series
        .get("Field1")
        .unwrap()
        .iter()
        .map(|p| p.value.unwrap())
        .collect();
    assert_relative_eq!(values[0], 0.1, epsilon = 1e-6);
    assert_relative_eq!(values[1], 0.9, epsilon = 1e-6);
}

#[test]
fn test_gaps_are_kept_in_place() {
    let grid = unit_grid(2, 2);
    let frames = vec![
        constant_frame("s1", at(2019, 7, 1), grid, &[("NDVI", 0.4)]),
        constant_frame("s2", at(2019, 7, 11), grid, &[("NDVI", f32::NAN)]),
        constant_frame("s3", at(2019, 7, 21), grid, &[("NDVI", 0.6)]),
    ];
    let collection = FrameCollection::new(frames).unwrap();
    let regions = RegionSet::new(vec![covering_region("Field1", &grid)]).unwrap();
    let series = build_series(&collection, &regions, "NDVI", Statistic::Mean).unwrap();

    let points = series.get("Field1").unwrap();
    assert_eq!(points.len(), 3);
    assert!(points[0].value.is_some());
    assert_eq!(points[1].value, None);
    assert_eq!(points[1].timestamp, at(2019, 7, 11));
    assert!(points[2].value.is_some());
    assert_eq!(series.regions[0].gap_count(), 1);
}

#[test]
fn test_frame_without_band_records_gap() {
    let grid = unit_grid(2, 2);
    let frames = vec![
        constant_frame("s1", at(2019, 7, 1), grid, &[("NDVI", 0.4)]),
        constant_frame("s2", at(2019, 7, 11), grid, &[("B8", 0.5)]),
    ];
    let collection = FrameCollection::new(frames).unwrap();
    let regions = RegionSet::new(vec![covering_region("Field1", &grid)]).unwrap();
    let series = build_series(&collection, &regions, "NDVI", Statistic::Mean).unwrap();

    let points = series.get("Field1").unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[1].value, None);
}

#[test]
fn test_regions_in_input_order_with_uniform_length() {
    let grid = unit_grid(4, 4);
    let mut ndvi = Array2::from_elem((4, 4), 0.3f32);
    ndvi.row_mut(0).fill(0.9);
    let frames: Vec<_> = (0..6)
        .map(|i| {
            frame_with(&format!("s{i}"), at(2019, 7, 1 + i), 5.0, grid, &[("NDVI", ndvi.clone())])
        })
        .collect();
    let collection = FrameCollection::new(frames).unwrap();
    let regions = RegionSet::new(vec![
        // Top row, centroids at y = 3.5.
        rect_region("Field3", -1.0, 3.0, 5.0, 5.0),
        rect_region("Field1", -1.0, -1.0, 5.0, 3.0),
        rect_region("Field2", 50.0, 50.0, 60.0, 60.0),
    ])
    .unwrap();
    let series = build_series(&collection, &regions, "NDVI", Statistic::Max).unwrap();

    assert_eq!(series.labels().collect::<Vec<_>>(), vec!["Field3", "Field1", "Field2"]);
    assert!(series.regions.iter().all(|r| r.points.len() == 6));
    assert_eq!(series.point_count(), 18);
    assert_relative_eq!(series.get("Field3").unwrap()[0].value.unwrap(), 0.9, epsilon = 1e-6);
    assert_relative_eq!(series.get("Field1").unwrap()[0].value.unwrap(), 0.3, epsilon = 1e-6);
    assert_eq!(series.regions[2].gap_count(), 6);
    assert_eq!(series.statistic, Statistic::Max);
}

#[test]
fn test_empty_collection_yields_empty_series() {
    let collection = FrameCollection::new(Vec::new()).unwrap();
    let regions = RegionSet::new(vec![rect_region("Field1", 0.0, 0.0, 1.0, 1.0)]).unwrap();
    let series = build_series(&collection, &regions, "NDVI", Statistic::Mean).unwrap();
    assert_eq!(series.regions.len(), 1);
    assert!(series.regions[0].points.is_empty());
}
