#[allow(dead_code)]
mod common;

use approx::assert_relative_eq;
use ndarray::{array, Array2};

use canopy_core::compose::{
    compose, max_composite, quality_mosaic, CompositePolicy, Compositor,
};
use canopy_core::error::CanopyError;
use canopy_core::frame::FrameCollection;
use canopy_core::region::RegionSet;

use common::{at, constant_frame, frame_with, rect_region, unit_grid};

// ---------------------------------------------------------------------------
// Max composite
// ---------------------------------------------------------------------------

#[test]
fn test_single_frame_composite_is_identity() {
    let grid = unit_grid(2, 2);
    let ndvi = array![[0.1f32, 0.2], [0.3, 0.4]];
    let frame = frame_with("s1", at(2018, 7, 1), 0.0, grid, &[("NDVI", ndvi.clone())]);
    let collection = FrameCollection::new(vec![frame]).unwrap();

    let max = max_composite(&collection, "NDVI").unwrap();
    assert_eq!(max.band("NDVI").unwrap(), &ndvi);

    let mosaic = quality_mosaic(&collection, "NDVI").unwrap();
    assert_eq!(mosaic.band("NDVI").unwrap(), &ndvi);
    assert_eq!(mosaic.source_at(1, 1).unwrap().id, "s1");
}

#[test]
fn test_max_is_per_pixel_and_ignores_nan() {
    let grid = unit_grid(2, 2);
    let a = frame_with(
        "a",
        at(2018, 7, 1),
        0.0,
        grid,
        &[("NDVI", array![[0.1f32, 0.9], [f32::NAN, f32::NAN]])],
    );
    let b = frame_with(
        "b",
        at(2018, 7, 11),
        0.0,
        grid,
        &[("NDVI", array![[0.5f32, 0.2], [0.3, f32::NAN]])],
    );
    let collection = FrameCollection::new(vec![a, b]).unwrap();
    let composite = max_composite(&collection, "NDVI").unwrap();
    let out = composite.band("NDVI").unwrap();

    assert_relative_eq!(out[[0, 0]], 0.5);
    assert_relative_eq!(out[[0, 1]], 0.9);
    assert_relative_eq!(out[[1, 0]], 0.3);
    assert!(out[[1, 1]].is_nan());

    assert_eq!(composite.source_at(0, 0).unwrap().id, "b");
    assert_eq!(composite.source_at(0, 1).unwrap().id, "a");
    assert_eq!(composite.source_at(1, 1), None);
    assert_eq!(composite.band_names().collect::<Vec<_>>(), vec!["NDVI"]);
}

#[test]
fn test_max_value_never_below_any_frame() {
    let grid = unit_grid(5, 5);
    let frames: Vec<_> = (0..8)
        .map(|i| {
            let data = Array2::from_shape_fn((5, 5), |(r, c)| {
                ((r * 7 + c * 3 + i * 5) % 11) as f32 / 10.0
            });
            frame_with(&format!("s{i}"), at(2018, 7, 1 + i as u32), 0.0, grid, &[("NDVI", data)])
        })
        .collect();
    let collection = FrameCollection::new(frames).unwrap();
    let composite = max_composite(&collection, "NDVI").unwrap();
    let out = composite.band("NDVI").unwrap();
    for frame in &collection {
        let data = frame.band("NDVI").unwrap();
        assert!(out.iter().zip(data.iter()).all(|(m, v)| m >= v));
    }
}

#[test]
fn test_max_tie_goes_to_earliest_frame() {
    let grid = unit_grid(1, 1);
    let late = constant_frame("late", at(2018, 8, 1), grid, &[("NDVI", 0.7)]);
    let early = constant_frame("early", at(2018, 7, 1), grid, &[("NDVI", 0.7)]);

    let mut compositor = Compositor::new(&CompositePolicy::Max { band: "NDVI".into() });
    compositor.push(&late).unwrap();
    compositor.push(&early).unwrap();
    let composite = compositor.finish().unwrap();
    assert_eq!(composite.source_at(0, 0).unwrap().id, "early");
    assert_eq!(composite.sources().len(), 2);
}

#[test]
fn test_empty_composer_has_no_data() {
    let compositor = Compositor::new(&CompositePolicy::Max { band: "NDVI".into() });
    assert!(matches!(compositor.finish(), Err(CanopyError::NoData)));
}

#[test]
fn test_push_without_selection_band() {
    let grid = unit_grid(1, 1);
    let frame = constant_frame("s1", at(2018, 7, 1), grid, &[("B8", 0.5)]);
    let mut compositor = Compositor::new(&CompositePolicy::Max { band: "NDVI".into() });
    let err = compositor.push(&frame).unwrap_err();
    assert!(matches!(err, CanopyError::BandMissing { .. }));
    assert_eq!(compositor.frames_pushed(), 0);
}

#[test]
fn test_compose_skips_frames_without_selection_band() {
    let grid = unit_grid(1, 1);
    let frames = vec![
        constant_frame("s1", at(2018, 7, 1), grid, &[("NDVI", 0.4)]),
        constant_frame("s2", at(2018, 7, 11), grid, &[("B8", 0.9)]),
        constant_frame("s3", at(2018, 7, 21), grid, &[("NDVI", 0.6)]),
    ];
    let collection = FrameCollection::new(frames).unwrap();

    let max = max_composite(&collection, "NDVI").unwrap();
    assert_relative_eq!(max.band("NDVI").unwrap()[[0, 0]], 0.6);
    let ids: Vec<&str> = max.sources().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s3"]);

    let mosaic = quality_mosaic(&collection, "NDVI").unwrap();
    assert_eq!(mosaic.source_at(0, 0).unwrap().id, "s3");
    assert_eq!(mosaic.sources().len(), 2);
}

#[test]
fn test_compose_without_any_selection_band_has_no_data() {
    let grid = unit_grid(1, 1);
    let frame = constant_frame("s1", at(2018, 7, 1), grid, &[("B8", 0.5)]);
    let collection = FrameCollection::new(vec![frame]).unwrap();
    let err = max_composite(&collection, "NDVI").unwrap_err();
    assert!(matches!(err, CanopyError::NoData));
}

#[test]
fn test_source_indices_grid() {
    let grid = unit_grid(1, 2);
    let frames = vec![
        frame_with("s1", at(2018, 7, 1), 0.0, grid, &[("NDVI", array![[0.7f32, f32::NAN]])]),
        frame_with("s2", at(2018, 7, 2), 0.0, grid, &[("NDVI", array![[0.3f32, f32::NAN]])]),
    ];
    let collection = FrameCollection::new(frames).unwrap();
    let indices = max_composite(&collection, "NDVI").unwrap().source_indices();
    assert_eq!(indices[[0, 0]], 0.0);
    assert!(indices[[0, 1]].is_nan());
}

#[test]
fn test_push_rejects_other_grid() {
    let a = constant_frame("a", at(2018, 7, 1), unit_grid(2, 2), &[("NDVI", 0.5)]);
    let b = constant_frame("b", at(2018, 7, 2), unit_grid(3, 3), &[("NDVI", 0.5)]);
    let mut compositor = Compositor::new(&CompositePolicy::Max { band: "NDVI".into() });
    compositor.push(&a).unwrap();
    assert!(matches!(
        compositor.push(&b),
        Err(CanopyError::ShapeMismatch { .. })
    ));
}

// ---------------------------------------------------------------------------
// Quality mosaic
// ---------------------------------------------------------------------------

#[test]
fn test_quality_mosaic_copies_every_band_from_winner() {
    let grid = unit_grid(1, 2);
    let a = frame_with(
        "a",
        at(2018, 7, 1),
        0.0,
        grid,
        &[
            ("NDVI", array![[0.9f32, 0.1]]),
            ("B4", array![[10.0f32, 11.0]]),
            ("B8", array![[20.0f32, 21.0]]),
        ],
    );
    let b = frame_with(
        "b",
        at(2018, 7, 6),
        0.0,
        grid,
        &[
            ("NDVI", array![[0.2f32, 0.8]]),
            ("B4", array![[30.0f32, 31.0]]),
            ("B8", array![[40.0f32, 41.0]]),
        ],
    );
    let collection = FrameCollection::new(vec![a, b]).unwrap();
    let mosaic = quality_mosaic(&collection, "NDVI").unwrap();

    assert_eq!(mosaic.band_names().collect::<Vec<_>>(), vec!["B4", "B8", "NDVI"]);
    assert_eq!(mosaic.band("B4").unwrap(), &array![[10.0f32, 31.0]]);
    assert_eq!(mosaic.band("B8").unwrap(), &array![[20.0f32, 41.0]]);
    assert_eq!(mosaic.band("NDVI").unwrap(), &array![[0.9f32, 0.8]]);
}

#[test]
fn test_quality_mosaic_tie_is_order_independent() {
    let grid = unit_grid(1, 1);
    let early = constant_frame("early", at(2018, 7, 1), grid, &[("NDVI", 0.6), ("B4", 1.0)]);
    let late = constant_frame("late", at(2018, 7, 21), grid, &[("NDVI", 0.6), ("B4", 2.0)]);
    let policy = CompositePolicy::QualityMosaic {
        quality_band: "NDVI".into(),
    };

    for order in [[&early, &late], [&late, &early]] {
        let mut compositor = Compositor::new(&policy);
        for frame in order {
            compositor.push(frame).unwrap();
        }
        let mosaic = compositor.finish().unwrap();
        assert_eq!(mosaic.source_at(0, 0).unwrap().id, "early");
        assert_relative_eq!(mosaic.band("B4").unwrap()[[0, 0]], 1.0);
    }
}

#[test]
fn test_quality_mosaic_band_absent_from_winner_is_nan() {
    let grid = unit_grid(1, 2);
    let a = frame_with(
        "a",
        at(2018, 7, 1),
        0.0,
        grid,
        &[("NDVI", array![[0.9f32, 0.1]]), ("B5", array![[5.0f32, 6.0]])],
    );
    let b = frame_with(
        "b",
        at(2018, 7, 6),
        0.0,
        grid,
        &[("NDVI", array![[0.2f32, 0.8]])],
    );
    let collection = FrameCollection::new(vec![a, b]).unwrap();
    let mosaic = quality_mosaic(&collection, "NDVI").unwrap();
    let b5 = mosaic.band("B5").unwrap();
    assert_relative_eq!(b5[[0, 0]], 5.0);
    assert!(b5[[0, 1]].is_nan());
}

#[test]
fn test_quality_all_nan_pixel_has_no_source() {
    let grid = unit_grid(1, 1);
    let a = constant_frame("a", at(2018, 7, 1), grid, &[("NDVI", f32::NAN), ("B4", 3.0)]);
    let collection = FrameCollection::new(vec![a]).unwrap();
    let mosaic = quality_mosaic(&collection, "NDVI").unwrap();
    assert!(mosaic.band("B4").unwrap()[[0, 0]].is_nan());
    assert_eq!(mosaic.source_at(0, 0), None);
}

// ---------------------------------------------------------------------------
// Clipping
// ---------------------------------------------------------------------------

#[test]
fn test_clip_blanks_pixels_outside_regions() {
    let grid = unit_grid(2, 2);
    let frame = constant_frame("s1", at(2018, 7, 1), grid, &[("NDVI", 0.5)]);
    let collection = FrameCollection::new(vec![frame]).unwrap();
    let composite = compose(&collection, &CompositePolicy::Max { band: "NDVI".into() }).unwrap();

    // Upper-left pixel only: centroid (0.5, 1.5).
    let regions = RegionSet::new(vec![rect_region("Field1", 0.0, 1.0, 1.0, 2.0)]).unwrap();
    let clipped = composite.clip(&regions);
    let out = clipped.band("NDVI").unwrap();

    assert_relative_eq!(out[[0, 0]], 0.5);
    assert!(out[[0, 1]].is_nan());
    assert!(out[[1, 0]].is_nan());
    assert!(out[[1, 1]].is_nan());
    assert!(clipped.source_at(0, 0).is_some());
    assert!(clipped.source_at(1, 1).is_none());
    // The unclipped composite is untouched.
    assert_relative_eq!(composite.band("NDVI").unwrap()[[1, 1]], 0.5);
}

#[test]
fn test_policy_display() {
    assert_eq!(
        CompositePolicy::Max { band: "NDVI".into() }.to_string(),
        "Max (NDVI)"
    );
    assert_eq!(
        CompositePolicy::QualityMosaic {
            quality_band: "NDVI".into()
        }
        .to_string(),
        "Quality Mosaic (NDVI)"
    );
}
