use ttc_fusion::config::{FilterConfig, FilterStrategy};
use ttc_fusion::error::FusionError;
use ttc_fusion::filter::filter_region_correspondences;
use ttc_fusion::types::{Correspondence, Keypoint, Rect, TrackedRegion};

/// Ten inliers moving 2 px to the right, one 30 px outlier, one match
/// outside the region.
fn scene() -> (TrackedRegion, Vec<Keypoint>, Vec<Keypoint>, Vec<Correspondence>) {
    let region = TrackedRegion::new(4, Rect::new(0.0, 0.0, 100.0, 100.0));
    let mut prev = Vec::new();
    let mut curr = Vec::new();
    for i in 0..10 {
        let x = 10.0 + i as f32 * 5.0;
        prev.push(Keypoint::new(x, 50.0));
        curr.push(Keypoint::new(x + 2.0, 50.0));
    }
    prev.push(Keypoint::new(20.0, 20.0));
    curr.push(Keypoint::new(50.0, 20.0));
    prev.push(Keypoint::new(300.0, 300.0));
    curr.push(Keypoint::new(302.0, 300.0));
    // reversed so correspondence and keypoint indices differ
    let matches = (0..prev.len())
        .map(|i| Correspondence::new(i, i, 10.0))
        .rev()
        .collect();
    (region, prev, curr, matches)
}

#[test]
fn test_median_band_rejects_outlier() {
    let (region, prev, curr, matches) = scene();
    let config = FilterConfig::default();
    let outcome = filter_region_correspondences(&region, &prev, &curr, &matches, &config).unwrap();

    assert_eq!(outcome.region, 4);
    assert_eq!(outcome.candidates, 11);
    assert_eq!(outcome.accepted.len(), 10);
    assert!(outcome.accepted.iter().all(|m| m.prev_idx < 10));
    assert!((outcome.displacement.median - 2.0).abs() < 1e-6);

    let range_factor = 2.5;
    let lo = outcome.displacement.median * (1.0 - range_factor);
    let hi = outcome.displacement.median * (1.0 + range_factor);
    for m in &outcome.accepted {
        let d = curr[m.curr_idx].distance(&prev[m.prev_idx]);
        assert!(d >= lo && d <= hi);
    }
}

#[test]
fn test_iqr_strategy() {
    let (region, mut prev, mut curr, mut matches) = scene();
    // spread the inliers so the quartiles differ
    for i in 0..10 {
        curr[i].pt.x = prev[i].pt.x + 1.0 + i as f32 * 0.2;
    }
    prev.push(Keypoint::new(60.0, 70.0));
    curr.push(Keypoint::new(60.0, 75.0));
    matches.push(Correspondence::new(prev.len() - 1, curr.len() - 1, 3.0));

    let config = FilterConfig {
        strategy: FilterStrategy::Iqr { iqr_factor: 1.2 },
        ..Default::default()
    };
    let outcome = filter_region_correspondences(&region, &prev, &curr, &matches, &config).unwrap();
    assert_eq!(outcome.candidates, 12);
    let (lo, hi) = outcome.band;
    assert!(lo > 0.0 && hi < 5.0, "band {:?}", outcome.band);
    // only the ten spread inliers survive
    assert_eq!(outcome.accepted.len(), 10);

    // the wide default band keeps the 5 px match too
    let wide =
        filter_region_correspondences(&region, &prev, &curr, &matches, &FilterConfig::default())
            .unwrap();
    assert_eq!(wide.accepted.len(), 11);
}

#[test]
fn test_negative_shrink_grows_region() {
    let region = TrackedRegion::new(0, Rect::new(0.0, 0.0, 100.0, 100.0));
    let prev = vec![Keypoint::new(103.0, 50.0), Keypoint::new(60.0, 50.0)];
    let curr = vec![Keypoint::new(104.0, 50.0), Keypoint::new(61.0, 50.0)];
    let matches = vec![Correspondence::new(0, 0, 1.0), Correspondence::new(1, 1, 1.0)];

    let grown = filter_region_correspondences(&region, &prev, &curr, &matches, &FilterConfig::default())
        .unwrap();
    assert_eq!(grown.candidates, 2);

    let exact = FilterConfig {
        shrink_factor: 0.0,
        ..Default::default()
    };
    let outcome = filter_region_correspondences(&region, &prev, &curr, &matches, &exact).unwrap();
    assert_eq!(outcome.candidates, 1);
}

#[test]
fn test_no_candidates() {
    let (_, prev, curr, matches) = scene();
    let far = TrackedRegion::new(9, Rect::new(500.0, 500.0, 10.0, 10.0));
    let result = filter_region_correspondences(&far, &prev, &curr, &matches, &FilterConfig::default());
    assert_eq!(
        result,
        Err(FusionError::InsufficientCorrespondences { region: 9 })
    );

    let result = filter_region_correspondences(&far, &prev, &curr, &[], &FilterConfig::default());
    assert!(matches!(
        result,
        Err(FusionError::InsufficientCorrespondences { .. })
    ));
}

#[test]
fn test_invalid_index() {
    let (region, prev, curr, mut matches) = scene();
    matches.push(Correspondence::new(0, curr.len(), 1.0));
    let result = filter_region_correspondences(&region, &prev, &curr, &matches, &FilterConfig::default());
    assert!(matches!(
        result,
        Err(FusionError::InvalidKeypointIndex { frame: "current", .. })
    ));
}
