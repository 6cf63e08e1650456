use ttc_fusion::calibration::Calibration;
use ttc_fusion::config::FusionConfig;
use ttc_fusion::error::{FusionError, IoError};
use ttc_fusion::io::{
    SequenceReport, load_frames, object_from_json, object_to_json, save_frames, write_report,
};
use ttc_fusion::matching::BruteForceMatcher;
use ttc_fusion::pipeline::{FramePairResult, prepare_frame, process_frame_pair, process_sequence};
use ttc_fusion::synthetic::{SceneConfig, SyntheticSequence, generate_sequence};
use ttc_fusion::ttc::{TtcEstimate, UnavailableReason};
use ttc_fusion::types::Frame;

fn kitti_like() -> Calibration {
    Calibration::pinhole(721.5377, 609.5593, 172.854)
}

fn clean_scene() -> SceneConfig {
    SceneConfig {
        range_noise: 0.0,
        pixel_noise: 0.0,
        outlier_fraction: 0.0,
        descriptor_noise_bits: 0,
        ..Default::default()
    }
}

fn run(sequence: &SyntheticSequence) -> Vec<FramePairResult> {
    process_sequence(
        &sequence.frames,
        &BruteForceMatcher::default(),
        &sequence.calibration,
        &FusionConfig::default(),
    )
    .unwrap()
    .into_iter()
    .collect::<Result<Vec<_>, _>>()
    .unwrap()
}

/// Lead vehicle ids swap every frame.
fn lead_ids(prev_index: usize) -> (u32, u32) {
    if prev_index % 2 == 0 { (0, 1) } else { (1, 0) }
}

#[test]
fn test_synthetic_sequence_is_deterministic() {
    let config = SceneConfig::default();
    let a = generate_sequence(&config, &kitti_like()).unwrap();
    let b = generate_sequence(&config, &kitti_like()).unwrap();
    assert_eq!(a.frames, b.frames);
    assert_eq!(a.frames.len(), config.num_frames);
    assert_eq!(a.ground_truth_ttc.len(), config.num_frames - 1);
    assert!((a.ground_truth_ttc[0] - 9.7 / 3.0).abs() < 1e-9);

    let other = generate_sequence(
        &SceneConfig {
            seed: 1,
            ..Default::default()
        },
        &kitti_like(),
    )
    .unwrap();
    assert_ne!(a.frames, other.frames);
}

#[test]
fn test_prepare_frame_crops_and_assigns() {
    let sequence = generate_sequence(&clean_scene(), &kitti_like()).unwrap();
    let config = FusionConfig::default();
    let frame = prepare_frame(&sequence.frames[0], &sequence.calibration, &config).unwrap();

    let lead = frame.region(0).unwrap();
    assert!(!lead.range_points.is_empty());
    assert!(lead.range_points.iter().all(|p| (p.x - 10.0).abs() < 1e-9));
    // the neighbour's points are outside the ego lane
    assert!(frame.region(1).unwrap().range_points.is_empty());
    assert_eq!(frame.keypoints, sequence.frames[0].keypoints);
}

#[test]
fn test_clean_sequence_matches_ground_truth() {
    let sequence = generate_sequence(&clean_scene(), &kitti_like()).unwrap();
    let results = run(&sequence);
    assert_eq!(results.len(), sequence.frames.len() - 1);

    for (i, pair) in results.iter().enumerate() {
        assert_eq!((pair.prev_index, pair.curr_index), (i, i + 1));
        assert!(pair.failures.is_empty(), "{:?}", pair.failures);

        let (lead_prev, lead_curr) = lead_ids(i);
        assert_eq!(pair.associations.get(lead_prev), Some(lead_curr));
        assert_eq!(pair.associations.get(lead_curr), Some(lead_prev));

        let truth = sequence.ground_truth_ttc[i];
        let lead = pair.regions.iter().find(|r| r.curr_id == lead_curr).unwrap();
        let lidar = lead.lidar.seconds().unwrap();
        assert!((lidar - truth).abs() < 1e-6, "pair {}: lidar {} truth {}", i, lidar, truth);
        let camera = lead.camera.seconds().unwrap();
        assert!(
            (camera - truth).abs() / truth < 0.02,
            "pair {}: camera {} truth {}",
            i,
            camera,
            truth
        );
        assert!(!lead.accepted_correspondences.is_empty());
        assert!(lead.summary.num_points > 0);

        let neighbour = pair.regions.iter().find(|r| r.curr_id == lead_prev).unwrap();
        assert_eq!(
            neighbour.lidar,
            TtcEstimate::Unavailable {
                reason: UnavailableReason::NoRangePoints
            }
        );
        assert!(!neighbour.camera.is_collision_course());
    }
}

#[test]
fn test_noisy_sequence_stays_close() {
    let sequence = generate_sequence(&SceneConfig::default(), &kitti_like()).unwrap();
    let results = run(&sequence);

    let mut camera_errors = Vec::new();
    for (i, pair) in results.iter().enumerate() {
        let (_, lead_curr) = lead_ids(i);
        let truth = sequence.ground_truth_ttc[i];
        let lead = pair.regions.iter().find(|r| r.curr_id == lead_curr).unwrap();

        let lidar = lead.lidar.seconds().unwrap();
        assert!((lidar - truth).abs() / truth < 0.1, "pair {}: lidar {}", i, lidar);
        if let Some(camera) = lead.camera.seconds() {
            camera_errors.push((camera - truth).abs() / truth);
        }
    }
    assert!(camera_errors.len() >= results.len() / 2);
    let median_error = ttc_fusion::stats::median_all(&camera_errors).unwrap();
    assert!(median_error < 0.3, "median camera error {}", median_error);
}

#[test]
fn test_invalid_inputs() {
    let sequence = generate_sequence(&clean_scene(), &kitti_like()).unwrap();
    let mut calibration = kitti_like();
    calibration.rt[3] = [0.0, 0.0, 1.0, 1.0];
    let result = process_sequence(
        &sequence.frames,
        &BruteForceMatcher::default(),
        &calibration,
        &FusionConfig::default(),
    );
    assert!(matches!(result, Err(FusionError::MalformedCalibration(_))));

    let config = FusionConfig {
        frame_rate: 0.0,
        ..Default::default()
    };
    let result = process_frame_pair(
        &sequence.frames[0],
        &sequence.frames[1],
        &[],
        &sequence.calibration,
        &config,
    );
    assert!(matches!(result, Err(FusionError::Config(_))));

    // fewer than two frames produce no pairs
    let results = process_sequence(
        &sequence.frames[..1],
        &BruteForceMatcher::default(),
        &sequence.calibration,
        &FusionConfig::default(),
    )
    .unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_frame_io_and_report() {
    let sequence = generate_sequence(&SceneConfig::default(), &kitti_like()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("frames");
    let folder = folder.to_str().unwrap();

    save_frames(folder, &sequence.frames).unwrap();
    let loaded = load_frames(folder).unwrap();
    assert_eq!(loaded.len(), sequence.frames.len());
    for (a, b) in loaded.iter().zip(&sequence.frames) {
        assert_eq!(a.index, b.index);
        assert_eq!(a.keypoints, b.keypoints);
        assert_eq!(a.descriptors, b.descriptors);
        assert_eq!(a.regions.len(), b.regions.len());
        assert_eq!(a.range_points.len(), b.range_points.len());
    }

    let calibration_path = dir.path().join("calibration.json");
    let calibration_path = calibration_path.to_str().unwrap();
    object_to_json(calibration_path, &sequence.calibration).unwrap();
    let calibration: Calibration = object_from_json(calibration_path).unwrap();
    assert!(calibration.projection().is_ok());

    let config = FusionConfig::default();
    let results = process_sequence(
        &loaded,
        &BruteForceMatcher::default(),
        &calibration,
        &config,
    )
    .unwrap();
    let report = SequenceReport::new(&config, results).unwrap();
    assert_eq!(report.pairs.len(), sequence.frames.len() - 1);
    assert!(report.failed_pairs.is_empty());

    let report_path = dir.path().join("report.json");
    let report_path = report_path.to_str().unwrap();
    write_report(report_path, &report).unwrap();
    let json: serde_json::Value = object_from_json(report_path).unwrap();
    assert_eq!(json["pairs"].as_array().unwrap().len(), report.pairs.len());
    assert!(json["timestamp"].is_string());
    assert_eq!(json["config"]["lidar"]["k"], 5);
}

#[test]
fn test_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    let result: Result<Frame, IoError> = object_from_json(missing.to_str().unwrap());
    assert!(matches!(result, Err(IoError::File { .. })));

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{ not json").unwrap();
    let result: Result<Frame, IoError> = object_from_json(broken.to_str().unwrap());
    assert!(matches!(result, Err(IoError::Json { .. })));

    // an empty folder holds no frames
    assert!(load_frames(dir.path().join("none").to_str().unwrap())
        .unwrap()
        .is_empty());
}

#[test]
fn test_accepted_correspondences_attach_to_frame() {
    let sequence = generate_sequence(&clean_scene(), &kitti_like()).unwrap();
    let config = FusionConfig::default();
    let matches = ttc_fusion::matching::DescriptorMatcher::match_descriptors(
        &BruteForceMatcher::default(),
        &sequence.frames[0].descriptors,
        &sequence.frames[1].descriptors,
    )
    .unwrap();
    let result = process_frame_pair(
        &sequence.frames[0],
        &sequence.frames[1],
        &matches,
        &sequence.calibration,
        &config,
    )
    .unwrap();

    let annotated = sequence.frames[1].with_region_correspondences(result.region_correspondences());
    let (_, lead_curr) = lead_ids(0);
    let lead = annotated.region(lead_curr).unwrap();
    let expected = &result
        .regions
        .iter()
        .find(|r| r.curr_id == lead_curr)
        .unwrap()
        .accepted_correspondences;
    assert!(!lead.correspondences.is_empty());
    assert_eq!(&lead.correspondences, expected);
    assert!(sequence.frames[1].regions.iter().all(|r| r.correspondences.is_empty()));
}
