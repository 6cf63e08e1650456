use ttc_fusion::config::{FilterStrategy, FusionConfig};
use ttc_fusion::error::ConfigError;
use ttc_fusion::stats::NearReduction;

#[test]
fn test_default_config() {
    let config = FusionConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.frame_rate, 10.0);
    assert!((config.frame_interval() - 0.1).abs() < 1e-12);
    assert_eq!(config.projection.shrink_factor, 0.10);
    assert_eq!(config.filter.shrink_factor, -0.10);
    assert_eq!(
        config.filter.strategy,
        FilterStrategy::MedianBand { range_factor: 2.5 }
    );
    assert_eq!(config.lidar.k, 5);
    assert_eq!(config.lidar.reduction, NearReduction::Minimum);
    assert_eq!(config.camera.min_pair_distance, 100.0);
    assert_eq!(config.camera.max_pair_distance, 160.0);
}

#[test]
fn test_partial_json_config() {
    let json = r#"{
        "frame_rate": 20.0,
        "filter": { "strategy": { "type": "iqr", "iqr_factor": 1.2 } },
        "lidar": { "reduction": "median_of_nearest" }
    }"#;
    let config: FusionConfig = serde_json::from_str(json).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.frame_rate, 20.0);
    assert_eq!(config.filter.strategy, FilterStrategy::Iqr { iqr_factor: 1.2 });
    assert_eq!(config.filter.shrink_factor, -0.10);
    assert_eq!(config.lidar.reduction, NearReduction::MedianOfNearest);
    assert_eq!(config.lidar.k, 5);
}

#[test]
fn test_invalid_configs() {
    let mut config = FusionConfig::default();
    config.frame_rate = 0.0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid { field: "frame_rate", .. })
    ));

    let mut config = FusionConfig::default();
    config.lidar.k = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid { field: "lidar.k", .. })
    ));

    let mut config = FusionConfig::default();
    config.projection.shrink_factor = 1.0;
    assert!(config.validate().is_err());

    let mut config = FusionConfig::default();
    config.camera.min_pair_distance = 200.0;
    assert!(config.validate().is_err());

    let mut config = FusionConfig::default();
    config.filter.strategy = FilterStrategy::MedianBand {
        range_factor: f64::NAN,
    };
    assert!(config.validate().is_err());

    let mut config = FusionConfig::default();
    config.crop.min_z = 0.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_frame_rate_with_infinite_interval() {
    let config = FusionConfig {
        frame_rate: 1e-320,
        ..Default::default()
    };
    assert!(config.frame_rate > 0.0);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid { field: "frame_rate", .. })
    ));
}
