use clap::Parser;
use std::time::Instant;
use ttc_fusion::calibration::Calibration;
use ttc_fusion::config::FusionConfig;
use ttc_fusion::io::{SequenceReport, load_frames, object_from_json, write_report};
use ttc_fusion::matching::{BruteForceMatcher, MatchSelector};
use ttc_fusion::pipeline::process_sequence;

#[derive(Parser)]
#[command(version, about, author)]
struct TtcCli {
    /// folder with one json file per frame
    path: String,

    /// calibration json, defaults to the KITTI camera 00 calibration
    #[arg(short, long)]
    calibration: Option<String>,

    /// fusion config json
    #[arg(long)]
    config: Option<String>,

    /// frame rate in Hz, overrides the config
    #[arg(long)]
    frame_rate: Option<f64>,

    /// nearest neighbor ratio for descriptor matching, 0 disables the ratio test
    #[arg(long, default_value = "0.8")]
    ratio: f32,

    #[arg(short, long, default_value = "ttc_report.json")]
    output: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = TtcCli::parse();

    let mut config: FusionConfig = match &cli.config {
        Some(p) => object_from_json(p)?,
        None => FusionConfig::default(),
    };
    if let Some(frame_rate) = cli.frame_rate {
        config.frame_rate = frame_rate;
    }
    config.validate()?;
    let calibration: Calibration = match &cli.calibration {
        Some(p) => object_from_json(p)?,
        None => Calibration::kitti(),
    };
    let selector = if cli.ratio > 0.0 {
        MatchSelector::KnnRatio { ratio: cli.ratio }
    } else {
        MatchSelector::NearestNeighbor
    };
    let matcher = BruteForceMatcher::new(selector);

    let frames = load_frames(&cli.path)?;
    log::info!("loaded {} frames from {}", frames.len(), cli.path);
    let now = Instant::now();
    let results = process_sequence(&frames, &matcher, &calibration, &config)?;
    let duration_sec = now.elapsed().as_secs_f64();
    log::info!("processing took {:.6} sec", duration_sec);

    let report = SequenceReport::new(&config, results)?;
    for pair in &report.pairs {
        for r in &pair.regions {
            println!(
                "frames {:>4} -> {:>4}  box {:>3} -> {:>3}  lidar {:>8.3} s  camera {:>8.3} s  ({} pts, {} matches)",
                pair.prev_index,
                pair.curr_index,
                r.prev_id,
                r.curr_id,
                r.lidar.as_f64(),
                r.camera.as_f64(),
                r.summary.num_points,
                r.accepted_correspondences.len()
            );
        }
    }
    for failed in &report.failed_pairs {
        log::warn!("pair {} failed: {}", failed.pair, failed.error);
    }
    write_report(&cli.output, &report)?;
    log::info!("report written to {}", cli.output);
    Ok(())
}
