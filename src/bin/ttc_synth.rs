use clap::{Parser, Subcommand};
use std::path::Path;
use ttc_fusion::calibration::Calibration;
use ttc_fusion::io::{object_from_json, object_to_json, save_frames};
use ttc_fusion::synthetic::{SceneConfig, generate_sequence};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic approaching vehicle sequence
    Generate {
        /// Output directory
        #[arg(short, long)]
        output: String,

        /// Scene configuration JSON
        #[arg(short, long)]
        scene: Option<String>,

        /// Number of frames to generate, overrides the scene config
        #[arg(short, long)]
        num_frames: Option<usize>,

        /// Random seed, overrides the scene config
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::Generate {
            output,
            scene,
            num_frames,
            seed,
        } => {
            let mut scene: SceneConfig = match scene {
                Some(p) => object_from_json(&p)?,
                None => SceneConfig::default(),
            };
            if let Some(n) = num_frames {
                scene.num_frames = n;
            }
            if let Some(s) = seed {
                scene.seed = s;
            }
            let calibration = Calibration::pinhole(721.5377, 609.5593, 172.854);
            let sequence = generate_sequence(&scene, &calibration)?;

            let root = Path::new(&output);
            save_frames(&root.join("frames").to_string_lossy(), &sequence.frames)?;
            object_to_json(
                &root.join("calibration.json").to_string_lossy(),
                &sequence.calibration,
            )?;
            object_to_json(
                &root.join("ground_truth_ttc.json").to_string_lossy(),
                &sequence.ground_truth_ttc,
            )?;
            println!("Generated {} frames in {}", sequence.frames.len(), output);
        }
    }
    Ok(())
}
