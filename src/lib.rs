pub mod association;
pub mod calibration;
pub mod config;
pub mod error;
pub mod filter;
pub mod io;
pub mod matching;
pub mod pipeline;
pub mod projector;
pub mod stats;
pub mod summary;
pub mod synthetic;
pub mod ttc;
pub mod types;

pub use association::{BoxAssociationMap, associate_bounding_boxes};
pub use calibration::Calibration;
pub use config::FusionConfig;
pub use error::{FusionError, StatsError};
pub use filter::filter_region_correspondences;
pub use projector::assign_points_to_regions;
pub use ttc::{TtcEstimate, estimate_ttc_from_keypoints, estimate_ttc_from_range};
pub use types::*;
