//! The fetch, extract, shift and save sequence.

use std::fs;
use std::path::PathBuf;

use log::{debug, info};

use crate::common::Offsets;
use crate::error::Result;
use crate::fetch::{DataFetcher, FetchConfig};
use crate::io::{self, HeaderPolicy};
use crate::shift::{self, ShiftOptions};
use crate::volume;

pub const DEFAULT_DATA_FILE: &str = "ds108_sub001_t1r1.nii";
pub const DEFAULT_VOLUME_INDEX: usize = 9;
pub const DEFAULT_UNSHIFTED_NAME: &str = "unshifted_vol.nii";
pub const DEFAULT_SHIFTED_NAME: &str = "shifted_vol.nii";

/// Where the input image comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// A registered data file, fetched into the data directory.
    Registered { name: String, fetch: FetchConfig },
    /// A file already on disk.
    Local(PathBuf),
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source: Source,
    pub volume_index: usize,
    pub offsets: Offsets,
    pub shift_options: ShiftOptions,
    pub output_dir: PathBuf,
    pub unshifted_name: String,
    pub shifted_name: String,
    pub header_policy: HeaderPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: Source::Registered {
                name: DEFAULT_DATA_FILE.to_string(),
                fetch: FetchConfig::default(),
            },
            volume_index: DEFAULT_VOLUME_INDEX,
            offsets: Offsets::default(),
            shift_options: ShiftOptions::default(),
            output_dir: PathBuf::from("."),
            unshifted_name: DEFAULT_UNSHIFTED_NAME.to_string(),
            shifted_name: DEFAULT_SHIFTED_NAME.to_string(),
            header_policy: HeaderPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutputs {
    pub input: PathBuf,
    pub unshifted: PathBuf,
    pub shifted: PathBuf,
}

/// Runs the whole sequence, stopping at the first failure.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutputs> {
    let input = match &config.source {
        Source::Registered { name, fetch } => DataFetcher::new(fetch.clone()).fetch_file(name)?,
        Source::Local(path) => path.clone(),
    };
    info!("Input: {}", input.display());

    let image = io::load_image(&input)?;
    info!("Dims: {:?}", image.data.shape());
    debug!("Affine: {}", io::affine(&image.header));

    let vol = volume::extract_volume(&image.data, config.volume_index)?;
    info!(
        "Extracted volume {} of {} with shape {:?}",
        vol.index,
        volume::volume_count(&image.data),
        vol.vol.shape()
    );

    fs::create_dir_all(&config.output_dir)?;
    let unshifted = config.output_dir.join(&config.unshifted_name);
    io::save_image(&unshifted, &vol.vol, &image.header, config.header_policy)?;
    info!("Output: {}", unshifted.display());

    info!("Shifting by {} voxels", config.offsets);
    let shifted_vol = shift::shift(&vol.vol, &config.offsets, &config.shift_options)?;

    let shifted = config.output_dir.join(&config.shifted_name);
    io::save_image(&shifted, &shifted_vol, &image.header, config.header_policy)?;
    info!("Output: {}", shifted.display());

    Ok(PipelineOutputs {
        input,
        unshifted,
        shifted,
    })
}
