//! Quick commandline utility to take one volume out of a 4D nifti file and shift it.
//!
//! Run without arguments it fetches `ds108_sub001_t1r1.nii`, saves volume 9 as
//! `unshifted_vol.nii` and a copy translated by `[-3, 5, 2]` voxels as
//! `shifted_vol.nii` in the current directory.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use log::{error, info};

use shiftnii::common::Offsets;
use shiftnii::fetch::{FetchConfig, DEFAULT_BASE_URL, DEFAULT_DATA_DIR};
use shiftnii::io::HeaderPolicy;
use shiftnii::pipeline::{
    self, PipelineConfig, Source, DEFAULT_DATA_FILE, DEFAULT_SHIFTED_NAME,
    DEFAULT_UNSHIFTED_NAME, DEFAULT_VOLUME_INDEX,
};
use shiftnii::shift::{BoundaryMode, ShiftOptions, SplineOrder};

// use clap to create commandline interface
#[derive(Parser, Debug)]
#[command(author, about, version, long_about)]
struct Args {
    /// name of the registered data file to fetch
    #[arg(short, long, default_value = DEFAULT_DATA_FILE)]
    name: String,

    /// a local nifti file to use instead of fetching one
    #[arg(short, long, conflicts_with = "name")]
    input: Option<PathBuf>,

    /// index of the volume along the last (time) axis
    #[arg(short, long, default_value_t = DEFAULT_VOLUME_INDEX)]
    volume: usize,

    /// shift in voxels, one value per axis
    #[arg(short, long, default_value = "-3,5,2", allow_hyphen_values = true)]
    shift: Offsets,

    /// spline order used for interpolation: 0, 1 or 3
    #[arg(long, value_enum, default_value_t = SplineOrder::Cubic)]
    order: SplineOrder,

    /// how points outside the volume are filled
    #[arg(long, value_enum, default_value_t = BoundaryMode::Constant)]
    mode: BoundaryMode,

    /// fill value for the constant mode
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    cval: f64,

    /// directory the two output files are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_UNSHIFTED_NAME)]
    unshifted_name: String,

    #[arg(long, default_value = DEFAULT_SHIFTED_NAME)]
    shifted_name: String,

    /// reuse the input header as is, or fit its time fields to the 3D output
    #[arg(long, value_enum, default_value_t = HeaderPolicy::Reuse)]
    header_policy: HeaderPolicy,

    /// directory fetched data files are kept in
    #[arg(long, env = "SHIFTNII_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// where data files are downloaded from
    #[arg(long, env = "SHIFTNII_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// download the data file again even if it is cached
    #[arg(short, long)]
    force: bool,
}

impl Args {
    fn into_config(self) -> PipelineConfig {
        let source = match self.input {
            Some(path) => Source::Local(path),
            None => Source::Registered {
                name: self.name,
                fetch: FetchConfig {
                    data_dir: self.data_dir,
                    base_url: self.base_url,
                    force: self.force,
                },
            },
        };
        PipelineConfig {
            source,
            volume_index: self.volume,
            offsets: self.shift,
            shift_options: ShiftOptions {
                order: self.order,
                mode: self.mode,
                cval: self.cval,
            },
            output_dir: self.output_dir,
            unshifted_name: self.unshifted_name,
            shifted_name: self.shifted_name,
            header_policy: self.header_policy,
        }
    }
}

fn main() -> Result<(), Box<dyn Error + Sync + Send>> {
    let env = env_logger::Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    let config = Args::parse().into_config();
    match pipeline::run(&config) {
        Ok(outputs) => {
            info!(
                "Wrote {} and {}",
                outputs.unshifted.display(),
                outputs.shifted.display()
            );
            Ok(())
        }
        Err(e) => {
            error!("Error! {}", e);
            Err(e.into())
        }
    }
}
