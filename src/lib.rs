//! Extract a single volume from a nifti time series and translate it by a
//! voxel offset using spline interpolation.
//!
//! The default [`pipeline::PipelineConfig`] fetches `ds108_sub001_t1r1.nii`,
//! takes volume 9, writes it to `unshifted_vol.nii`, shifts it by
//! `[-3, 5, 2]` and writes the result to `shifted_vol.nii`.

pub mod common;
pub mod error;
pub mod fetch;
pub mod io;
pub mod pipeline;
pub mod shift;
pub mod volume;

pub use common::{Offsets, Vol3D};
pub use error::{Result, ShiftError};
