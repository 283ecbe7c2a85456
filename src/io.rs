//! Loading and saving nifti images.
//!
//! Outputs reuse the header of the image they were derived from, so voxel
//! sizes and orientation survive the round trip.

use std::path::Path;

use log::{debug, warn};
use nalgebra::Matrix4;
use ndarray::{ArrayBase, ArrayD, Data, Dimension, RemoveAxis};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::error::Result;

/// Bits of `xyzt_units` holding the temporal unit.
const TIME_UNITS_MASK: u8 = 0x38;

/// An image loaded into memory: scaled intensities plus the header they came with.
#[derive(Debug, Clone)]
pub struct Image {
    pub data: ArrayD<f64>,
    pub header: NiftiHeader,
}

/// What to do with header fields that stop describing the data once a volume
/// is taken out of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum HeaderPolicy {
    /// Keep every field of the source header except the ones the writer has
    /// to set for the new data.
    #[default]
    Reuse,
    /// Also reset time-related fields for the lower dimensionality.
    Fit,
}

pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Image> {
    let path = path.as_ref();
    let obj = ReaderOptions::new().read_file(path)?;
    let header = obj.header().clone();
    let data = obj.into_volume().into_ndarray::<f64>()?;
    debug!("loaded {} with shape {:?}", path.display(), data.shape());
    Ok(Image { data, header })
}

/// Builds the header written alongside data of the given shape.
///
/// The data handed to the writer is already scaled, so the scaling pair is
/// reset to identity.
pub fn output_header(
    header: &NiftiHeader,
    shape: &[usize],
    policy: HeaderPolicy,
) -> NiftiHeader {
    let mut out = header.clone();
    let mut dim = [1u16; 8];
    dim[0] = shape.len() as u16;
    for (d, &s) in dim[1..].iter_mut().zip(shape) {
        *d = s as u16;
    }
    out.dim = dim;
    out.scl_slope = 1.0;
    out.scl_inter = 0.0;

    if policy == HeaderPolicy::Fit {
        for p in out.pixdim[shape.len() + 1..].iter_mut() {
            *p = 1.0;
        }
        if shape.len() < 4 {
            out.xyzt_units &= !TIME_UNITS_MASK;
            out.toffset = 0.0;
            out.slice_duration = 0.0;
            out.slice_start = 0;
            out.slice_end = 0;
            out.slice_code = 0;
        }
    } else if header.dim[0] as usize != shape.len() {
        warn!(
            "reusing a {}D header for {}D data",
            header.dim[0],
            shape.len()
        );
    }
    out
}

/// Writes `data` as a nifti file, taking metadata from `header`.
pub fn save_image<P, S, D>(
    path: P,
    data: &ArrayBase<S, D>,
    header: &NiftiHeader,
    policy: HeaderPolicy,
) -> Result<()>
where
    P: AsRef<Path>,
    S: Data<Elem = f64>,
    D: Dimension + RemoveAxis,
{
    let path = path.as_ref();
    let out_header = output_header(header, data.shape(), policy);
    WriterOptions::new(path)
        .reference_header(&out_header)
        .write_nifti(data)?;
    debug!("wrote {} with shape {:?}", path.display(), data.shape());
    Ok(())
}

/// Voxel to world transform of the header (sform, qform or plain voxel sizes).
pub fn affine(header: &NiftiHeader) -> Matrix4<f64> {
    header.affine::<f64>()
}
