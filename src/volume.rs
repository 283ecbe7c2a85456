//! Pulling single 3D volumes out of 4D series.

use ndarray::prelude::*;
use ndarray::{ArrayD, Ix3};

use crate::common::Vol3D;
use crate::error::{Result, ShiftError};

/// Takes the volume at `index` along the last axis of a 4D image.
///
/// A 3D image is treated as a series holding a single volume, so only
/// `index == 0` is valid for it. The returned volume's shape is the first
/// three dimensions of `img`.
pub fn extract_volume(img: &ArrayD<f64>, index: usize) -> Result<Vol3D> {
    match img.ndim() {
        4 => {
            let len = img.shape()[3];
            if index >= len {
                return Err(ShiftError::VolumeIndex { index, len });
            }
            let vol = img.index_axis(Axis(3), index);
            // enforce 3D
            let vol = vol.into_dimensionality::<Ix3>()?.to_owned();
            Ok(Vol3D::new(vol, index))
        }
        3 => {
            if index != 0 {
                return Err(ShiftError::VolumeIndex { index, len: 1 });
            }
            let vol = img.view().into_dimensionality::<Ix3>()?.to_owned();
            Ok(Vol3D::new(vol, index))
        }
        n => Err(ShiftError::Dimensionality {
            expected: "3D or 4D".to_string(),
            actual: n,
        }),
    }
}

/// Number of volumes in the series, 1 for a 3D image.
pub fn volume_count(img: &ArrayD<f64>) -> usize {
    match img.ndim() {
        4 => img.shape()[3],
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    fn series(shape: &[usize]) -> ArrayD<f64> {
        let len: usize = shape.iter().product();
        Array::from_shape_vec(IxDyn(shape), (0..len).map(|v| v as f64).collect()).unwrap()
    }

    #[test]
    fn extracts_last_axis() {
        let img = series(&[4, 5, 6, 12]);
        let vol = extract_volume(&img, 9).unwrap();
        assert_eq!(vol.index, 9);
        assert_eq!(vol.vol.shape(), &[4, 5, 6]);
        for ((i, j, k), v) in vol.vol.indexed_iter() {
            assert_eq!(*v, img[[i, j, k, 9]]);
        }
    }

    #[test]
    fn index_out_of_range() {
        let img = series(&[2, 2, 2, 3]);
        match extract_volume(&img, 3) {
            Err(ShiftError::VolumeIndex { index: 3, len: 3 }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn plain_volume() {
        let img = series(&[2, 3, 4]);
        let vol = extract_volume(&img, 0).unwrap();
        assert_eq!(vol.vol.shape(), &[2, 3, 4]);
        assert!(extract_volume(&img, 1).is_err());
        assert_eq!(volume_count(&img), 1);
    }

    #[test]
    fn rejects_2d() {
        let img = series(&[5, 5]);
        assert!(matches!(
            extract_volume(&img, 0),
            Err(ShiftError::Dimensionality { actual: 2, .. })
        ));
    }
}
