//! Translating arrays by (possibly fractional) voxel offsets.
//!
//! The output is sampled from a B-spline interpolant of the input:
//! `output[x] = f(x - offsets)`. For cubic splines the input is first turned
//! into spline coefficients with a recursive prefilter, so the interpolant
//! passes through the original samples and integer shifts move values
//! without blurring them.
//!
//! Both the prefilter and the resampling are separable, so each axis is
//! prefiltered and resampled in turn along its lanes. The prefilter boundary
//! and the way taps past the edges are read both follow the `BoundaryMode`.
//! Points that fall outside the input in `Constant` mode are filled with
//! `cval` once all axes are done.

use log::debug;
use ndarray::{Array, ArrayBase, Axis, Data, Dimension, Slice, Zip};

use crate::common::Offsets;
use crate::error::{Result, ShiftError};

/// Pole of the cubic B-spline prefilter, `sqrt(3) - 2`.
const CUBIC_POLE: f64 = -0.267_949_192_431_122_7;
/// Truncation tolerance of the causal initialisation sum.
const PREFILTER_TOLERANCE: f64 = 1e-12;
/// Slack allowed when deciding whether a sample lies inside the input.
const EDGE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SplineOrder {
    /// Nearest neighbour
    #[value(name = "0", alias = "nearest")]
    Nearest,
    #[value(name = "1", alias = "linear")]
    Linear,
    #[default]
    #[value(name = "3", alias = "cubic")]
    Cubic,
}

/// How samples beyond the edges of the input are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BoundaryMode {
    /// Points outside `[0, n - 1]` take the constant value.
    #[default]
    Constant,
    /// Edge samples repeat: `a a a | a b c d | d d d`.
    Nearest,
    /// Whole-sample symmetric: `d c b | a b c d | c b a`.
    Mirror,
    /// Half-sample symmetric: `c b a | a b c d | d c b`.
    Reflect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftOptions {
    pub order: SplineOrder,
    pub mode: BoundaryMode,
    /// Fill value for `BoundaryMode::Constant`.
    pub cval: f64,
}

impl Default for ShiftOptions {
    fn default() -> Self {
        Self {
            order: SplineOrder::Cubic,
            mode: BoundaryMode::Constant,
            cval: 0.0,
        }
    }
}

/// Shifts `input` by `offsets` voxels along each axis.
///
/// The result has the same shape as the input. `offsets` must have one entry
/// per axis.
pub fn shift<S, D>(
    input: &ArrayBase<S, D>,
    offsets: &Offsets,
    options: &ShiftOptions,
) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if offsets.len() != input.ndim() {
        return Err(ShiftError::OffsetLength {
            offsets: offsets.len(),
            ndim: input.ndim(),
        });
    }
    if input.is_empty() {
        return Ok(input.to_owned());
    }
    debug!(
        "shifting {:?} by {} with {:?}",
        input.shape(),
        offsets,
        options
    );

    let mut current = input.to_owned();
    let mut outside = Vec::with_capacity(input.ndim());
    let mut coeffs = Vec::new();
    for (ax, &offset) in offsets.as_slice().iter().enumerate() {
        let n = input.shape()[ax];
        let (plan, out_of_range) = sampling_plan(n, offset, options);
        let mut next = Array::<f64, D>::zeros(current.raw_dim());
        Zip::from(next.lanes_mut(Axis(ax)))
            .and(current.lanes(Axis(ax)))
            .for_each(|mut out, samples| {
                let samples = samples.iter().copied();
                lane_coefficients(samples, options.order, options.mode, &mut coeffs);
                for (o, taps) in out.iter_mut().zip(&plan) {
                    *o = taps.iter().map(|&(j, w)| w * coeffs[j]).sum();
                }
            });
        current = next;
        outside.push(out_of_range);
    }

    if options.mode == BoundaryMode::Constant {
        for (ax, out_of_range) in outside.iter().enumerate() {
            for (i, &out) in out_of_range.iter().enumerate() {
                if out {
                    current
                        .slice_axis_mut(Axis(ax), Slice::from(i..i + 1))
                        .fill(options.cval);
                }
            }
        }
    }
    Ok(current)
}

/// Converts samples to interpolation coefficients for the given order, with
/// the signal extended past the edges according to `mode`.
///
/// Nearest and linear interpolation work on the samples directly, so only
/// cubic splines change the data.
pub fn spline_filter<S, D>(
    input: &ArrayBase<S, D>,
    order: SplineOrder,
    mode: BoundaryMode,
) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let mut coeffs = input.to_owned();
    if order != SplineOrder::Cubic {
        return coeffs;
    }
    let pad = edge_padding(order, mode);
    let mut buf = Vec::new();
    for ax in 0..coeffs.ndim() {
        for mut lane in coeffs.lanes_mut(Axis(ax)) {
            lane_coefficients(lane.iter().copied(), order, mode, &mut buf);
            for (dst, src) in lane.iter_mut().zip(buf.iter().skip(pad)) {
                *dst = *src;
            }
        }
    }
    coeffs
}

/// Fills `buf` with the coefficients of one lane.
///
/// In cubic `Nearest` mode the lane is padded with `edge_padding` copies of
/// its edge samples on each side first, so `buf` is longer than the lane.
fn lane_coefficients(
    samples: impl Iterator<Item = f64>,
    order: SplineOrder,
    mode: BoundaryMode,
    buf: &mut Vec<f64>,
) {
    buf.clear();
    buf.extend(samples);
    if order != SplineOrder::Cubic || buf.is_empty() {
        return;
    }
    let pad = edge_padding(order, mode);
    if pad > 0 {
        let n = buf.len();
        let (first, last) = (buf[0], buf[n - 1]);
        buf.resize(n + 2 * pad, last);
        buf.copy_within(0..n, pad);
        buf[..pad].fill(first);
    }
    prefilter_cubic(buf, mode);
}

/// Samples of edge padding on each side of a lane.
///
/// Edge replication has no closed-form initialisation for the recursive
/// filter, so the lane is padded far enough that the mirror boundary of the
/// padded lane no longer reaches the original samples.
fn edge_padding(order: SplineOrder, mode: BoundaryMode) -> usize {
    if order == SplineOrder::Cubic && mode == BoundaryMode::Nearest {
        horizon(CUBIC_POLE)
    } else {
        0
    }
}

/// Number of terms after which powers of `z` drop below the tolerance.
fn horizon(z: f64) -> usize {
    (PREFILTER_TOLERANCE.ln() / z.abs().ln()).ceil() as usize
}

/// In-place cubic B-spline prefilter.
///
/// `Reflect` uses half-sample symmetric boundaries, every other mode whole
/// sample symmetric ones.
fn prefilter_cubic(c: &mut [f64], mode: BoundaryMode) {
    let n = c.len();
    if n < 2 {
        return;
    }
    let z = CUBIC_POLE;
    let gain = (1.0 - z) * (1.0 - 1.0 / z);
    for v in c.iter_mut() {
        *v *= gain;
    }
    let half_sample = mode == BoundaryMode::Reflect;
    c[0] = if half_sample {
        causal_init_reflect(c, z)
    } else {
        causal_init_mirror(c, z)
    };
    for k in 1..n {
        c[k] += z * c[k - 1];
    }
    c[n - 1] = if half_sample {
        c[n - 1] * z / (z - 1.0)
    } else {
        (z / (z * z - 1.0)) * (z * c[n - 2] + c[n - 1])
    };
    for k in (0..n - 1).rev() {
        c[k] = z * (c[k + 1] - c[k]);
    }
}

fn causal_init_mirror(c: &[f64], z: f64) -> f64 {
    let n = c.len();
    let horizon = horizon(z);
    if horizon < n {
        // truncated sum, the remaining terms are below tolerance
        let mut zn = z;
        let mut sum = c[0];
        for &v in &c[1..horizon] {
            sum += zn * v;
            zn *= z;
        }
        sum
    } else {
        let iz = 1.0 / z;
        let mut zn = z;
        let mut z2n = z.powi(n as i32 - 1);
        let mut sum = c[0] + z2n * c[n - 1];
        z2n *= z2n * iz;
        for &v in &c[1..n - 1] {
            sum += (zn + z2n) * v;
            zn *= z;
            z2n *= iz;
        }
        sum / (1.0 - zn * zn)
    }
}

/// Causal start value for a signal extended as `c b a | a b c`.
fn causal_init_reflect(c: &[f64], z: f64) -> f64 {
    let n = c.len();
    let horizon = horizon(z);
    let mut zi = z;
    if horizon < n {
        let mut sum = c[0];
        for &v in &c[..horizon] {
            sum += zi * v;
            zi *= z;
        }
        sum
    } else {
        // one full period of the extension, summed in closed form
        let zn = z.powi(n as i32);
        let mut sum = c[0] + zn * c[n - 1];
        for i in 1..n {
            sum += zi * (c[i] + zn * c[n - 1 - i]);
            zi *= z;
        }
        c[0] + sum * z / (1.0 - zn * zn)
    }
}

/// For each output index along an axis of length `n`, the coefficient taps
/// `(index, weight)` to combine, plus whether the sample lies outside the
/// input in constant mode.
///
/// Tap indices point into the coefficients built by `lane_coefficients`.
fn sampling_plan(
    n: usize,
    offset: f64,
    options: &ShiftOptions,
) -> (Vec<Vec<(usize, f64)>>, Vec<bool>) {
    let last = (n - 1) as f64;
    let pad = edge_padding(options.order, options.mode);
    let mut plan = Vec::with_capacity(n);
    let mut outside = vec![false; n];
    for (i, out) in outside.iter_mut().enumerate() {
        let x = i as f64 - offset;
        let x = match options.mode {
            BoundaryMode::Constant => {
                if x < -EDGE_TOLERANCE || x > last + EDGE_TOLERANCE {
                    *out = true;
                    plan.push(Vec::new());
                    continue;
                }
                x.clamp(0.0, last)
            }
            // the padded lane is flat beyond its first sample
            BoundaryMode::Nearest => x.clamp(-(pad as f64), last + pad as f64),
            BoundaryMode::Mirror => fold_mirror(x, n),
            BoundaryMode::Reflect => fold_reflect(x, n),
        };
        let lane_taps = taps(x, options.order)
            .into_iter()
            .map(|(j, w)| (coefficient_index(j, n, pad, options.mode), w))
            .collect();
        plan.push(lane_taps);
    }
    (plan, outside)
}

/// Sample positions `(j, weight)` around `x`, possibly outside the lane.
fn taps(x: f64, order: SplineOrder) -> Vec<(isize, f64)> {
    let base = x.floor();
    let t = x - base;
    let i0 = base as isize;
    match order {
        SplineOrder::Nearest => vec![((x + 0.5).floor() as isize, 1.0)],
        SplineOrder::Linear => vec![(i0, 1.0 - t), (i0 + 1, t)],
        SplineOrder::Cubic => {
            let weights = cubic_weights(t);
            (0..4).map(|k| (i0 - 1 + k as isize, weights[k])).collect()
        }
    }
}

/// Where sample position `j` of a lane of length `n` is read from.
fn coefficient_index(j: isize, n: usize, pad: usize, mode: BoundaryMode) -> usize {
    match mode {
        BoundaryMode::Constant | BoundaryMode::Mirror => mirror_index(j, n),
        BoundaryMode::Reflect => reflect_index(j, n),
        BoundaryMode::Nearest => {
            let len = (n + 2 * pad) as isize;
            (j + pad as isize).clamp(0, len - 1) as usize
        }
    }
}

/// Cubic B-spline weights for the four coefficients around `floor(x)`,
/// with `t = x - floor(x)`.
fn cubic_weights(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    let u = 1.0 - t;
    [
        u * u * u / 6.0,
        (4.0 - 6.0 * t2 + 3.0 * t3) / 6.0,
        (1.0 + 3.0 * t + 3.0 * t2 - 3.0 * t3) / 6.0,
        t3 / 6.0,
    ]
}

fn mirror_index(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let r = i.rem_euclid(period);
    if r >= n as isize {
        (period - r) as usize
    } else {
        r as usize
    }
}

fn reflect_index(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let r = i.rem_euclid(period);
    if r >= n as isize {
        (period - 1 - r) as usize
    } else {
        r as usize
    }
}

fn fold_mirror(x: f64, n: usize) -> f64 {
    if n == 1 {
        return 0.0;
    }
    let last = (n - 1) as f64;
    let r = x.rem_euclid(2.0 * last);
    if r > last {
        2.0 * last - r
    } else {
        r
    }
}

/// Folds `x` into `[-0.5, n - 0.5]`, the half-sample symmetric period.
fn fold_reflect(x: f64, n: usize) -> f64 {
    let len = n as f64;
    let r = (x + 0.5).rem_euclid(2.0 * len);
    let r = if r > len { 2.0 * len - r } else { r };
    r - 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array1, Array3};

    fn ramp(n: usize) -> Array1<f64> {
        Array1::from_iter((0..n).map(|v| (v * v) as f64 * 0.5 + 1.0))
    }

    #[test]
    fn cubic_coefficients_reproduce_samples() {
        let samples = vec![3.0, -1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        let mut c = samples.clone();
        prefilter_cubic(&mut c, BoundaryMode::Mirror);
        let n = c.len();
        for i in 0..n {
            let left = c[mirror_index(i as isize - 1, n)];
            let right = c[mirror_index(i as isize + 1, n)];
            let value = (left + 4.0 * c[i] + right) / 6.0;
            assert!(
                (value - samples[i]).abs() < 1e-10,
                "sample {i}: {value} != {}",
                samples[i]
            );
        }
    }

    #[test]
    fn half_sample_coefficients_reproduce_samples() {
        for len in [2, 5, 8, 40] {
            let samples: Vec<f64> = (0..len).map(|v| ((v * 7) % 5) as f64 - 1.5).collect();
            let mut c = samples.clone();
            prefilter_cubic(&mut c, BoundaryMode::Reflect);
            for i in 0..len {
                let left = c[reflect_index(i as isize - 1, len)];
                let right = c[reflect_index(i as isize + 1, len)];
                let value = (left + 4.0 * c[i] + right) / 6.0;
                assert!(
                    (value - samples[i]).abs() < 1e-10,
                    "length {len}, sample {i}: {value} != {}",
                    samples[i]
                );
            }
        }
    }

    #[test]
    fn padded_lane_keeps_samples() {
        let mut buf = Vec::new();
        let samples = [2.0, -1.0, 3.0, 0.5];
        lane_coefficients(
            samples.iter().copied(),
            SplineOrder::Cubic,
            BoundaryMode::Nearest,
            &mut buf,
        );
        let pad = edge_padding(SplineOrder::Cubic, BoundaryMode::Nearest);
        assert_eq!(buf.len(), samples.len() + 2 * pad);
        for (i, expected) in samples.iter().enumerate() {
            let k = i + pad;
            let value = (buf[k - 1] + 4.0 * buf[k] + buf[k + 1]) / 6.0;
            assert!((value - expected).abs() < 1e-10);
        }
        // far out in the padding the spline is flat
        assert!((buf[0] - 2.0).abs() < 1e-9);
        assert!((buf[buf.len() - 1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn long_lanes_use_truncated_init() {
        let samples: Vec<f64> = (0..64).map(|v| (v as f64 * 0.3).sin()).collect();
        let mut c = samples.clone();
        prefilter_cubic(&mut c, BoundaryMode::Mirror);
        for i in 1..63 {
            let value = (c[i - 1] + 4.0 * c[i] + c[i + 1]) / 6.0;
            assert!((value - samples[i]).abs() < 1e-10);
        }
    }

    #[test]
    fn weights_partition_unity() {
        for t in [0.0, 0.1, 0.5, 0.77, 0.999] {
            let sum: f64 = cubic_weights(t).iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn mirror_folding() {
        let n = 4;
        let folded: Vec<usize> = (-3..8).map(|i| mirror_index(i, n)).collect();
        assert_eq!(folded, vec![3, 2, 1, 0, 1, 2, 3, 2, 1, 0, 1]);
        assert_eq!(mirror_index(-5, 1), 0);
        assert!((fold_mirror(-1.5, 4) - 1.5).abs() < 1e-12);
        assert!((fold_mirror(4.0, 4) - 2.0).abs() < 1e-12);
        assert!((fold_reflect(-1.0, 4) - 0.0).abs() < 1e-12);
        assert!((fold_reflect(5.0, 4) - 2.0).abs() < 1e-12);
        assert!((fold_reflect(-0.75, 4) + 0.25).abs() < 1e-12);
        assert!((fold_reflect(-1.25, 4) - 0.25).abs() < 1e-12);
        let folded: Vec<usize> = (-3..8).map(|i| reflect_index(i, n)).collect();
        assert_eq!(folded, vec![2, 1, 0, 0, 1, 2, 3, 3, 2, 1, 0]);
    }

    #[test]
    fn integer_shift_moves_samples() {
        let input = ramp(10);
        let out = shift(&input, &Offsets::new([2.0]), &ShiftOptions::default()).unwrap();
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.0);
        for i in 2..10 {
            assert!((out[i] - input[i - 2]).abs() < 1e-9, "index {i}");
        }
    }

    #[test]
    fn linear_half_voxel() {
        let input = arr1(&[0.0, 2.0, 4.0, 6.0]);
        let options = ShiftOptions {
            order: SplineOrder::Linear,
            ..Default::default()
        };
        let out = shift(&input, &Offsets::new([0.5]), &options).unwrap();
        assert_eq!(out[0], 0.0);
        for (i, expected) in [1.0, 3.0, 5.0].into_iter().enumerate() {
            assert!((out[i + 1] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn nearest_mode_repeats_edge() {
        let input = arr1(&[1.0, 2.0, 3.0]);
        let options = ShiftOptions {
            order: SplineOrder::Nearest,
            mode: BoundaryMode::Nearest,
            cval: -1.0,
        };
        let out = shift(&input, &Offsets::new([-2.0]), &options).unwrap();
        assert_eq!(out.to_vec(), vec![3.0, 3.0, 3.0]);
    }

    #[test]
    fn constant_fill_value() {
        let input = Array3::<f64>::ones((3, 3, 3));
        let options = ShiftOptions {
            cval: 7.0,
            ..Default::default()
        };
        let out = shift(&input, &Offsets::new([0.0, 0.0, 1.0]), &options).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(out[[i, j, 0]], 7.0);
                assert!((out[[i, j, 1]] - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn zero_shift_is_identity() {
        let input = Array3::from_shape_fn((4, 5, 6), |(i, j, k)| (i * 31 + j * 7 + k) as f64);
        let out = shift(&input, &Offsets::new([0.0, 0.0, 0.0]), &ShiftOptions::default()).unwrap();
        for (a, b) in input.iter().zip(out.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn wrong_offset_length() {
        let input = Array3::<f64>::zeros((2, 2, 2));
        let err = shift(&input, &Offsets::new([1.0, 2.0]), &ShiftOptions::default());
        assert!(matches!(
            err,
            Err(ShiftError::OffsetLength { offsets: 2, ndim: 3 })
        ));
    }
}
