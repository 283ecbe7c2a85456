use ndarray::Array3;
use std::fmt;
use std::str::FromStr;

use crate::error::ShiftError;

/// One 3D volume taken from a 4D series, with its index along the last axis.
#[derive(Debug, Clone)]
pub struct Vol3D {
    pub vol: Array3<f64>,
    pub index: usize,
}
impl Vol3D {
    pub fn new(vol: Array3<f64>, index: usize) -> Self {
        Self { vol, index }
    }
}

/// Per-axis translation in voxel units.
///
/// Parsed from a comma separated list such as `-3,5,2`. Positive offsets move
/// the image content towards higher indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Offsets(pub Vec<f64>);

impl Offsets {
    pub fn new(offsets: impl Into<Vec<f64>>) -> Self {
        Self(offsets.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// The shift that undoes this one.
    pub fn inverse(&self) -> Self {
        Self(self.0.iter().map(|o| -o).collect())
    }
}

impl Default for Offsets {
    fn default() -> Self {
        Self(vec![-3.0, 5.0, 2.0])
    }
}

impl FromStr for Offsets {
    type Err = ShiftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('[').trim_end_matches(']');
        if trimmed.is_empty() {
            return Err(ShiftError::InvalidArgument(
                "shift needs at least one component".to_string(),
            ));
        }
        let offsets = trimmed
            .split(',')
            .map(|part| {
                let part = part.trim();
                part.parse::<f64>()
                    .ok()
                    .filter(|o| o.is_finite())
                    .ok_or_else(|| {
                        ShiftError::InvalidArgument(format!("not a finite number: {part:?}"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(offsets))
    }
}

impl fmt::Display for Offsets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, o) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{o}")?;
        }
        write!(f, "]")
    }
}
