use serde::{Deserialize, Serialize};

use crate::error::{PeakScanError, Result};

/// Feature used to pick the peak from an averaged line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feature {
    /// Global maximum above the threshold.
    #[default]
    MaxValue,
}

impl Feature {
    /// Locate the peak of `line` according to this feature.
    pub fn locate(self, line: &[f64], threshold: f64) -> Option<usize> {
        match self {
            Self::MaxValue => find_max_value_position(line, threshold),
        }
    }

    /// Integer discriminant used by the persisted settings.
    pub fn to_index(self) -> i64 {
        match self {
            Self::MaxValue => 0,
        }
    }

    pub fn from_index(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Self::MaxValue),
            _ => Err(PeakScanError::UnknownVariant {
                kind: "feature",
                value,
            }),
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MaxValue => write!(f, "Max Value"),
        }
    }
}

/// Position of the largest value above `threshold`.
///
/// `line[0]` only seeds the running maximum: it is never compared against
/// the threshold and is never returned. A later value must beat both the
/// threshold and the running maximum, so the leftmost of equal maxima wins.
pub fn find_max_value_position(line: &[f64], threshold: f64) -> Option<usize> {
    let (&first, rest) = line.split_first()?;

    let mut max = first;
    let mut best = None;
    for (offset, &value) in rest.iter().enumerate() {
        if value > threshold && value > max {
            max = value;
            best = Some(offset + 1);
        }
    }
    best
}

/// Integer form of a peak result, -1 meaning "no peak".
pub fn peak_to_sentinel(peak: Option<usize>) -> i64 {
    peak.map_or(-1, |index| index as i64)
}

/// Human-readable peak value for a status display.
pub fn describe_peak(peak: Option<usize>) -> String {
    match peak {
        Some(index) => index.to_string(),
        None => "No peak detected".to_string(),
    }
}
