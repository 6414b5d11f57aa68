//! Temporal map of a dense time series.
//!
//! Rows of the matrix are sampled at regular intervals: sample `i` sits at
//! `(start + i * step) * 10^exponent` in `unit`.

use std::fmt;
use std::str::FromStr;

use crate::util::Error;

/// Unit of the series axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SeriesUnit {
    #[default]
    Second,
    Hertz,
    Meter,
    Radian,
}

impl SeriesUnit {
    /// Name used in the CIFTI XML `SeriesUnit` attribute.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Second => "SECOND",
            Self::Hertz => "HERTZ",
            Self::Meter => "METER",
            Self::Radian => "RADIAN",
        }
    }
}

impl fmt::Display for SeriesUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeriesUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "SECOND" => Ok(Self::Second),
            "HERTZ" => Ok(Self::Hertz),
            "METER" => Ok(Self::Meter),
            "RADIAN" => Ok(Self::Radian),
            other => Err(Error::invalid(format!("unknown SeriesUnit '{}'", other))),
        }
    }
}

/// Linear series description (CIFTI_INDEX_TYPE_SERIES).
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesMap {
    /// Number of samples (rows of the matrix).
    pub num_points: usize,
    /// Power of ten applied to `start` and `step`.
    pub exponent: i32,
    /// Value of the first sample.
    pub start: f64,
    /// Distance between consecutive samples.
    pub step: f64,
    pub unit: SeriesUnit,
}

impl SeriesMap {
    /// Time series in seconds starting at 0 with the given repetition time.
    pub fn seconds(num_points: usize, repetition_time: f64) -> Self {
        Self {
            num_points,
            exponent: 0,
            start: 0.0,
            step: repetition_time,
            unit: SeriesUnit::Second,
        }
    }

    /// Position of sample `index` in `unit`, exponent applied.
    pub fn sample_time(&self, index: usize) -> f64 {
        (self.start + index as f64 * self.step) * 10f64.powi(self.exponent)
    }

    /// Total span covered by the samples.
    pub fn duration(&self) -> f64 {
        self.num_points as f64 * self.step * 10f64.powi(self.exponent)
    }
}
