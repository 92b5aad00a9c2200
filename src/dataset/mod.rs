//! Helpers for multi-file gridded time series.
//!
//! Archived model output is typically split into one file per model run, with
//! runs restarted more often than the span they simulate, so consecutive
//! files overlap in time. These helpers open such a series, clip each file to
//! its own time slot, and concatenate the result into a single monotonic
//! series, with later files overriding earlier ones on any remaining overlap.
//!
//! File paths are derived from the run start times with strftime-style
//! templates:
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use havkit::dataset::expand_template;
//!
//! let times = [Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()];
//! let paths = expand_template("ww3_4km_%Y%m%dT00Z.nc", &times);
//! assert_eq!(paths[0], "ww3_4km_20230101T00Z.nc");
//! ```
//!
//! Reading the files themselves requires the `netcdf` feature; the window and
//! concatenation logic is independent of the storage format. Time is carried
//! as f64 epoch seconds (CF "seconds since 1970-01-01").

use chrono::{DateTime, Utc};
#[cfg(feature = "netcdf")]
use log::debug;
use ndarray::{ArrayD, Axis};
use thiserror::Error;

#[cfg(feature = "netcdf")]
use std::path::Path;

#[cfg(feature = "netcdf")]
use crate::grid::GridDataset;

/// Error type for multi-file dataset operations.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Invalid input or inconsistent file contents
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A required variable is missing from a file
    #[error("missing variable: {0}")]
    MissingVariable(String),

    /// Concatenated time axis is not strictly increasing
    #[error("time axis is not strictly increasing after concatenation")]
    NonMonotonicTime,

    /// NetCDF library error
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),
}

/// Expand a strftime-style path or URL template for each start time.
pub fn expand_template(template: &str, times: &[DateTime<Utc>]) -> Vec<String> {
    times
        .iter()
        .map(|t| t.format(template).to_string())
        .collect()
}

/// Epoch seconds for a UTC instant, including sub-second precision.
pub fn epoch_seconds(t: DateTime<Utc>) -> f64 {
    t.timestamp() as f64 + f64::from(t.timestamp_subsec_nanos()) / 1e9
}

/// Per-file half-open time windows `[tᵢ, tᵢ + step)`, where `step` is the
/// interval between the first two start times.
///
/// Requires at least two start times and a positive interval.
pub fn overlap_windows(
    times: &[DateTime<Utc>],
) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, DatasetError> {
    if times.len() < 2 {
        return Err(DatasetError::InvalidData(
            "need at least two start times to derive the file interval".to_string(),
        ));
    }
    let step = times[1] - times[0];
    if step <= chrono::Duration::zero() {
        return Err(DatasetError::InvalidData(format!(
            "start times must be increasing, got interval {:?}",
            step
        )));
    }

    Ok(times.iter().map(|&t| (t, t + step)).collect())
}

/// A block of time series data: times in epoch seconds and a data array whose
/// first axis is time.
#[derive(Debug, Clone)]
pub struct SeriesBlock {
    /// Time axis, epoch seconds
    pub time: Vec<f64>,
    /// Data, first axis matching `time`
    pub data: ArrayD<f64>,
}

impl SeriesBlock {
    /// Create a block, validating that the first axis of `data` matches the
    /// time axis.
    pub fn new(time: Vec<f64>, data: ArrayD<f64>) -> Result<Self, DatasetError> {
        if data.ndim() == 0 || data.shape()[0] != time.len() {
            return Err(DatasetError::InvalidData(format!(
                "data shape {:?} does not match {} time values",
                data.shape(),
                time.len()
            )));
        }
        Ok(Self { time, data })
    }

    /// Number of time records.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// True if the block has no records.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Records with `start <= t < end` (epoch seconds).
    pub fn clip(&self, start: f64, end: f64) -> Self {
        let keep: Vec<usize> = self
            .time
            .iter()
            .enumerate()
            .filter(|(_, &t)| start <= t && t < end)
            .map(|(i, _)| i)
            .collect();

        Self {
            time: keep.iter().map(|&i| self.time[i]).collect(),
            data: self.data.select(Axis(0), &keep),
        }
    }
}

/// Concatenate blocks along the time axis, in order.
///
/// Where a block overlaps the span accumulated so far, the later block wins:
/// accumulated records at or after the block's first time are dropped before
/// appending. The result must come out strictly increasing.
pub fn concat_series(blocks: &[SeriesBlock]) -> Result<SeriesBlock, DatasetError> {
    if blocks.is_empty() {
        return Err(DatasetError::InvalidData(
            "no blocks to concatenate".to_string(),
        ));
    }

    let mut acc = blocks[0].clone();
    for block in &blocks[1..] {
        if block.is_empty() {
            continue;
        }
        // Later file overrides the overlapping span
        let cutoff = block.time[0];
        let keep: Vec<usize> = acc
            .time
            .iter()
            .enumerate()
            .filter(|(_, &t)| t < cutoff)
            .map(|(i, _)| i)
            .collect();
        if keep.len() != acc.len() {
            acc = SeriesBlock {
                time: keep.iter().map(|&i| acc.time[i]).collect(),
                data: acc.data.select(Axis(0), &keep),
            };
        }

        let time: Vec<f64> = acc
            .time
            .iter()
            .chain(block.time.iter())
            .copied()
            .collect();
        let data = ndarray::concatenate(Axis(0), &[acc.data.view(), block.data.view()])
            .map_err(|e| DatasetError::InvalidData(e.to_string()))?;
        acc = SeriesBlock { time, data };
    }

    if acc.time.windows(2).any(|w| w[0] >= w[1]) {
        return Err(DatasetError::NonMonotonicTime);
    }

    Ok(acc)
}

/// Scale (to seconds) and epoch offset (seconds) from a CF time units string
/// such as `"seconds since 1970-01-01 00:00:00"`.
#[cfg(feature = "netcdf")]
fn parse_time_units(units: &str) -> Result<(f64, f64), DatasetError> {
    let mut parts = units.splitn(2, " since ");
    let unit = parts.next().unwrap_or("").trim();
    let origin = parts
        .next()
        .ok_or_else(|| {
            DatasetError::InvalidData(format!("unsupported time units: '{}'", units))
        })?
        .trim();

    let scale = match unit {
        "seconds" | "second" | "s" => 1.0,
        "minutes" | "minute" | "min" => 60.0,
        "hours" | "hour" | "h" => 3600.0,
        "days" | "day" | "d" => 86400.0,
        other => {
            return Err(DatasetError::InvalidData(format!(
                "unsupported time unit: '{}'",
                other
            )))
        }
    };

    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    let origin = formats
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(origin, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(origin, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| {
            DatasetError::InvalidData(format!("unparseable time origin: '{}'", origin))
        })?;

    Ok((scale, origin.and_utc().timestamp() as f64))
}

/// Read a variable's time series from one file, as epoch seconds and data.
#[cfg(feature = "netcdf")]
fn read_series(
    file: &netcdf::File,
    var_name: &str,
    timedim: &str,
) -> Result<SeriesBlock, DatasetError> {
    let time_var = file
        .variable(timedim)
        .ok_or_else(|| DatasetError::MissingVariable(timedim.to_string()))?;
    let raw: Vec<f64> = time_var.values::<f64, _>(..)?;

    let (scale, offset) = match time_var.attribute("units") {
        Some(attr) => match attr.value()? {
            netcdf::AttributeValue::Str(s) => parse_time_units(&s)?,
            _ => (1.0, 0.0),
        },
        // Teacher convention: epoch seconds when unannotated
        None => (1.0, 0.0),
    };
    let time: Vec<f64> = raw.iter().map(|&t| t * scale + offset).collect();

    let data = file
        .variable(var_name)
        .ok_or_else(|| DatasetError::MissingVariable(var_name.to_string()))?
        .values_arr::<f64, _>(..)?;

    SeriesBlock::new(time, data)
}

/// Open an overlapping file series and concatenate one variable along time.
///
/// `template` is a strftime-style path template expanded for each start time.
/// Each file is clipped to its half-open window `[tᵢ, tᵢ₊₁)` before
/// concatenation, so the overlap between consecutive runs is resolved in
/// favor of the newer run.
#[cfg(feature = "netcdf")]
pub fn open_overlap_series(
    template: &str,
    times: &[DateTime<Utc>],
    var_name: &str,
    timedim: &str,
) -> Result<SeriesBlock, DatasetError> {
    let paths = expand_template(template, times);
    let windows = overlap_windows(times)?;

    let mut blocks = Vec::with_capacity(paths.len());
    for (path, &(start, end)) in paths.iter().zip(windows.iter()) {
        debug!("opening {}", path);
        let file = netcdf::open(path)?;
        let block =
            read_series(&file, var_name, timedim)?.clip(epoch_seconds(start), epoch_seconds(end));
        blocks.push(block);
    }

    debug!("concatenating {} files", blocks.len());
    concat_series(&blocks)
}

/// Build a [`GridDataset`] from a file's 2D coordinate variables.
///
/// Reads the named latitude and longitude variables as the coordinate fields
/// of `dims = (dim_y, dim_x)` and attaches every other 2D variable of the
/// same shape as a data variable, so the result can feed the nearest-point
/// search directly.
#[cfg(feature = "netcdf")]
pub fn grid_from_netcdf(
    path: impl AsRef<Path>,
    lat_var: &str,
    lon_var: &str,
    dims: (&str, &str),
) -> Result<GridDataset, DatasetError> {
    let file = netcdf::open(path)?;

    let read_2d = |name: &str| -> Result<ndarray::Array2<f64>, DatasetError> {
        let var = file
            .variable(name)
            .ok_or_else(|| DatasetError::MissingVariable(name.to_string()))?;
        var.values_arr::<f64, _>(..)?
            .into_dimensionality::<ndarray::Ix2>()
            .map_err(|_| {
                DatasetError::InvalidData(format!("variable '{}' is not 2-dimensional", name))
            })
    };

    let lat = read_2d(lat_var)?;
    let lon = read_2d(lon_var)?;
    let shape = lat.dim();

    let mut grid = GridDataset::new(dims.0, dims.1, lat, lon)
        .map_err(|e| DatasetError::InvalidData(e.to_string()))?;

    for var in file.variables() {
        let name = var.name();
        if name == lat_var || name == lon_var {
            continue;
        }
        if var.dimensions().len() != 2 {
            continue;
        }
        let var_shape = (var.dimensions()[0].len(), var.dimensions()[1].len());
        if var_shape != shape {
            continue;
        }
        let values = read_2d(&name)?;
        grid = grid
            .with_variable(name, values)
            .map_err(|e| DatasetError::InvalidData(e.to_string()))?;
    }

    Ok(grid)
}
