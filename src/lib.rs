//! # havkit
//!
//! Utilities for oceanographic and atmospheric data analysis.
//!
//! This crate collects the pieces that keep coming up when working with
//! gridded ocean model output:
//! - Nearest-grid-point search with Euclidean or WGS84 geodesic distance
//!   and an optional acceptance threshold ([`locate`])
//! - A minimal gridded-dataset abstraction over 2D coordinate fields
//!   ([`grid`])
//! - Underwater sound speed from climate-model fields and OASES environment
//!   file generation ([`acoustic`])
//! - Opening and concatenating overlapping multi-file time series
//!   ([`dataset`]; reading NetCDF requires the `netcdf` feature)
//! - Map tile URL construction for plotting backgrounds ([`tiles`])
//!
//! Log output goes through the [`log`] facade; install a sink (e.g.
//! `simplelog`) in the consuming application to see it.

pub mod acoustic;
pub mod dataset;
pub mod grid;
pub mod locate;
pub mod math;
pub mod tiles;

pub use acoustic::{oases_ssp, sound_speed, AcousticError};
pub use dataset::{concat_series, expand_template, overlap_windows, DatasetError, SeriesBlock};
pub use grid::{GridDataset, GridError, GridView, Gridded};
pub use locate::{closest_point, ClosestPoint, DistanceMetric, LocateError, Query, SearchOptions};
pub use math::next_pow2;
pub use tiles::{tile_index, NorgeIBilder, TileSource};

#[cfg(feature = "netcdf")]
pub use dataset::{grid_from_netcdf, open_overlap_series};
