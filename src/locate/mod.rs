//! Nearest-grid-point search with configurable distance metric.
//!
//! Given a [`Gridded`](crate::grid::Gridded) dataset and a query location in
//! the same coordinate system, [`closest_point`] returns the grid cell
//! minimizing the distance to the query, the minimum distance itself, and a
//! view of the dataset at that cell with the distance and cell indices
//! attached for auditing.
//!
//! Two metrics are supported:
//!
//! - [`DistanceMetric::L2`]: `sqrt(dx² + dy²)` on the coordinate fields'
//!   native units. The caller must ensure the coordinates are in a flat,
//!   distance-comparable unit (e.g. projected meters) — no conversion is done.
//! - [`DistanceMetric::Geodesic`]: coordinates are (longitude, latitude) in
//!   degrees; distances are WGS84 inverse-geodesic distances in meters,
//!   computed per grid cell.
//!
//! An optional threshold turns far matches into hard errors: a wrong-location
//! result consumed downstream is worse than a failed lookup.
//!
//! # Example
//!
//! ```
//! use havkit::grid::GridDataset;
//! use havkit::locate::{closest_point, Query, SearchOptions};
//! use ndarray::array;
//!
//! let lat = array![[60.0, 60.0], [61.0, 61.0]];
//! let lon = array![[4.0, 5.0], [4.0, 5.0]];
//! let grid = GridDataset::new("Y", "X", lat, lon).unwrap();
//!
//! let found = closest_point(
//!     &grid,
//!     &Query::named("lat", 60.9),
//!     &Query::named("lon", 4.1),
//!     &SearchOptions::default(),
//! )
//! .unwrap();
//!
//! assert_eq!((found.index_y, found.index_x), (1, 0));
//! ```

use std::fmt;
use std::str::FromStr;

use geo::{GeodesicDistance, Point};
use log::{error, info};
use ndarray::Array2;
use thiserror::Error;

use crate::grid::{GridView, Gridded};

/// Error type for nearest-point lookups.
///
/// All variants are fatal to the call: no retry, no clamping, no partial
/// result.
#[derive(Debug, Error)]
pub enum LocateError {
    /// Metric name is neither "l2" nor "geo"
    #[error("unknown distance norm: {0}")]
    InvalidMetric(String),

    /// Query is not a single point
    #[error("query must be a single point, got {len_y} y-value(s) and {len_x} x-value(s)")]
    UnsupportedQueryShape { len_y: usize, len_x: usize },

    /// Grid has no coordinate field for the requested axis
    #[error("grid has no coordinate field for axis '{0}'")]
    MissingCoordinate(String),

    /// Grid has no cells with a finite distance to the query
    #[error("grid has no locatable cells")]
    EmptyGrid,

    /// Minimum distance is beyond the acceptance threshold
    #[error("minimum distance {distance} exceeds threshold {threshold}")]
    ThresholdExceeded { distance: f64, threshold: f64 },
}

/// Distance metric for the nearest-point search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    /// Euclidean distance on the coordinate fields' native units
    #[default]
    L2,
    /// WGS84 inverse-geodesic distance, coordinates in degrees (lon, lat)
    Geodesic,
}

impl FromStr for DistanceMetric {
    type Err = LocateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "l2" => Ok(DistanceMetric::L2),
            "geo" => Ok(DistanceMetric::Geodesic),
            other => Err(LocateError::InvalidMetric(other.to_string())),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::L2 => write!(f, "l2"),
            DistanceMetric::Geodesic => write!(f, "geo"),
        }
    }
}

/// A labeled query coordinate.
///
/// Queries carry their values in a container rather than as bare scalars so
/// the provenance (variable name) survives into logs and diagnostics. The
/// search itself only accepts single-element queries; the container form
/// exists so that shape violations are represented rather than impossible to
/// express.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    values: Vec<f64>,
    name: Option<String>,
}

impl Query {
    /// A single unlabeled coordinate.
    pub fn scalar(value: f64) -> Self {
        Self {
            values: vec![value],
            name: None,
        }
    }

    /// A single labeled coordinate, e.g. `Query::named("lon", 4.52)`.
    pub fn named(name: impl Into<String>, value: f64) -> Self {
        Self {
            values: vec![value],
            name: Some(name.into()),
        }
    }

    /// A multi-element query. Only valid for constructing inputs that the
    /// search will reject; kept so the shape contract is testable.
    pub fn from_values(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            values,
            name: Some(name.into()),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the query holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The label, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn scalar_value(&self) -> f64 {
        self.values[0]
    }
}

/// Options for [`closest_point`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Distance metric (default [`DistanceMetric::L2`])
    pub metric: DistanceMetric,
    /// Maximum acceptable distance; strictly greater is an error
    pub threshold: Option<f64>,
    /// Axis name of the x-coordinate field (default "X")
    pub dim_x: String,
    /// Axis name of the y-coordinate field (default "Y")
    pub dim_y: String,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::L2,
            threshold: None,
            dim_x: "X".to_string(),
            dim_y: "Y".to_string(),
        }
    }
}

impl SearchOptions {
    /// Set the distance metric.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the acceptance threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Set the axis names of the coordinate fields.
    pub fn with_dims(mut self, dim_y: impl Into<String>, dim_x: impl Into<String>) -> Self {
        self.dim_y = dim_y.into();
        self.dim_x = dim_x.into();
        self
    }
}

/// Result of a nearest-point search.
#[derive(Debug, Clone)]
pub struct ClosestPoint {
    /// The dataset at the found cell, with `distance`, `index_x` and
    /// `index_y` attached as derived fields
    pub view: GridView,
    /// Cell index along the x-dimension
    pub index_x: usize,
    /// Cell index along the y-dimension
    pub index_y: usize,
    /// Minimum distance, in the metric's units
    pub distance: f64,
}

/// Find the grid cell closest to a query point.
///
/// Computes the distance from `(x, y)` to every cell of the grid's coordinate
/// fields, takes the joint argmin over the 2D distance field (ties go to the
/// first occurrence in row-major order), and selects the dataset at that cell.
/// The achieved minimum distance is logged at info level on every call.
///
/// If `options.threshold` is set and the minimum distance is strictly greater,
/// the query and grid are logged at error level and the call fails with
/// [`LocateError::ThresholdExceeded`]; a distance exactly equal to the
/// threshold is accepted.
///
/// Both metrics require single-point queries. The geodesic metric in
/// particular never falls back to the first element of a batch query.
pub fn closest_point<G: Gridded>(
    grid: &G,
    y: &Query,
    x: &Query,
    options: &SearchOptions,
) -> Result<ClosestPoint, LocateError> {
    if x.len() != 1 || y.len() != 1 {
        return Err(LocateError::UnsupportedQueryShape {
            len_y: y.len(),
            len_x: x.len(),
        });
    }

    let coord_x = grid
        .coordinate_field(&options.dim_x)
        .ok_or_else(|| LocateError::MissingCoordinate(options.dim_x.clone()))?;
    let coord_y = grid
        .coordinate_field(&options.dim_y)
        .ok_or_else(|| LocateError::MissingCoordinate(options.dim_y.clone()))?;
    assert_eq!(
        coord_x.dim(),
        coord_y.dim(),
        "coordinate fields must share the grid shape"
    );

    let qx = x.scalar_value();
    let qy = y.scalar_value();

    let dist = distance_field(coord_y, coord_x, qy, qx, options.metric);

    // Joint argmin over the flattened field. NaN cells (e.g. masked
    // coordinates) never win.
    let mut found: Option<((usize, usize), f64)> = None;
    for ((iy, ix), &d) in dist.indexed_iter() {
        if d.is_nan() {
            continue;
        }
        if found.map_or(true, |(_, best)| d < best) {
            found = Some(((iy, ix), d));
        }
    }
    let ((index_y, index_x), distance) = found.ok_or(LocateError::EmptyGrid)?;

    info!(
        "closest point to ({}={}, {}={}) at index ({}, {}), distance: {:.4}",
        x.name().unwrap_or(&options.dim_x),
        qx,
        y.name().unwrap_or(&options.dim_y),
        qy,
        index_x,
        index_y,
        distance
    );

    if let Some(threshold) = options.threshold {
        if distance > threshold {
            error!(
                "minimum distance {} exceeds threshold {} for query x={:?}, y={:?}, grid: {:?}",
                distance, threshold, x, y, grid
            );
            return Err(LocateError::ThresholdExceeded {
                distance,
                threshold,
            });
        }
    }

    let view = grid.select(index_y, index_x).with_fields([
        ("distance".to_string(), distance),
        ("index_x".to_string(), index_x as f64),
        ("index_y".to_string(), index_y as f64),
    ]);

    Ok(ClosestPoint {
        view,
        index_x,
        index_y,
        distance,
    })
}

/// Distance from the query to every grid cell, same shape as the coordinate
/// fields.
fn distance_field(
    coord_y: &Array2<f64>,
    coord_x: &Array2<f64>,
    qy: f64,
    qx: f64,
    metric: DistanceMetric,
) -> Array2<f64> {
    match metric {
        DistanceMetric::L2 => ndarray::Zip::from(coord_x)
            .and(coord_y)
            .map_collect(|&gx, &gy| ((gx - qx).powi(2) + (gy - qy).powi(2)).sqrt()),
        DistanceMetric::Geodesic => {
            let query = Point::new(qx, qy);
            ndarray::Zip::from(coord_x)
                .and(coord_y)
                .map_collect(|&gx, &gy| Point::new(gx, gy).geodesic_distance(&query))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridDataset;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array, Array2};

    /// Regular n×n mesh with integer coordinates 0..n on both axes.
    fn mesh(n: usize) -> GridDataset {
        let ys = Array::from_shape_fn((n, n), |(i, _)| i as f64);
        let xs = Array::from_shape_fn((n, n), |(_, j)| j as f64);
        GridDataset::new("Y", "X", ys, xs).unwrap()
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("l2".parse::<DistanceMetric>().unwrap(), DistanceMetric::L2);
        assert_eq!(
            "geo".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::Geodesic
        );
        let err = "foo".parse::<DistanceMetric>().unwrap_err();
        assert!(matches!(err, LocateError::InvalidMetric(ref m) if m == "foo"));
    }

    #[test]
    fn test_l2_matches_brute_force() {
        let grid = mesh(5);
        let coord_y = grid.coordinate_field("Y").unwrap().clone();
        let coord_x = grid.coordinate_field("X").unwrap().clone();

        let queries = [(0.2, 3.9), (4.4, 0.1), (2.5001, 2.4999), (-1.0, 7.0)];
        for (qy, qx) in queries {
            let found = closest_point(
                &grid,
                &Query::scalar(qy),
                &Query::scalar(qx),
                &SearchOptions::default(),
            )
            .unwrap();

            // Brute-force cross-check
            let mut best = f64::INFINITY;
            for iy in 0..5 {
                for ix in 0..5 {
                    let d = ((coord_x[(iy, ix)] - qx).powi(2)
                        + (coord_y[(iy, ix)] - qy).powi(2))
                    .sqrt();
                    best = best.min(d);
                }
            }
            assert_abs_diff_eq!(found.distance, best, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_three_by_three_scenario() {
        // 3×3 mesh, query (x=1.1, y=0.9): expect cell (1, 1) at
        // distance sqrt(0.1² + 0.1²)
        let grid = mesh(3);
        let found = closest_point(
            &grid,
            &Query::scalar(0.9),
            &Query::scalar(1.1),
            &SearchOptions::default(),
        )
        .unwrap();

        assert_eq!((found.index_x, found.index_y), (1, 1));
        assert_abs_diff_eq!(found.distance, (0.02f64).sqrt(), epsilon = 1e-12);
        assert_eq!(found.view.get("index_x"), Some(1.0));
        assert_eq!(found.view.get("index_y"), Some(1.0));
        assert_abs_diff_eq!(
            found.view.get("distance").unwrap(),
            (0.02f64).sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_threshold_strictly_greater_fails() {
        let grid = mesh(3);
        let err = closest_point(
            &grid,
            &Query::scalar(0.9),
            &Query::scalar(1.1),
            &SearchOptions::default().with_threshold(0.1),
        )
        .unwrap_err();

        match err {
            LocateError::ThresholdExceeded {
                distance,
                threshold,
            } => {
                assert_abs_diff_eq!(distance, (0.02f64).sqrt(), epsilon = 1e-12);
                assert_abs_diff_eq!(threshold, 0.1);
            }
            other => panic!("expected ThresholdExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_match_passes_zero_threshold() {
        let grid = mesh(3);
        let found = closest_point(
            &grid,
            &Query::scalar(2.0),
            &Query::scalar(1.0),
            &SearchOptions::default().with_threshold(0.0),
        )
        .unwrap();

        assert_eq!((found.index_x, found.index_y), (1, 2));
        assert_abs_diff_eq!(found.distance, 0.0);
    }

    #[test]
    fn test_equal_distance_at_threshold_accepted() {
        let grid = mesh(3);
        // Query midway between two cells: distance exactly 0.5
        let found = closest_point(
            &grid,
            &Query::scalar(0.0),
            &Query::scalar(0.5),
            &SearchOptions::default().with_threshold(0.5),
        )
        .unwrap();
        assert_abs_diff_eq!(found.distance, 0.5);
    }

    #[test]
    fn test_tie_breaks_to_first_row_major() {
        let grid = mesh(3);
        // Equidistant between (0,0) and (0,1): first occurrence wins
        let found = closest_point(
            &grid,
            &Query::scalar(0.0),
            &Query::scalar(0.5),
            &SearchOptions::default(),
        )
        .unwrap();
        assert_eq!((found.index_y, found.index_x), (0, 0));
    }

    #[test]
    fn test_geodesic_rejects_batch_query() {
        let grid = mesh(3);
        let err = closest_point(
            &grid,
            &Query::scalar(0.5),
            &Query::from_values("lon", vec![0.5, 1.5]),
            &SearchOptions::default().with_metric(DistanceMetric::Geodesic),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LocateError::UnsupportedQueryShape { len_y: 1, len_x: 2 }
        ));
    }

    #[test]
    fn test_geodesic_distance_on_real_coordinates() {
        // Two cells near the Norwegian coast, one degree of latitude apart
        let lat = ndarray::array![[60.0, 60.0], [61.0, 61.0]];
        let lon = ndarray::array![[4.0, 5.0], [4.0, 5.0]];
        let grid = GridDataset::new("Y", "X", lat, lon).unwrap();

        let found = closest_point(
            &grid,
            &Query::named("lat", 60.95),
            &Query::named("lon", 4.0),
            &SearchOptions::default().with_metric(DistanceMetric::Geodesic),
        )
        .unwrap();

        assert_eq!((found.index_y, found.index_x), (1, 0));
        // 0.05° latitude is roughly 5.6 km on the WGS84 ellipsoid
        assert!(
            (found.distance - 5_570.0).abs() < 50.0,
            "geodesic distance: {}",
            found.distance
        );
    }

    #[test]
    fn test_missing_coordinate_field() {
        let grid = mesh(3);
        let err = closest_point(
            &grid,
            &Query::scalar(0.0),
            &Query::scalar(0.0),
            &SearchOptions::default().with_dims("lat", "lon"),
        )
        .unwrap_err();
        assert!(matches!(err, LocateError::MissingCoordinate(_)));
    }

    #[test]
    fn test_nan_cells_never_win() {
        let mut ys: Array2<f64> = Array::from_shape_fn((2, 2), |(i, _)| i as f64);
        let xs = Array::from_shape_fn((2, 2), |(_, j)| j as f64);
        ys[(0, 0)] = f64::NAN;
        let grid = GridDataset::new("Y", "X", ys, xs).unwrap();

        let found = closest_point(
            &grid,
            &Query::scalar(0.0),
            &Query::scalar(0.0),
            &SearchOptions::default(),
        )
        .unwrap();
        // (0,0) is masked; (0,1) is the nearest finite cell
        assert_eq!((found.index_y, found.index_x), (0, 1));
    }
}
