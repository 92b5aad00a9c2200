//! Gridded-dataset abstraction for 2D model output.
//!
//! Ocean model output (NorKyst, ROMS, WW3) comes as rectangular index grids
//! with curvilinear physical coordinates: two named dimensions (e.g. "X", "Y")
//! and, for each, a 2D coordinate field (longitude, latitude) of the grid's
//! shape giving the physical location of every cell.
//!
//! [`Gridded`] is the minimal interface the nearest-point search needs:
//! coordinate fields by axis name, positional selection of a single cell, and
//! dimension lengths. [`GridDataset`] is the in-memory implementation used in
//! tests and by the netcdf loader.
//!
//! # Example
//!
//! ```
//! use havkit::grid::{GridDataset, Gridded};
//! use ndarray::array;
//!
//! let lon = array![[4.0, 5.0], [4.0, 5.0]];
//! let lat = array![[60.0, 60.0], [61.0, 61.0]];
//! let grid = GridDataset::new("Y", "X", lat, lon).unwrap();
//!
//! let cell = grid.select(1, 0);
//! assert_eq!(cell.get("X"), Some(4.0));
//! assert_eq!(cell.get("Y"), Some(61.0));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use ndarray::Array2;
use thiserror::Error;

/// Error type for grid construction and access.
#[derive(Debug, Error)]
pub enum GridError {
    /// A field's shape does not match the grid shape
    #[error("field '{name}' has shape {actual:?}, grid shape is {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

/// A dataset indexed by a 2D rectangular grid.
///
/// Implementors expose 2D coordinate fields keyed by axis name and positional
/// selection of single cells. The grid is read-only through this interface;
/// selection produces a freshly derived [`GridView`], never a mutation.
pub trait Gridded: fmt::Debug {
    /// The 2D coordinate field associated with the named axis, shaped
    /// `(len(dim_y), len(dim_x))`. `None` if the axis has no coordinate field.
    fn coordinate_field(&self, axis: &str) -> Option<&Array2<f64>>;

    /// Select a single cell by position, returning all coordinate and data
    /// values at that cell.
    ///
    /// # Panics
    ///
    /// Panics if the index is outside the grid.
    fn select(&self, iy: usize, ix: usize) -> GridView;

    /// Length of the named dimension, if it exists.
    fn dim_len(&self, dim: &str) -> Option<usize>;
}

/// In-memory gridded dataset: two named dimensions, per-axis 2D coordinate
/// fields, and named 2D data variables, all of the same shape.
#[derive(Debug, Clone)]
pub struct GridDataset {
    dim_y: String,
    dim_x: String,
    shape: (usize, usize),
    /// Coordinate fields keyed by axis name
    coords: BTreeMap<String, Array2<f64>>,
    /// Data variables keyed by name
    variables: BTreeMap<String, Array2<f64>>,
}

impl GridDataset {
    /// Create a dataset from its two coordinate fields.
    ///
    /// `coord_y` and `coord_x` are the physical coordinates (e.g. latitude and
    /// longitude) of every cell, both shaped `(len(dim_y), len(dim_x))`.
    pub fn new(
        dim_y: impl Into<String>,
        dim_x: impl Into<String>,
        coord_y: Array2<f64>,
        coord_x: Array2<f64>,
    ) -> Result<Self, GridError> {
        let dim_y = dim_y.into();
        let dim_x = dim_x.into();
        let shape = coord_y.dim();

        if coord_x.dim() != shape {
            return Err(GridError::ShapeMismatch {
                name: dim_x,
                expected: shape,
                actual: coord_x.dim(),
            });
        }

        let mut coords = BTreeMap::new();
        coords.insert(dim_y.clone(), coord_y);
        coords.insert(dim_x.clone(), coord_x);

        Ok(Self {
            dim_y,
            dim_x,
            shape,
            coords,
            variables: BTreeMap::new(),
        })
    }

    /// Add a data variable, which must match the grid shape.
    pub fn with_variable(
        mut self,
        name: impl Into<String>,
        values: Array2<f64>,
    ) -> Result<Self, GridError> {
        let name = name.into();
        if values.dim() != self.shape {
            return Err(GridError::ShapeMismatch {
                name,
                expected: self.shape,
                actual: values.dim(),
            });
        }
        self.variables.insert(name, values);
        Ok(self)
    }

    /// Grid shape as `(len(dim_y), len(dim_x))`.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Names of the two dimensions, `(dim_y, dim_x)`.
    pub fn dims(&self) -> (&str, &str) {
        (&self.dim_y, &self.dim_x)
    }

    /// A data variable by name.
    pub fn variable(&self, name: &str) -> Option<&Array2<f64>> {
        self.variables.get(name)
    }
}

impl Gridded for GridDataset {
    fn coordinate_field(&self, axis: &str) -> Option<&Array2<f64>> {
        self.coords.get(axis)
    }

    fn select(&self, iy: usize, ix: usize) -> GridView {
        assert!(
            iy < self.shape.0 && ix < self.shape.1,
            "index ({}, {}) out of bounds for grid shape {:?}",
            iy,
            ix,
            self.shape
        );

        let mut values = BTreeMap::new();
        for (name, field) in self.coords.iter().chain(self.variables.iter()) {
            values.insert(name.clone(), field[(iy, ix)]);
        }
        GridView::new(values)
    }

    fn dim_len(&self, dim: &str) -> Option<usize> {
        if dim == self.dim_y {
            Some(self.shape.0)
        } else if dim == self.dim_x {
            Some(self.shape.1)
        } else {
            None
        }
    }
}

/// A single selected grid cell: scalar coordinate and data values by name,
/// plus any derived fields attached after selection.
///
/// Views are derived values; attaching fields never touches the source grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridView {
    values: BTreeMap<String, f64>,
}

impl GridView {
    fn new(values: BTreeMap<String, f64>) -> Self {
        Self { values }
    }

    /// Value of a named field at this cell.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Attach extra named scalar fields, returning the augmented view.
    ///
    /// Existing names are overwritten.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        for (name, value) in fields {
            self.values.insert(name.into(), value);
        }
        self
    }

    /// Iterator over all `(name, value)` pairs, in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }
}
