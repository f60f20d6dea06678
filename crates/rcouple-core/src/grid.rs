//! Grid metadata for component variables.
//!
//! Only uniform rectilinear grids are described in detail. Dimensions follow the
//! row-major convention used for the values: the last dimension is `x`, the one before
//! it `y` and the one before that `z`.

use crate::errors::{CouplerError, CouplerResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The geometry of the grid a variable is defined on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridType {
    Scalar,
    Points,
    UniformRectilinear,
    Rectilinear,
    StructuredQuadrilateral,
    Unstructured,
}

impl fmt::Display for GridType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GridType::Scalar => "scalar",
            GridType::Points => "points",
            GridType::UniformRectilinear => "uniform_rectilinear",
            GridType::Rectilinear => "rectilinear",
            GridType::StructuredQuadrilateral => "structured_quadrilateral",
            GridType::Unstructured => "unstructured",
        };
        f.write_str(name)
    }
}

/// Axis selector for grid coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Dimension of a grid of rank `rank` that holds this axis
    fn dimension(&self, rank: usize) -> Option<usize> {
        let offset = match self {
            Axis::X => 1,
            Axis::Y => 2,
            Axis::Z => 3,
        };
        rank.checked_sub(offset)
    }
}

/// A uniform rectilinear grid
///
/// Deserialized from the `[grid]` table of a component configuration:
///
/// ```toml
/// shape = [2, 3]
/// spacing = [1000.0, 1000.0]
/// origin = [0.0, 0.0]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformGrid {
    shape: Vec<usize>,
    spacing: Vec<f64>,
    origin: Vec<f64>,
}

impl UniformGrid {
    pub fn new(shape: Vec<usize>, spacing: Vec<f64>, origin: Vec<f64>) -> CouplerResult<Self> {
        let grid = Self {
            shape,
            spacing,
            origin,
        };
        grid.validate()?;
        Ok(grid)
    }

    /// A grid with no dimensions, for scalar variables
    pub fn scalar() -> Self {
        Self {
            shape: vec![],
            spacing: vec![],
            origin: vec![],
        }
    }

    /// Check that the shape, spacing and origin describe the same number of dimensions
    pub fn validate(&self) -> CouplerResult<()> {
        if self.spacing.len() != self.shape.len() || self.origin.len() != self.shape.len() {
            return Err(CouplerError::Error(format!(
                "Grid shape {:?}, spacing {:?} and origin {:?} must have the same length",
                self.shape, self.spacing, self.origin
            )));
        }
        if self.shape.iter().any(|n| *n == 0) {
            return Err(CouplerError::Error(format!(
                "Grid shape {:?} has an empty dimension",
                self.shape
            )));
        }
        Ok(())
    }

    pub fn grid_type(&self) -> GridType {
        if self.shape.is_empty() {
            GridType::Scalar
        } else {
            GridType::UniformRectilinear
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    pub fn origin(&self) -> &[f64] {
        &self.origin
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Cell-centre coordinates along an axis
    ///
    /// Returns an error if the grid has too few dimensions for the axis.
    pub fn coordinates(&self, axis: Axis) -> CouplerResult<Vec<f64>> {
        let dim = axis.dimension(self.rank()).ok_or_else(|| {
            CouplerError::Error(format!(
                "A grid of rank {} has no {:?} coordinate",
                self.rank(),
                axis
            ))
        })?;
        let (origin, spacing) = (self.origin[dim], self.spacing[dim]);
        Ok((0..self.shape[dim])
            .map(|i| origin + (i as f64 + 0.5) * spacing)
            .collect())
    }
}
