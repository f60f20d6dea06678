//! Array values exchanged through the model interface.
//!
//! The coupling engine treats values as opaque payloads described only by their element
//! type and shape. [`Value`] wraps an [`ndarray::ArrayD`] for each supported element type.

use crate::errors::{CouplerError, CouplerResult};
use ndarray::{Array1, ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarType {
    Float64,
    Float32,
    Int64,
    Int32,
}

impl VarType {
    /// The numpy-compatible name of the type
    pub fn name(&self) -> &'static str {
        match self {
            VarType::Float64 => "float64",
            VarType::Float32 => "float32",
            VarType::Int64 => "int64",
            VarType::Int32 => "int32",
        }
    }

    /// Size of a single element in bytes
    pub fn item_size(&self) -> usize {
        match self {
            VarType::Float64 | VarType::Int64 => 8,
            VarType::Float32 | VarType::Int32 => 4,
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A variable's values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Float64(ArrayD<f64>),
    Float32(ArrayD<f32>),
    Int64(ArrayD<i64>),
    Int32(ArrayD<i32>),
}

macro_rules! with_array {
    ($value:expr, $arr:ident => $body:expr) => {
        match $value {
            Value::Float64($arr) => $body,
            Value::Float32($arr) => $body,
            Value::Int64($arr) => $body,
            Value::Int32($arr) => $body,
        }
    };
}

impl Value {
    /// A zero-dimensional float value
    pub fn scalar(value: f64) -> Self {
        Value::Float64(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// A one-dimensional float value
    pub fn from_vec(values: Vec<f64>) -> Self {
        Value::Float64(Array1::from(values).into_dyn())
    }

    pub fn var_type(&self) -> VarType {
        match self {
            Value::Float64(_) => VarType::Float64,
            Value::Float32(_) => VarType::Float32,
            Value::Int64(_) => VarType::Int64,
            Value::Int32(_) => VarType::Int32,
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_array!(self, arr => arr.shape())
    }

    /// Number of dimensions (0 for a scalar)
    pub fn rank(&self) -> usize {
        with_array!(self, arr => arr.ndim())
    }

    /// Total number of elements
    pub fn size(&self) -> usize {
        with_array!(self, arr => arr.len())
    }

    /// Number of bytes occupied by the elements
    pub fn nbytes(&self) -> usize {
        self.size() * self.var_type().item_size()
    }

    pub fn as_f64(&self) -> Option<&ArrayD<f64>> {
        match self {
            Value::Float64(arr) => Some(arr),
            _ => None,
        }
    }

    /// Gather the elements at `indices` into a one-dimensional value.
    ///
    /// Each index holds one position per dimension of the value.
    pub fn at_indices(&self, indices: &[Vec<usize>]) -> CouplerResult<Value> {
        Ok(match self {
            Value::Float64(arr) => Value::Float64(gather(arr, indices)?),
            Value::Float32(arr) => Value::Float32(gather(arr, indices)?),
            Value::Int64(arr) => Value::Int64(gather(arr, indices)?),
            Value::Int32(arr) => Value::Int32(gather(arr, indices)?),
        })
    }

    /// Scatter `source` into the elements at `indices`.
    ///
    /// `source` must hold one element per index, or a single element which is used for
    /// every index.
    pub fn set_at_indices(&mut self, indices: &[Vec<usize>], source: &Value) -> CouplerResult<()> {
        match (self, source) {
            (Value::Float64(dst), Value::Float64(src)) => scatter(dst, indices, src),
            (Value::Float32(dst), Value::Float32(src)) => scatter(dst, indices, src),
            (Value::Int64(dst), Value::Int64(src)) => scatter(dst, indices, src),
            (Value::Int32(dst), Value::Int32(src)) => scatter(dst, indices, src),
            (dst, src) => Err(type_mismatch(dst, src)),
        }
    }

    /// Overwrite all elements with those of `source`.
    ///
    /// A single-element source is broadcast uniformly. A source with the same number of
    /// elements but a different shape is copied in logical (row-major) order.
    pub fn assign(&mut self, source: &Value) -> CouplerResult<()> {
        match (self, source) {
            (Value::Float64(dst), Value::Float64(src)) => assign_array(dst, src),
            (Value::Float32(dst), Value::Float32(src)) => assign_array(dst, src),
            (Value::Int64(dst), Value::Int64(src)) => assign_array(dst, src),
            (Value::Int32(dst), Value::Int32(src)) => assign_array(dst, src),
            (dst, src) => Err(type_mismatch(dst, src)),
        }
    }

    /// Copy a float value into `target`, following the rules of [`Value::assign`]
    pub fn copy_into(&self, target: &mut ArrayD<f64>) -> CouplerResult<()> {
        match self {
            Value::Float64(src) => assign_array(target, src),
            other => Err(CouplerError::TypeMismatch {
                expected: VarType::Float64.to_string(),
                found: other.var_type().to_string(),
            }),
        }
    }
}

impl From<ArrayD<f64>> for Value {
    fn from(value: ArrayD<f64>) -> Self {
        Value::Float64(value)
    }
}

fn type_mismatch(expected: &Value, found: &Value) -> CouplerError {
    CouplerError::TypeMismatch {
        expected: expected.var_type().to_string(),
        found: found.var_type().to_string(),
    }
}

fn gather<T: Clone>(arr: &ArrayD<T>, indices: &[Vec<usize>]) -> CouplerResult<ArrayD<T>> {
    let values = indices
        .iter()
        .map(|index| {
            arr.get(index.as_slice())
                .cloned()
                .ok_or_else(|| CouplerError::IndexOutOfBounds {
                    index: index.clone(),
                    shape: arr.shape().to_vec(),
                })
        })
        .collect::<CouplerResult<Vec<T>>>()?;
    Ok(Array1::from(values).into_dyn())
}

fn scatter<T: Clone>(
    arr: &mut ArrayD<T>,
    indices: &[Vec<usize>],
    source: &ArrayD<T>,
) -> CouplerResult<()> {
    let uniform = source.len() == 1;
    if !uniform && source.len() != indices.len() {
        return Err(CouplerError::ShapeMismatch {
            expected: vec![indices.len()],
            found: source.shape().to_vec(),
        });
    }

    // Validate every index before writing anything
    let shape = arr.shape().to_vec();
    if let Some(bad) = indices.iter().find(|index| arr.get(index.as_slice()).is_none()) {
        return Err(CouplerError::IndexOutOfBounds {
            index: bad.clone(),
            shape,
        });
    }

    let values: Vec<T> = source.iter().cloned().collect();
    for (i, index) in indices.iter().enumerate() {
        let value = if uniform { &values[0] } else { &values[i] };
        if let Some(slot) = arr.get_mut(index.as_slice()) {
            *slot = value.clone();
        }
    }
    Ok(())
}

fn assign_array<T: Clone>(dst: &mut ArrayD<T>, src: &ArrayD<T>) -> CouplerResult<()> {
    if dst.shape() == src.shape() {
        dst.assign(src);
    } else if src.len() == 1 {
        if let Some(value) = src.iter().next() {
            dst.fill(value.clone());
        }
    } else if dst.len() == src.len() {
        dst.iter_mut()
            .zip(src.iter())
            .for_each(|(d, s)| *d = s.clone());
    } else {
        return Err(CouplerError::ShapeMismatch {
            expected: dst.shape().to_vec(),
            found: src.shape().to_vec(),
        });
    }
    Ok(())
}
