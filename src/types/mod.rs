use ndarray::{Array1, Array2, Array3, ArrayD, Ix1, Ix2, Ix3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TenbilacError};

/// Input or output data of a layer or network, tagged by rank.
///
/// - `D1`: features of a single case, `(feature)`
/// - `D2`: `(feature, case)`
/// - `D3`: `(realization, feature, case)`
///
/// Running a layer keeps the rank: the feature axis is replaced by the neuron axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Tensor {
    D1(Array1<f64>),
    D2(Array2<f64>),
    D3(Array3<f64>),
}

impl Tensor {
    /// Convert a dynamic-rank array, rejecting anything that is not rank 1, 2 or 3.
    pub fn from_dyn(array: ArrayD<f64>) -> Result<Self> {
        match array.ndim() {
            1 => Ok(Tensor::D1(into_dim::<Ix1>(array)?)),
            2 => Ok(Tensor::D2(into_dim::<Ix2>(array)?)),
            3 => Ok(Tensor::D3(into_dim::<Ix3>(array)?)),
            n => Err(TenbilacError::InputShape(format!(
                "cannot process input of rank {} (shape {:?})",
                n,
                array.shape()
            ))),
        }
    }

    pub fn ndim(&self) -> usize {
        match self {
            Tensor::D1(_) => 1,
            Tensor::D2(_) => 2,
            Tensor::D3(_) => 3,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Tensor::D1(a) => a.shape(),
            Tensor::D2(a) => a.shape(),
            Tensor::D3(a) => a.shape(),
        }
    }

    /// Size of the feature axis.
    pub fn nfeatures(&self) -> usize {
        match self {
            Tensor::D1(a) => a.len(),
            Tensor::D2(a) => a.nrows(),
            Tensor::D3(a) => a.shape()[1],
        }
    }

    pub fn into_dyn(self) -> ArrayD<f64> {
        match self {
            Tensor::D1(a) => a.into_dyn(),
            Tensor::D2(a) => a.into_dyn(),
            Tensor::D3(a) => a.into_dyn(),
        }
    }

    pub fn as_d1(&self) -> Option<&Array1<f64>> {
        match self {
            Tensor::D1(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_d2(&self) -> Option<&Array2<f64>> {
        match self {
            Tensor::D2(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_d3(&self) -> Option<&Array3<f64>> {
        match self {
            Tensor::D3(a) => Some(a),
            _ => None,
        }
    }
}

fn into_dim<D: ndarray::Dimension>(array: ArrayD<f64>) -> Result<ndarray::Array<f64, D>> {
    array
        .into_dimensionality::<D>()
        .map_err(|e| TenbilacError::InputShape(e.to_string()))
}

impl From<Array1<f64>> for Tensor {
    fn from(a: Array1<f64>) -> Self {
        Tensor::D1(a)
    }
}

impl From<Array2<f64>> for Tensor {
    fn from(a: Array2<f64>) -> Self {
        Tensor::D2(a)
    }
}

impl From<Array3<f64>> for Tensor {
    fn from(a: Array3<f64>) -> Self {
        Tensor::D3(a)
    }
}
