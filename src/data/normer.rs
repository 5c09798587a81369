use std::fmt;
use std::str::FromStr;

use ndarray::{Array, Array1, ArrayBase, Axis, Data, RemoveAxis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TenbilacError};

/// How a [`Normer`] rescales each feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormType {
    /// Zero mean, unit standard deviation (`"std"`)
    Std,
    /// Divided by the largest absolute value, not shifted (`"sa1"`)
    Sa1,
    /// Mapped onto `[0, 1]` (`"01"`)
    ZeroOne,
    /// Mapped onto `[-1, 1]` (`"-11"`)
    MinusOneOne,
}

impl FromStr for NormType {
    type Err = TenbilacError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "std" => Ok(NormType::Std),
            "sa1" => Ok(NormType::Sa1),
            "01" => Ok(NormType::ZeroOne),
            "-11" => Ok(NormType::MinusOneOne),
            other => Err(TenbilacError::invalid_parameter(
                "normtype".to_string(),
                format!("unknown normalization type '{}'", other),
            )),
        }
    }
}

/// Per-feature affine normalization, `x' = (x - a) / b`.
///
/// The feature axis is the second to last one: axis 0 of `(feature, case)` arrays and
/// axis 1 of `(realization, feature, case)` arrays. Statistics are taken over all other axes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Normer {
    pub kind: NormType,
    a: Array1<f64>,
    b: Array1<f64>,
}

impl Normer {
    pub fn new<S, D>(data: &ArrayBase<S, D>, kind: NormType) -> Result<Self>
    where
        S: Data<Elem = f64>,
        D: RemoveAxis,
    {
        let axis = feature_axis(data.ndim())?;
        let nfeat = data.len_of(axis);
        let mut a = Array1::zeros(nfeat);
        let mut b = Array1::ones(nfeat);

        for (i, feature) in data.axis_iter(axis).enumerate() {
            let n = feature.len() as f64;
            let min = feature.iter().copied().fold(f64::INFINITY, f64::min);
            let max = feature.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let (shift, scale) = match kind {
                NormType::Std => {
                    let mean = feature.sum() / n;
                    let var = feature.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
                    (mean, var.sqrt())
                }
                NormType::Sa1 => (0.0, min.abs().max(max.abs())),
                NormType::ZeroOne => (min, max - min),
                NormType::MinusOneOne => ((max + min) / 2.0, (max - min) / 2.0),
            };
            a[i] = shift;
            // Constant features are only shifted
            b[i] = if scale > 0.0 && scale.is_finite() { scale } else { 1.0 };
        }

        Ok(Normer { kind, a, b })
    }

    pub fn nfeatures(&self) -> usize {
        self.a.len()
    }

    pub fn norm<S, D>(&self, data: &ArrayBase<S, D>) -> Result<Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: RemoveAxis,
    {
        self.transform(data, |x, a, b| (x - a) / b)
    }

    pub fn denorm<S, D>(&self, data: &ArrayBase<S, D>) -> Result<Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: RemoveAxis,
    {
        self.transform(data, |x, a, b| x * b + a)
    }

    fn transform<S, D, F>(&self, data: &ArrayBase<S, D>, f: F) -> Result<Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: RemoveAxis,
        F: Fn(f64, f64, f64) -> f64,
    {
        let axis = feature_axis(data.ndim())?;
        if data.len_of(axis) != self.nfeatures() {
            return Err(TenbilacError::dimension_mismatch(
                format!("{} features", self.nfeatures()),
                format!("data of shape {:?}", data.shape()),
            ));
        }
        let mut out = data.to_owned();
        for (i, mut feature) in out.axis_iter_mut(axis).enumerate() {
            let (a, b) = (self.a[i], self.b[i]);
            feature.mapv_inplace(|x| f(x, a, b));
        }
        Ok(out)
    }
}

fn feature_axis(ndim: usize) -> Result<Axis> {
    match ndim {
        2 | 3 => Ok(Axis(ndim - 2)),
        n => Err(TenbilacError::InputShape(format!(
            "can only normalize 2D or 3D data, got {}D",
            n
        ))),
    }
}

impl fmt::Display for Normer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Normer {:?} with a = {} and b = {}", self.kind, self.a, self.b)
    }
}
