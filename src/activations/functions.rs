use std::fmt;
use std::str::FromStr;

use ndarray::{Array, Dimension};
use serde::{Deserialize, Serialize};

use crate::error::TenbilacError;

/// An enumeration of the activation functions a layer can apply to its neuron outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Identity,
    Sigmoid,
    Tanh,
    Relu,
}

impl Activation {
    /// Evaluate the activation on a single value.
    #[inline]
    pub fn eval(&self, v: f64) -> f64 {
        match self {
            Activation::Identity => v,
            Activation::Sigmoid => 1.0 / (1.0 + (-v).exp()),
            Activation::Tanh => v.tanh(),
            Activation::Relu => v.max(0.0),
        }
    }

    /// Apply the activation function in-place, elementwise, to an array of any rank.
    pub fn apply<D: Dimension>(&self, input: &mut Array<f64, D>) {
        match self {
            Activation::Identity => {}
            _ => {
                let act = *self;
                input.mapv_inplace(|v| act.eval(v));
            }
        }
    }

    /// The short name under which the activation is registered.
    pub fn name(&self) -> &'static str {
        match self {
            Activation::Identity => "iden",
            Activation::Sigmoid => "sig",
            Activation::Tanh => "tanh",
            Activation::Relu => "relu",
        }
    }
}

impl FromStr for Activation {
    type Err = TenbilacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iden" | "id" | "identity" => Ok(Activation::Identity),
            "sig" | "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "relu" => Ok(Activation::Relu),
            other => Err(TenbilacError::UnknownActivation(other.to_string())),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
