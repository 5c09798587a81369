use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TenbilacError;

/// How the neurons of a layer combine their inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LayerMode {
    /// `act(W·x + b)`, the usual affine neuron.
    #[default]
    Sum,
    /// `act(∏ᵢ xᵢ^Wᵢ + b)`, a product unit (Durbin & Rumelhart, 1989).
    Mult,
}

impl LayerMode {
    pub fn name(&self) -> &'static str {
        match self {
            LayerMode::Sum => "sum",
            LayerMode::Mult => "mult",
        }
    }
}

impl FromStr for LayerMode {
    type Err = TenbilacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(LayerMode::Sum),
            "mult" => Ok(LayerMode::Mult),
            other => Err(TenbilacError::UnknownLayerMode(other.to_string())),
        }
    }
}

impl fmt::Display for LayerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Power used by product units, `x^w`.
///
/// Where the real power is undefined (negative `x` with a non-integer `w`) this is the
/// real part of the principal complex power, `|x|^w cos(pi w)`. It matches `x.powf(w)` at
/// every integer `w` and varies continuously in `w` in between.
#[inline]
pub fn ppow(x: f64, w: f64) -> f64 {
    let p = x.powf(w);
    if p.is_nan() && x < 0.0 && w.is_finite() {
        (-x).powf(w) * (std::f64::consts::PI * w).cos()
    } else {
        p
    }
}
