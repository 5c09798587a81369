use std::fmt;
use std::str::FromStr;

use ndarray::{ArrayView2, ArrayView3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TenbilacError};

/// The error functions a training can minimise, resolved by name once.
///
/// All of them compare predictions `(realization, feature, case)` with targets
/// `(feature, case)`, skipping masked predictions. A `(feature, case)` without any valid
/// realization contributes nothing, and an error over nothing at all is `0.0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorFunction {
    /// Mean square error over all valid realizations
    Mse,
    /// Mean square bias: the realization mean is compared to the target
    Msb,
    /// Mean square relative bias: the bias in units of the realization spread
    Msrb,
    /// Mean square bias of the weighted realization mean, for dual networks. The second half
    /// of the prediction features are log-weights for the first half.
    Msbw,
}

impl ErrorFunction {
    pub const ALL: [ErrorFunction; 4] = [
        ErrorFunction::Mse,
        ErrorFunction::Msb,
        ErrorFunction::Msrb,
        ErrorFunction::Msbw,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ErrorFunction::Mse => "mse",
            ErrorFunction::Msb => "msb",
            ErrorFunction::Msrb => "msrb",
            ErrorFunction::Msbw => "msbw",
        }
    }

    /// Number of prediction features needed to compare with `ntargets` target features.
    pub fn npredictions(&self, ntargets: usize) -> usize {
        match self {
            ErrorFunction::Msbw => 2 * ntargets,
            _ => ntargets,
        }
    }

    pub fn check_arity(&self, npredictions: usize, ntargets: usize) -> Result<()> {
        if npredictions != self.npredictions(ntargets) {
            return Err(TenbilacError::dimension_mismatch(
                format!(
                    "{} model outputs for {} with {} targets",
                    self.npredictions(ntargets),
                    self.name(),
                    ntargets
                ),
                format!("{} model outputs", npredictions),
            ));
        }
        Ok(())
    }

    /// Evaluate the error. `mask` marks predictions to ignore; `None` means nothing is masked
    /// and gives the same result as an all-false mask.
    pub fn evaluate(
        &self,
        predictions: ArrayView3<f64>,
        targets: ArrayView2<f64>,
        mask: Option<ArrayView3<bool>>,
    ) -> f64 {
        let valid = |rea: usize, feature: usize, case: usize| {
            mask.as_ref().map_or(true, |m| !m[[rea, feature, case]])
        };
        let (nrea, _, ncas) = predictions.dim();
        let ntargets = targets.nrows();

        let mut total = 0.0;
        let mut count = 0usize;

        match self {
            ErrorFunction::Mse => {
                for rea in 0..nrea {
                    for feature in 0..ntargets {
                        for case in 0..ncas {
                            if valid(rea, feature, case) {
                                let d = predictions[[rea, feature, case]] - targets[[feature, case]];
                                total += d * d;
                                count += 1;
                            }
                        }
                    }
                }
            }
            ErrorFunction::Msb | ErrorFunction::Msrb => {
                for feature in 0..ntargets {
                    for case in 0..ncas {
                        let values: Vec<f64> = (0..nrea)
                            .filter(|&rea| valid(rea, feature, case))
                            .map(|rea| predictions[[rea, feature, case]])
                            .collect();
                        if let Some(term) = self.bias_term(&values, targets[[feature, case]]) {
                            total += term;
                            count += 1;
                        }
                    }
                }
            }
            ErrorFunction::Msbw => {
                for feature in 0..ntargets {
                    let wfeature = feature + ntargets;
                    for case in 0..ncas {
                        let weighted: Vec<(f64, f64)> = (0..nrea)
                            .filter(|&rea| valid(rea, feature, case) && valid(rea, wfeature, case))
                            .map(|rea| {
                                (
                                    predictions[[rea, feature, case]],
                                    predictions[[rea, wfeature, case]],
                                )
                            })
                            .collect();
                        if let Some(mean) = softmax_mean(&weighted) {
                            let bias = mean - targets[[feature, case]];
                            total += bias * bias;
                            count += 1;
                        }
                    }
                }
            }
        }

        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }

    /// Squared (relative) bias of the valid realizations of one `(feature, case)`, or `None`
    /// if that entry cannot contribute.
    fn bias_term(&self, values: &[f64], target: f64) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let bias = mean - target;
        match self {
            ErrorFunction::Msrb => {
                if values.len() < 2 {
                    return None;
                }
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                if var > 0.0 {
                    Some(bias * bias / var)
                } else {
                    None
                }
            }
            _ => Some(bias * bias),
        }
    }
}

/// Mean of the `(value, logweight)` pairs weighted by `exp(logweight)`, or `None` without
/// any pair. The log-weights are shifted by their maximum, so large ones do not overflow.
fn softmax_mean(weighted: &[(f64, f64)]) -> Option<f64> {
    if weighted.is_empty() {
        return None;
    }
    let shift = weighted
        .iter()
        .fold(f64::NEG_INFINITY, |m, &(_, logweight)| m.max(logweight));
    let mut wsum = 0.0;
    let mut wvsum = 0.0;
    for &(value, logweight) in weighted {
        let w = (logweight - shift).exp();
        wsum += w;
        wvsum += w * value;
    }
    Some(wvsum / wsum)
}

impl FromStr for ErrorFunction {
    type Err = TenbilacError;

    fn from_str(s: &str) -> Result<Self> {
        ErrorFunction::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| TenbilacError::UnknownErrorFunction(s.to_string()))
    }
}

impl fmt::Display for ErrorFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
