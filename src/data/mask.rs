use ndarray::{Array2, Array3, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TenbilacError};

/// Value written in place of masked input entries. It stays finite through sum layers and
/// through product units whatever the exponent.
pub const MASK_PLACEHOLDER: f64 = 1.0;

/// `(realization, feature, case)` inputs with an optional mask of the same shape.
/// A `true` mask entry marks the value as invalid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaskedInputs {
    pub data: Array3<f64>,
    pub mask: Option<Array3<bool>>,
}

impl MaskedInputs {
    /// Inputs where nothing is masked.
    pub fn new(data: Array3<f64>) -> Self {
        MaskedInputs { data, mask: None }
    }

    /// Inputs with an element-wise mask.
    pub fn with_mask(data: Array3<f64>, mask: Array3<bool>) -> Result<Self> {
        if mask.dim() != data.dim() {
            return Err(TenbilacError::dimension_mismatch(
                format!("mask of shape {:?}", data.shape()),
                format!("mask of shape {:?}", mask.shape()),
            ));
        }
        Ok(MaskedInputs {
            data,
            mask: Some(mask),
        })
    }

    /// Inputs with a `(realization, case)` mask, applied to all features of that realization.
    pub fn from_realization_mask(data: Array3<f64>, realization_mask: Array2<bool>) -> Result<Self> {
        let (nrea, nfeat, ncas) = data.dim();
        if realization_mask.dim() != (nrea, ncas) {
            return Err(TenbilacError::dimension_mismatch(
                format!("realization mask of shape {:?}", [nrea, ncas]),
                format!("realization mask of shape {:?}", realization_mask.shape()),
            ));
        }
        let mask = Array3::from_shape_fn((nrea, nfeat, ncas), |(rea, _, case)| {
            realization_mask[[rea, case]]
        });
        Ok(MaskedInputs {
            data,
            mask: Some(mask),
        })
    }

    pub fn nrea(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn nfeatures(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn ncases(&self) -> usize {
        self.data.shape()[2]
    }

    /// `(realization, case)` mask: a realization is invalid as soon as one of its features is.
    /// `None` when nothing at all is masked.
    pub fn realization_mask(&self) -> Option<Array2<bool>> {
        let mask = self.mask.as_ref()?;
        let reduced = mask.map_axis(Axis(1), |features| features.iter().any(|&m| m));
        if reduced.iter().any(|&m| m) {
            Some(reduced)
        } else {
            None
        }
    }

    /// Keep only the given cases, in the given order.
    pub fn select_cases(&self, cases: &[usize]) -> MaskedInputs {
        MaskedInputs {
            data: self.data.select(Axis(2), cases),
            mask: self.mask.as_ref().map(|m| m.select(Axis(2), cases)),
        }
    }
}

impl From<Array3<f64>> for MaskedInputs {
    fn from(data: Array3<f64>) -> Self {
        MaskedInputs::new(data)
    }
}

/// Network outputs `(realization, output, case)` with the mask derived from the inputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaskedOutputs {
    pub data: Array3<f64>,
    pub mask: Option<Array3<bool>>,
}

impl MaskedOutputs {
    pub fn is_masked(&self, rea: usize, output: usize, case: usize) -> bool {
        self.mask
            .as_ref()
            .map_or(false, |m| m[[rea, output, case]])
    }

    /// All `(realization, output, case)` positions that are masked.
    pub fn masked_positions(&self) -> Vec<(usize, usize, usize)> {
        match &self.mask {
            None => Vec::new(),
            Some(mask) => mask
                .indexed_iter()
                .filter(|(_, &m)| m)
                .map(|(idx, _)| idx)
                .collect(),
        }
    }

    /// Mean over the valid realizations, `(output, case)`.
    /// Entries without any valid realization are `None`.
    pub fn realization_mean(&self) -> Array2<Option<f64>> {
        let (nrea, no, ncas) = self.data.dim();
        Array2::from_shape_fn((no, ncas), |(output, case)| {
            let mut sum = 0.0;
            let mut n = 0usize;
            for rea in 0..nrea {
                if !self.is_masked(rea, output, case) {
                    sum += self.data[[rea, output, case]];
                    n += 1;
                }
            }
            if n > 0 {
                Some(sum / n as f64)
            } else {
                None
            }
        })
    }
}

/// Turn masked inputs into a dense array the forward pass can run on without branching,
/// plus the `(realization, no, case)` output mask the error functions need.
///
/// Masked realizations get [`MASK_PLACEHOLDER`] for all their features. The output mask is
/// `None` when nothing is masked.
pub fn demask(inputs: &MaskedInputs, no: usize) -> Result<(Array3<f64>, Option<Array3<bool>>)> {
    let mut dense = inputs.data.clone();
    let realization_mask = match inputs.realization_mask() {
        Some(m) => m,
        None => return Ok((dense, None)),
    };

    let (nrea, _, ncas) = dense.dim();
    log::info!(
        "Demasking: {} of {} realizations are masked",
        realization_mask.iter().filter(|&&m| m).count(),
        nrea * ncas
    );

    for feature in dense.axis_iter_mut(Axis(1)) {
        Zip::from(feature)
            .and(&realization_mask)
            .for_each(|value, &masked| {
                if masked {
                    *value = MASK_PLACEHOLDER;
                }
            });
    }

    let outputs_mask = Array3::from_shape_fn((nrea, no, ncas), |(rea, _, case)| {
        realization_mask[[rea, case]]
    });
    Ok((dense, Some(outputs_mask)))
}
