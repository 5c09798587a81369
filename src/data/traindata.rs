use ndarray::{Array2, Array3, Axis};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::mask::MaskedInputs;
use crate::error::{Result, TenbilacError};

/// Inputs and targets of one data set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    /// `(realization, feature, case)`
    pub inputs: MaskedInputs,
    /// `(feature, case)`
    pub targets: Array2<f64>,
}

impl DataSet {
    pub fn new(inputs: MaskedInputs, targets: Array2<f64>) -> Result<Self> {
        if targets.ncols() != inputs.ncases() {
            return Err(TenbilacError::dimension_mismatch(
                format!("targets for {} cases", inputs.ncases()),
                format!("targets of shape {:?}", targets.shape()),
            ));
        }
        Ok(DataSet { inputs, targets })
    }

    pub fn ncases(&self) -> usize {
        self.targets.ncols()
    }

    pub fn select_cases(&self, cases: &[usize]) -> DataSet {
        DataSet {
            inputs: self.inputs.select_cases(cases),
            targets: self.targets.select(Axis(1), cases),
        }
    }
}

/// Training data, with an optional validation set held out from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainData {
    pub train: DataSet,
    pub val: Option<DataSet>,
}

impl TrainData {
    /// Training data without mask and without validation set.
    pub fn from_arrays(inputs: Array3<f64>, targets: Array2<f64>) -> Result<Self> {
        Self::new(MaskedInputs::new(inputs), targets)
    }

    pub fn new(inputs: MaskedInputs, targets: Array2<f64>) -> Result<Self> {
        Ok(TrainData {
            train: DataSet::new(inputs, targets)?,
            val: None,
        })
    }

    /// Move a fraction `valfrac` of the cases to a validation set. With `shuffle`, the
    /// validation cases are drawn at random, otherwise the last cases are taken.
    pub fn split_validation<R: Rng + ?Sized>(
        self,
        valfrac: f64,
        shuffle: bool,
        rng: &mut R,
    ) -> Result<Self> {
        if !(0.0..1.0).contains(&valfrac) {
            return Err(TenbilacError::invalid_parameter(
                "valfrac".to_string(),
                format!("must be in [0, 1), got {}", valfrac),
            ));
        }
        let all = match self.val {
            Some(_) => {
                return Err(TenbilacError::invalid_parameter(
                    "valfrac",
                    "the validation set has already been split off",
                ))
            }
            None => self.train,
        };

        let ncases = all.ncases();
        let nval = (ncases as f64 * valfrac).round() as usize;
        if nval == 0 {
            return Ok(TrainData {
                train: all,
                val: None,
            });
        }

        let mut cases: Vec<usize> = (0..ncases).collect();
        if shuffle {
            cases.shuffle(rng);
        }
        let (train_cases, val_cases) = cases.split_at(ncases - nval);
        log::info!(
            "Splitting {} cases into {} training and {} validation cases",
            ncases,
            train_cases.len(),
            val_cases.len()
        );

        Ok(TrainData {
            train: all.select_cases(train_cases),
            val: Some(all.select_cases(val_cases)),
        })
    }

    pub fn ncases(&self) -> usize {
        self.train.ncases()
    }

    pub fn nrea(&self) -> usize {
        self.train.inputs.nrea()
    }

    pub fn nfeatures(&self) -> usize {
        self.train.inputs.nfeatures()
    }

    pub fn ntargets(&self) -> usize {
        self.train.targets.nrows()
    }
}
