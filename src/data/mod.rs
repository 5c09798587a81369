//! Training data containers, realization masks and input normalization.

pub mod mask;
pub mod normer;
pub mod traindata;

pub use mask::{demask, MaskedInputs, MaskedOutputs, MASK_PLACEHOLDER};
pub use normer::{NormType, Normer};
pub use traindata::{DataSet, TrainData};
