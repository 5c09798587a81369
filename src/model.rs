use ndarray::{Array3, ArrayView1, ArrayView3, ArrayViewMut1};

use crate::data::{demask, MaskedInputs, MaskedOutputs};
use crate::error::Result;

/// Anything a [`Training`](crate::training::Training) can optimise: a forward pass over
/// `(realization, feature, case)` inputs, driven by one flat parameter vector.
pub trait Model {
    /// Number of input features.
    fn ni(&self) -> usize;

    /// Number of output features produced by `run3`.
    fn no(&self) -> usize;

    /// Length of the flat parameter vector.
    fn nparams(&self) -> usize;

    fn parameters(&self) -> ArrayView1<'_, f64>;

    /// The flat parameter vector itself. Writes go straight to the layer weights and biases.
    fn flat_parameters(&mut self) -> ArrayViewMut1<'_, f64>;

    /// Forward pass, ignoring any mask.
    fn run3(&self, input: ArrayView3<f64>) -> Result<Array3<f64>>;

    /// One label per entry of the flat parameter vector.
    fn param_labels(&self) -> Vec<String>;

    /// Multi-line description of all parameters.
    fn report(&self) -> String;

    /// Forward pass on possibly masked inputs: masked realizations are replaced before
    /// running, and the corresponding outputs come back masked.
    fn predict(&self, inputs: &MaskedInputs) -> Result<MaskedOutputs> {
        log::info!("Predicting with input of shape {:?}", inputs.data.shape());
        let (dense, mask) = demask(inputs, self.no())?;
        let data = self.run3(dense.view())?;
        Ok(MaskedOutputs { data, mask })
    }
}
