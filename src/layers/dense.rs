use std::fmt;
use std::ops::Range;

use ndarray::{s, Array3, ArrayView1, ArrayView2, ArrayView3, ArrayViewMut1, ArrayViewMut2, Axis, Zip};
use serde::{Deserialize, Serialize};

use super::mode::{ppow, LayerMode};
use crate::activations::Activation;
use crate::error::{Result, TenbilacError};
use crate::types::Tensor;

/// One bank of neurons.
///
/// A layer does not own its weights and biases: they live in the flat parameter buffer of
/// the network, and the layer only records where its block starts. The block holds the
/// `(neuron, input)` weight matrix in row-major order, followed by one bias per neuron.
/// Every method that needs the values takes the buffer as an argument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Number of inputs
    pub ni: usize,
    /// Number of neurons
    pub nn: usize,
    pub mode: LayerMode,
    pub activation: Activation,
    pub name: String,
    offset: usize,
}

impl Layer {
    /// Create a layer whose parameter block starts at the beginning of the buffer.
    pub fn new(ni: usize, nn: usize, mode: LayerMode, activation: Activation, name: &str) -> Self {
        Layer {
            ni,
            nn,
            mode,
            activation,
            name: name.to_string(),
            offset: 0,
        }
    }

    /// Place the parameter block of this layer at `offset` in the buffer.
    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of parameters of this layer, weights and biases.
    pub fn nparams(&self) -> usize {
        self.nn * (self.ni + 1)
    }

    pub fn weight_range(&self) -> Range<usize> {
        self.offset..self.offset + self.nn * self.ni
    }

    pub fn bias_range(&self) -> Range<usize> {
        let start = self.offset + self.nn * self.ni;
        start..start + self.nn
    }

    /// View of the `(neuron, input)` weight matrix inside `params`.
    ///
    /// Fails with an input shape error if `params` is not contiguous.
    pub fn weights<'a>(&self, params: ArrayView1<'a, f64>) -> Result<ArrayView2<'a, f64>> {
        let range = self.weight_range();
        Ok(params
            .slice_move(s![range.start..range.end])
            .into_shape((self.nn, self.ni))?)
    }

    pub fn weights_mut<'a>(
        &self,
        params: ArrayViewMut1<'a, f64>,
    ) -> Result<ArrayViewMut2<'a, f64>> {
        let range = self.weight_range();
        Ok(params
            .slice_move(s![range.start..range.end])
            .into_shape((self.nn, self.ni))?)
    }

    /// Weights of one neuron, valid for any parameter layout.
    pub fn weight_row<'a>(&self, params: ArrayView1<'a, f64>, neuron: usize) -> ArrayView1<'a, f64> {
        let start = self.offset + neuron * self.ni;
        params.slice_move(s![start..start + self.ni])
    }

    pub fn biases<'a>(&self, params: ArrayView1<'a, f64>) -> ArrayView1<'a, f64> {
        let range = self.bias_range();
        params.slice_move(s![range.start..range.end])
    }

    pub fn biases_mut<'a>(&self, params: ArrayViewMut1<'a, f64>) -> ArrayViewMut1<'a, f64> {
        let range = self.bias_range();
        params.slice_move(s![range.start..range.end])
    }

    /// Compute the output of the layer.
    ///
    /// - rank 1 input `(feature)` gives `(neuron)`
    /// - rank 2 input `(feature, case)` gives `(neuron, case)`
    /// - rank 3 input `(realization, feature, case)` gives `(realization, neuron, case)`
    ///
    /// Masks are never looked at here: masked entries must already have been replaced.
    pub fn run(&self, params: ArrayView1<f64>, input: &Tensor) -> Result<Tensor> {
        if input.nfeatures() != self.ni {
            return Err(self.feature_mismatch(input.shape()));
        }
        match input {
            Tensor::D1(x) => {
                let x = x.view().insert_axis(Axis(0)).insert_axis(Axis(2));
                let out = self.run3(params, x)?;
                Ok(Tensor::D1(out.index_axis_move(Axis(2), 0).index_axis_move(Axis(0), 0)))
            }
            Tensor::D2(x) => {
                let x = x.view().insert_axis(Axis(0));
                let out = self.run3(params, x)?;
                Ok(Tensor::D2(out.index_axis_move(Axis(0), 0)))
            }
            Tensor::D3(x) => Ok(Tensor::D3(self.run3(params, x.view())?)),
        }
    }

    /// The rank 3 kernel all ranks go through.
    pub fn run3(&self, params: ArrayView1<f64>, input: ArrayView3<f64>) -> Result<Array3<f64>> {
        let (nrea, nfeat, ncas) = input.dim();
        if nfeat != self.ni {
            return Err(self.feature_mismatch(input.shape()));
        }
        let biases = self.biases(params);
        let mut output = Array3::zeros((nrea, self.nn, ncas));

        match self.mode {
            LayerMode::Sum => {
                let weights = self.weights(params)?;
                let column = biases.insert_axis(Axis(1));
                for (mut out, x) in output.outer_iter_mut().zip(input.outer_iter()) {
                    out.assign(&weights.dot(&x));
                    out += &column;
                }
            }
            LayerMode::Mult => {
                Zip::indexed(&mut output).par_for_each(|(rea, neuron, case), out| {
                    let product = self
                        .weight_row(params, neuron)
                        .iter()
                        .zip(input.slice(s![rea, .., case]).iter())
                        .fold(1.0, |acc, (&w, &x)| acc * ppow(x, w));
                    *out = product + biases[neuron];
                });
            }
        }

        self.activation.apply(&mut output);
        Ok(output)
    }

    /// Text describing the weights and biases, one line per neuron.
    pub fn report(&self, params: ArrayView1<f64>) -> String {
        let biases = self.biases(params);
        let mut txt = vec![format!("{}:", self)];
        for neuron in 0..self.nn {
            let line = match self.mode {
                LayerMode::Sum => format!(
                    "    output {} = {} ( input * {} + {} )",
                    neuron,
                    self.activation,
                    self.weight_row(params, neuron),
                    biases[neuron]
                ),
                LayerMode::Mult => format!(
                    "    output {} = {} ( prod (input ** {}) + {} )",
                    neuron,
                    self.activation,
                    self.weight_row(params, neuron),
                    biases[neuron]
                ),
            };
            txt.push(line);
        }
        txt.join("\n")
    }

    /// Label of every parameter of this layer, in buffer order.
    pub fn param_labels(&self) -> Vec<String> {
        let weight = format!("layer-{}_weight", self.name);
        let bias = format!("layer-{}_bias", self.name);
        std::iter::repeat(weight)
            .take(self.nn * self.ni)
            .chain(std::iter::repeat(bias).take(self.nn))
            .collect()
    }

    fn feature_mismatch(&self, shape: &[usize]) -> TenbilacError {
        TenbilacError::dimension_mismatch(
            format!("{} input features for layer '{}'", self.ni, self.name),
            format!("input of shape {:?}", shape),
        )
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Layer '{}', mode {}, ni {}, nn {}, actfct {}",
            self.name, self.mode, self.ni, self.nn, self.activation
        )
    }
}
