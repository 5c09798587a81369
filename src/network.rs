use std::fmt;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use bincode::{deserialize, serialize};
use ndarray::{Array1, Array3, ArrayView1, ArrayView2, ArrayView3, ArrayViewMut1, ArrayViewMut2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::builders::NetworkBuilder;
use crate::error::{Result, TenbilacError};
use crate::layers::{Layer, LayerMode};
use crate::model::Model;
use crate::types::Tensor;

/// Standard deviations of the Gaussian noise added by `addnoise`.
/// Product-unit layers use the `mult*` scales.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseScales {
    pub wscale: f64,
    pub bscale: f64,
    pub multwscale: f64,
    pub multbscale: f64,
}

impl Default for NoiseScales {
    fn default() -> Self {
        NoiseScales {
            wscale: 0.1,
            bscale: 0.1,
            multwscale: 0.1,
            multbscale: 0.1,
        }
    }
}

impl NoiseScales {
    /// Same scale for every weight and bias.
    pub fn uniform(scale: f64) -> Self {
        NoiseScales {
            wscale: scale,
            bscale: scale,
            multwscale: scale,
            multbscale: scale,
        }
    }
}

/// The ordered layers of a network, without parameter values.
///
/// The layers carry offsets into a flat buffer of `nparams()` values that is owned elsewhere
/// (by a `Network`, or by a `WNet` for two stacks at once). Layers follow each other in the
/// buffer in forward order, each as its weights then its biases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerStack {
    pub ni: usize,
    pub no: usize,
    pub layers: Vec<Layer>,
    pub inames: Vec<String>,
    pub onames: Vec<String>,
    pub name: Option<String>,
}

impl LayerStack {
    /// Chain the layers and lay out their parameter blocks one after the other.
    pub fn new(
        ni: usize,
        layers: Vec<Layer>,
        inames: Option<Vec<String>>,
        onames: Option<Vec<String>>,
        name: Option<String>,
    ) -> Result<Self> {
        if layers.is_empty() {
            return Err(TenbilacError::invalid_parameter(
                "layers",
                "a network needs at least one layer",
            ));
        }

        let mut nin = ni;
        let mut offset = 0;
        let mut placed = Vec::with_capacity(layers.len());
        for layer in layers {
            if layer.ni != nin {
                return Err(TenbilacError::dimension_mismatch(
                    format!("layer '{}' with {} inputs", layer.name, nin),
                    format!("{} inputs", layer.ni),
                ));
            }
            nin = layer.nn;
            let nparams = layer.nparams();
            placed.push(layer.at_offset(offset));
            offset += nparams;
        }
        let no = nin;

        let inames = check_names(inames, ni, "i", "inames")?;
        let onames = check_names(onames, no, "o", "onames")?;

        Ok(LayerStack {
            ni,
            no,
            layers: placed,
            inames,
            onames,
            name,
        })
    }

    pub fn nparams(&self) -> usize {
        self.layers.iter().map(Layer::nparams).sum()
    }

    /// `[ni, h1, ..., hk, no]`
    pub fn arch(&self) -> Vec<usize> {
        std::iter::once(self.ni)
            .chain(self.layers.iter().map(|l| l.nn))
            .collect()
    }

    /// Propagate a rank 1, 2 or 3 input through all layers.
    pub fn run(&self, params: ArrayView1<f64>, input: &Tensor) -> Result<Tensor> {
        let mut layers = self.layers.iter();
        let first = layers.next().ok_or_else(empty_stack)?;
        let mut output = first.run(params, input)?;
        for layer in layers {
            output = layer.run(params, &output)?;
        }
        Ok(output)
    }

    /// Propagate a `(realization, feature, case)` input through all layers.
    pub fn run3(&self, params: ArrayView1<f64>, input: ArrayView3<f64>) -> Result<Array3<f64>> {
        let mut layers = self.layers.iter();
        let first = layers.next().ok_or_else(empty_stack)?;
        let mut output = first.run3(params, input)?;
        for layer in layers {
            output = layer.run3(params, output.view())?;
        }
        Ok(output)
    }

    pub fn set_identity(&self, mut params: ArrayViewMut1<f64>, only_n: Option<usize>) {
        for layer in &self.layers {
            layer.set_identity(params.view_mut(), only_n);
        }
    }

    pub fn zero(&self, mut params: ArrayViewMut1<f64>) {
        for layer in &self.layers {
            layer.zero(params.view_mut());
        }
    }

    pub fn addnoise<R: Rng + ?Sized>(
        &self,
        mut params: ArrayViewMut1<f64>,
        scales: &NoiseScales,
        rng: &mut R,
    ) -> Result<()> {
        for layer in &self.layers {
            let (wscale, bscale) = match layer.mode {
                LayerMode::Sum => (scales.wscale, scales.bscale),
                LayerMode::Mult => (scales.multwscale, scales.multbscale),
            };
            layer.addnoise(params.view_mut(), wscale, bscale, rng)?;
        }
        Ok(())
    }

    pub fn report(&self, params: ArrayView1<f64>) -> String {
        let mut txt = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            txt.push(layer.report(params));
        }
        txt.join("\n")
    }

    pub fn param_labels(&self) -> Vec<String> {
        self.layers.iter().flat_map(Layer::param_labels).collect()
    }

    /// Short text such as `with architecture [2, 5, 1] and 21 params`.
    fn describe(&self) -> String {
        format!("with architecture {:?} and {} params", self.arch(), self.nparams())
    }
}

fn no_such_layer(layer: usize) -> TenbilacError {
    TenbilacError::invalid_parameter("layer".to_string(), format!("no layer with index {}", layer))
}

fn empty_stack() -> TenbilacError {
    TenbilacError::invalid_parameter("layers", "a network needs at least one layer")
}

fn check_names(
    names: Option<Vec<String>>,
    n: usize,
    prefix: &str,
    what: &str,
) -> Result<Vec<String>> {
    match names {
        Some(names) if names.len() != n => Err(TenbilacError::dimension_mismatch(
            format!("{} {}", n, what),
            format!("{} {}", names.len(), what),
        )),
        Some(names) => Ok(names),
        None => Ok((0..n).map(|i| format!("{}{}", prefix, i)).collect()),
    }
}

/// A feed-forward network owning the flat parameter buffer its layers index into.
///
/// The buffer returned by [`Network::flat_parameters`] is the only storage of the weights
/// and biases: writing entry `i` changes the layer parameter it stands for, and the
/// accessors such as [`Network::weights`] read straight from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Network {
    stack: LayerStack,
    params: Array1<f64>,
}

impl Network {
    /// Build a network with `tanh` hidden sum layers of sizes `nhs` and an identity output layer.
    pub fn new(ni: usize, nhs: &[usize], no: usize) -> Result<Self> {
        let mut builder = NetworkBuilder::new().inputs(ni);
        for &nh in nhs {
            builder = builder.hidden(nh);
        }
        builder.output(no).build()
    }

    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::new()
    }

    /// Wrap a layer stack, with all parameters set to zero.
    pub fn from_stack(stack: LayerStack) -> Self {
        let params = Array1::zeros(stack.nparams());
        let network = Network { stack, params };
        log::info!("Built {}", network);
        network
    }

    pub fn into_parts(self) -> (LayerStack, Array1<f64>) {
        (self.stack, self.params)
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    pub fn layers(&self) -> &[Layer] {
        &self.stack.layers
    }

    pub fn name(&self) -> Option<&str> {
        self.stack.name.as_deref()
    }

    pub fn arch(&self) -> Vec<usize> {
        self.stack.arch()
    }

    pub fn inames(&self) -> &[String] {
        &self.stack.inames
    }

    pub fn onames(&self) -> &[String] {
        &self.stack.onames
    }

    pub(crate) fn onames_mut(&mut self) -> &mut Vec<String> {
        &mut self.stack.onames
    }

    /// The flat parameter buffer, writable.
    ///
    /// This is the vector an optimizer works on. Calling it again hands out the same storage.
    pub fn flat_parameters(&mut self) -> ArrayViewMut1<'_, f64> {
        self.params.view_mut()
    }

    pub fn parameters(&self) -> ArrayView1<'_, f64> {
        self.params.view()
    }

    /// Copy `p` into the parameter buffer.
    pub fn set_parameters(&mut self, p: ArrayView1<f64>) -> Result<()> {
        if p.len() != self.params.len() {
            return Err(TenbilacError::dimension_mismatch(
                format!("{} parameters", self.params.len()),
                format!("{} parameters", p.len()),
            ));
        }
        self.params.assign(&p);
        Ok(())
    }

    pub fn weights(&self, layer: usize) -> Result<ArrayView2<'_, f64>> {
        self.layer(layer)?.weights(self.params.view())
    }

    pub fn biases(&self, layer: usize) -> Result<ArrayView1<'_, f64>> {
        Ok(self.layer(layer)?.biases(self.params.view()))
    }

    pub fn weights_mut(&mut self, layer: usize) -> Result<ArrayViewMut2<'_, f64>> {
        let layer = self.stack.layers.get(layer).ok_or_else(|| no_such_layer(layer))?;
        layer.weights_mut(self.params.view_mut())
    }

    pub fn biases_mut(&mut self, layer: usize) -> Result<ArrayViewMut1<'_, f64>> {
        let layer = self.stack.layers.get(layer).ok_or_else(|| no_such_layer(layer))?;
        Ok(layer.biases_mut(self.params.view_mut()))
    }

    fn layer(&self, layer: usize) -> Result<&Layer> {
        self.stack.layers.get(layer).ok_or_else(|| no_such_layer(layer))
    }

    /// Propagate input through all layers. Works for rank 1, 2 and 3 inputs, see [`Layer::run`].
    /// Masks are not considered, use `predict` for masked data.
    pub fn run(&self, input: &Tensor) -> Result<Tensor> {
        self.stack.run(self.params.view(), input)
    }

    /// Initialise all layers towards the identity map, optionally only on the first `only_n` outputs.
    pub fn set_identity(&mut self, only_n: Option<usize>) {
        log::info!("Setting identity weights for {}", self);
        self.stack.set_identity(self.params.view_mut(), only_n);
    }

    pub fn zero(&mut self) {
        self.stack.zero(self.params.view_mut());
    }

    pub fn addnoise<R: Rng + ?Sized>(&mut self, scales: &NoiseScales, rng: &mut R) -> Result<()> {
        log::info!("Adding noise to network parameters ({:?})", scales);
        self.stack.addnoise(self.params.view_mut(), scales, rng)
    }

    /// Save the network to a file with bincode.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serialize(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(&serialized)?;
        Ok(())
    }

    /// Load a network saved with [`Network::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = fs::File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        let network: Self = deserialize(&buffer)?;
        if network.params.len() != network.stack.nparams() {
            return Err(TenbilacError::Serialization(format!(
                "{} parameters stored for a network needing {}",
                network.params.len(),
                network.stack.nparams()
            )));
        }
        Ok(network)
    }
}

impl Model for Network {
    fn ni(&self) -> usize {
        self.stack.ni
    }

    fn no(&self) -> usize {
        self.stack.no
    }

    fn nparams(&self) -> usize {
        self.stack.nparams()
    }

    fn parameters(&self) -> ArrayView1<'_, f64> {
        self.params.view()
    }

    fn flat_parameters(&mut self) -> ArrayViewMut1<'_, f64> {
        self.params.view_mut()
    }

    fn run3(&self, input: ArrayView3<f64>) -> Result<Array3<f64>> {
        self.stack.run3(self.params.view(), input)
    }

    fn param_labels(&self) -> Vec<String> {
        self.stack.param_labels()
    }

    fn report(&self) -> String {
        let rule = "=".repeat(80);
        [
            rule.clone(),
            self.to_string(),
            self.stack.report(self.params.view()),
            rule,
        ]
        .join("\n")
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stack.name {
            Some(name) => write!(f, "Net '{}' {}", name, self.stack.describe()),
            None => write!(f, "Net {}", self.stack.describe()),
        }
    }
}

impl fmt::Display for LayerStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
