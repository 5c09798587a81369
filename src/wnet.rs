use std::fmt;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use bincode::{deserialize, serialize};
use ndarray::{concatenate, s, Array1, Array3, ArrayView1, ArrayView3, ArrayViewMut1, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::builders::NetworkBuilder;
use crate::error::{Result, TenbilacError};
use crate::model::Model;
use crate::network::{LayerStack, Network, NoiseScales};
use crate::types::Tensor;

/// Two networks on the same inputs: `neto` predicts the outputs, `netw` a log-weight for
/// each of them (the weight is `exp(netw output)`).
///
/// The parameter buffer is the concatenation of both networks' buffers, `neto` first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WNet {
    neto: LayerStack,
    netw: LayerStack,
    params: Array1<f64>,
    name: Option<String>,
}

impl WNet {
    /// Two networks of identical architecture, with `tanh` hidden layers.
    pub fn new(ni: usize, nhs: &[usize], no: usize) -> Result<Self> {
        let neto = sub_network(ni, nhs, no, "neto")?;
        let netw = sub_network(ni, nhs, no, "netw")?;
        WNet::from_networks(neto, netw)
    }

    /// Pair two networks, suffixing their output names with `_o` and `_w`.
    ///
    /// Unnamed networks are named `neto` and `netw`, and layer names are made distinct
    /// between the two so that every parameter label says which network it belongs to.
    pub fn from_networks(mut neto: Network, mut netw: Network) -> Result<Self> {
        if neto.stack().ni != netw.stack().ni || neto.stack().no != netw.stack().no {
            return Err(TenbilacError::dimension_mismatch(
                format!("netw with ni {} and no {}", neto.stack().ni, neto.stack().no),
                format!("ni {} and no {}", netw.stack().ni, netw.stack().no),
            ));
        }
        for oname in neto.onames_mut().iter_mut() {
            oname.push_str("_o");
        }
        for oname in netw.onames_mut().iter_mut() {
            oname.push_str("_w");
        }

        let (mut neto, po) = neto.into_parts();
        let (mut netw, pw) = netw.into_parts();
        name_layers(&mut neto, "neto");
        name_layers(&mut netw, "netw");
        if neto.name == netw.name {
            for layer in neto.layers.iter_mut() {
                layer.name.push_str("_o");
            }
            for layer in netw.layers.iter_mut() {
                layer.name.push_str("_w");
            }
        }
        let params = concatenate(Axis(0), &[po.view(), pw.view()])?;

        let wnet = WNet {
            neto,
            netw,
            params,
            name: None,
        };
        log::info!("Built {}", wnet);
        Ok(wnet)
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Split back into the two networks, keeping the current parameters.
    pub fn into_networks(self) -> Result<(Network, Network)> {
        let n = self.neto.nparams();
        let mut neto = Network::from_stack(self.neto);
        let mut netw = Network::from_stack(self.netw);
        neto.set_parameters(self.params.slice(s![..n]))?;
        netw.set_parameters(self.params.slice(s![n..]))?;
        Ok((neto, netw))
    }

    pub fn neto(&self) -> &LayerStack {
        &self.neto
    }

    pub fn netw(&self) -> &LayerStack {
        &self.netw
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn neto_params(&self) -> ArrayView1<'_, f64> {
        self.params.slice(s![..self.neto.nparams()])
    }

    pub fn netw_params(&self) -> ArrayView1<'_, f64> {
        self.params.slice(s![self.neto.nparams()..])
    }

    pub fn flat_parameters(&mut self) -> ArrayViewMut1<'_, f64> {
        self.params.view_mut()
    }

    pub fn parameters(&self) -> ArrayView1<'_, f64> {
        self.params.view()
    }

    /// Outputs and log-weights, each with the rank and shape convention of [`Network::run`].
    pub fn run_split(&self, input: &Tensor) -> Result<(Tensor, Tensor)> {
        let outputs = self.neto.run(self.neto_params(), input)?;
        let weights = self.netw.run(self.netw_params(), input)?;
        Ok((outputs, weights))
    }

    /// Outputs followed by log-weights along the feature axis.
    pub fn run(&self, input: &Tensor) -> Result<Tensor> {
        let (outputs, weights) = self.run_split(input)?;
        let joined = match (outputs, weights) {
            (Tensor::D1(o), Tensor::D1(w)) => Tensor::D1(concatenate(Axis(0), &[o.view(), w.view()])?),
            (Tensor::D2(o), Tensor::D2(w)) => Tensor::D2(concatenate(Axis(0), &[o.view(), w.view()])?),
            (Tensor::D3(o), Tensor::D3(w)) => Tensor::D3(concatenate(Axis(1), &[o.view(), w.view()])?),
            (o, w) => {
                return Err(TenbilacError::InputShape(format!(
                    "sub-network outputs of different ranks {} and {}",
                    o.ndim(),
                    w.ndim()
                )))
            }
        };
        Ok(joined)
    }

    /// Initialise `neto` towards identity and `netw` to zero, so that all weights start at 1.
    pub fn setini(&mut self) {
        log::info!("Setting identity weights for neto and zero weights for netw");
        let WNet { neto, netw, params, .. } = self;
        let (po, pw) = params.view_mut().split_at(Axis(0), neto.nparams());
        neto.set_identity(po, None);
        netw.zero(pw);
    }

    pub fn addnoise<R: Rng + ?Sized>(&mut self, scales: &NoiseScales, rng: &mut R) -> Result<()> {
        log::info!("Adding noise to both sub-networks ({:?})", scales);
        let WNet { neto, netw, params, .. } = self;
        let (po, pw) = params.view_mut().split_at(Axis(0), neto.nparams());
        neto.addnoise(po, scales, rng)?;
        netw.addnoise(pw, scales, rng)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serialize(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(&serialized)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = fs::File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        let wnet: Self = deserialize(&buffer)?;
        if wnet.params.len() != wnet.neto.nparams() + wnet.netw.nparams() {
            return Err(TenbilacError::Serialization(format!(
                "{} parameters stored for a WNet needing {}",
                wnet.params.len(),
                wnet.neto.nparams() + wnet.netw.nparams()
            )));
        }
        Ok(wnet)
    }
}

/// Name an unnamed stack, prefixing its layer names like the builder does.
fn name_layers(stack: &mut LayerStack, name: &str) {
    if stack.name.is_none() {
        for layer in stack.layers.iter_mut() {
            layer.name = format!("{}-{}", name, layer.name);
        }
        stack.name = Some(name.to_string());
    }
}

fn sub_network(ni: usize, nhs: &[usize], no: usize, name: &str) -> Result<Network> {
    let mut builder = NetworkBuilder::new().inputs(ni).name(name);
    for &nh in nhs {
        builder = builder.hidden(nh);
    }
    builder.output(no).build()
}

impl Model for WNet {
    fn ni(&self) -> usize {
        self.neto.ni
    }

    fn no(&self) -> usize {
        self.neto.no + self.netw.no
    }

    fn nparams(&self) -> usize {
        self.params.len()
    }

    fn parameters(&self) -> ArrayView1<'_, f64> {
        self.params.view()
    }

    fn flat_parameters(&mut self) -> ArrayViewMut1<'_, f64> {
        self.params.view_mut()
    }

    fn run3(&self, input: ArrayView3<f64>) -> Result<Array3<f64>> {
        let outputs = self.neto.run3(self.neto_params(), input)?;
        let weights = self.netw.run3(self.netw_params(), input)?;
        Ok(concatenate(Axis(1), &[outputs.view(), weights.view()])?)
    }

    fn param_labels(&self) -> Vec<String> {
        let mut labels = self.neto.param_labels();
        labels.extend(self.netw.param_labels());
        labels
    }

    fn report(&self) -> String {
        let rule = "#".repeat(120);
        [
            rule.clone(),
            self.to_string(),
            format!("neto {}", self.neto),
            self.neto.report(self.neto_params()),
            format!("netw {}", self.netw),
            self.netw.report(self.netw_params()),
            rule,
        ]
        .join("\n")
    }
}

impl fmt::Display for WNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "WNet '{}' with {} params", name, self.params.len()),
            None => write!(f, "WNet with {} params", self.params.len()),
        }?;
        write!(f, ", neto {:?} and netw {:?}", self.neto.arch(), self.netw.arch())
    }
}
