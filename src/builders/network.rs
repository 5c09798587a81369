use crate::activations::Activation;
use crate::error::{Result, TenbilacError};
use crate::layers::{Layer, LayerMode};
use crate::network::{LayerStack, Network};

#[derive(Clone, Debug)]
struct PendingLayer {
    nn: usize,
    mode: LayerMode,
    activation: Option<Activation>,
}

/// Builder for constructing networks with a fluent API.
///
/// Hidden layers default to `tanh` (sum layers) or the identity (product-unit layers);
/// the output layer is a sum layer with the identity activation.
pub struct NetworkBuilder {
    ni: Option<usize>,
    hidden: Vec<PendingLayer>,
    no: Option<usize>,
    actfct: Activation,
    multactfct: Activation,
    oactfct: Activation,
    onlyid: bool,
    inames: Option<Vec<String>>,
    onames: Option<Vec<String>>,
    name: Option<String>,
}

impl NetworkBuilder {
    /// Create a new network builder
    pub fn new() -> Self {
        NetworkBuilder {
            ni: None,
            hidden: Vec::new(),
            no: None,
            actfct: Activation::Tanh,
            multactfct: Activation::Identity,
            oactfct: Activation::Identity,
            onlyid: false,
            inames: None,
            onames: None,
            name: None,
        }
    }

    /// Number of input features
    pub fn inputs(mut self, ni: usize) -> Self {
        self.ni = Some(ni);
        self
    }

    /// Add a hidden sum layer
    pub fn hidden(self, nn: usize) -> Self {
        self.add_layer(nn, LayerMode::Sum, None)
    }

    /// Add a hidden product-unit layer
    pub fn hidden_mult(self, nn: usize) -> Self {
        self.add_layer(nn, LayerMode::Mult, None)
    }

    /// Add a hidden layer; `None` picks the default activation for the mode.
    pub fn add_layer(mut self, nn: usize, mode: LayerMode, activation: Option<Activation>) -> Self {
        self.hidden.push(PendingLayer {
            nn,
            mode,
            activation,
        });
        self
    }

    /// Number of output neurons
    pub fn output(mut self, no: usize) -> Self {
        self.no = Some(no);
        self
    }

    pub fn hidden_activation(mut self, activation: Activation) -> Self {
        self.actfct = activation;
        self
    }

    pub fn mult_activation(mut self, activation: Activation) -> Self {
        self.multactfct = activation;
        self
    }

    pub fn output_activation(mut self, activation: Activation) -> Self {
        self.oactfct = activation;
        self
    }

    /// Use the identity activation everywhere. Useful to test exact solutions.
    pub fn identity_only(mut self, onlyid: bool) -> Self {
        self.onlyid = onlyid;
        self
    }

    pub fn input_names(mut self, inames: Vec<String>) -> Self {
        self.inames = Some(inames);
        self
    }

    pub fn output_names(mut self, onames: Vec<String>) -> Self {
        self.onames = Some(onames);
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Build the network, with all parameters at zero.
    pub fn build(self) -> Result<Network> {
        let ni = self.ni.ok_or_else(|| {
            TenbilacError::invalid_parameter("ni", "number of inputs not specified")
        })?;
        let no = self.no.ok_or_else(|| {
            TenbilacError::invalid_parameter("no", "number of outputs not specified")
        })?;
        if ni == 0 {
            return Err(TenbilacError::invalid_parameter("ni", "must be at least 1"));
        }

        let output = PendingLayer {
            nn: no,
            mode: LayerMode::Sum,
            activation: Some(self.oactfct),
        };

        let mut layers = Vec::with_capacity(self.hidden.len() + 1);
        let mut nin = ni;
        for (i, pending) in self.hidden.iter().chain(std::iter::once(&output)).enumerate() {
            if pending.nn == 0 {
                return Err(TenbilacError::invalid_parameter(
                    format!("layer {}", i),
                    "must have at least one neuron".to_string(),
                ));
            }
            let activation = if self.onlyid {
                Activation::Identity
            } else {
                pending.activation.unwrap_or(match pending.mode {
                    LayerMode::Sum => self.actfct,
                    LayerMode::Mult => self.multactfct,
                })
            };
            let name = match &self.name {
                Some(netname) => format!("{}-{}", netname, i),
                None => i.to_string(),
            };
            layers.push(Layer::new(nin, pending.nn, pending.mode, activation, &name));
            nin = pending.nn;
        }

        let stack = LayerStack::new(ni, layers, self.inames, self.onames, self.name)?;
        Ok(Network::from_stack(stack))
    }
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_builder() {
        let network = NetworkBuilder::new()
            .inputs(3)
            .hidden(5)
            .hidden_mult(2)
            .output(1)
            .build()
            .unwrap();

        assert_eq!(network.layers().len(), 3);
        assert_eq!(network.arch(), vec![3, 5, 2, 1]);
        assert_eq!(network.layers()[0].activation, Activation::Tanh);
        assert_eq!(network.layers()[1].mode, LayerMode::Mult);
        assert_eq!(network.layers()[1].activation, Activation::Identity);
        assert_eq!(network.layers()[2].activation, Activation::Identity);
    }

    #[test]
    fn test_identity_only() {
        let network = NetworkBuilder::new()
            .inputs(2)
            .hidden(4)
            .output(2)
            .identity_only(true)
            .build()
            .unwrap();

        assert!(network
            .layers()
            .iter()
            .all(|l| l.activation == Activation::Identity));
    }

    #[test]
    fn test_layer_names_follow_network_name() {
        let network = NetworkBuilder::new()
            .inputs(2)
            .hidden(3)
            .output(1)
            .name("neto")
            .build()
            .unwrap();

        assert_eq!(network.layers()[0].name, "neto-0");
        assert_eq!(network.layers()[1].name, "neto-1");
    }

    #[test]
    fn test_builder_errors() {
        // No inputs
        assert!(NetworkBuilder::new().output(1).build().is_err());

        // No outputs
        assert!(NetworkBuilder::new().inputs(2).build().is_err());

        // Empty hidden layer
        assert!(NetworkBuilder::new().inputs(2).hidden(0).output(1).build().is_err());

        // Wrong number of input names
        let result = NetworkBuilder::new()
            .inputs(2)
            .output(1)
            .input_names(vec!["x".to_string()])
            .build();
        assert!(matches!(result, Err(TenbilacError::DimensionMismatch { .. })));
    }
}
