//! Serde-serialisable settings for networks, trainings and optimization runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::builders::NetworkBuilder;
use crate::error::{Result, TenbilacError};
use crate::layers::LayerMode;
use crate::loss::ErrorFunction;
use crate::network::Network;
use crate::optimizer::{Algorithm, Bfgs, ConjugateGradient};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiddenLayerConfig {
    pub nn: usize,
    /// `"sum"` or `"mult"`
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Overrides the network-wide activation for this layer
    #[serde(default)]
    pub actfctname: Option<String>,
}

fn default_mode() -> String {
    "sum".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub ni: usize,
    pub no: usize,
    #[serde(default)]
    pub hidden: Vec<HiddenLayerConfig>,
    #[serde(default = "default_actfctname")]
    pub actfctname: String,
    #[serde(default = "default_oactfctname")]
    pub oactfctname: String,
    #[serde(default = "default_oactfctname")]
    pub multactfctname: String,
    #[serde(default)]
    pub onlyid: bool,
    #[serde(default)]
    pub inames: Option<Vec<String>>,
    #[serde(default)]
    pub onames: Option<Vec<String>>,
    #[serde(default)]
    pub name: Option<String>,
}

fn default_actfctname() -> String {
    "tanh".to_string()
}

fn default_oactfctname() -> String {
    "iden".to_string()
}

impl NetworkConfig {
    pub fn new(ni: usize, hidden: &[usize], no: usize) -> Self {
        NetworkConfig {
            ni,
            no,
            hidden: hidden
                .iter()
                .map(|&nn| HiddenLayerConfig {
                    nn,
                    mode: default_mode(),
                    actfctname: None,
                })
                .collect(),
            actfctname: default_actfctname(),
            oactfctname: default_oactfctname(),
            multactfctname: default_oactfctname(),
            onlyid: false,
            inames: None,
            onames: None,
            name: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Resolve all names and build the network, with parameters at zero.
    pub fn build(&self) -> Result<Network> {
        let mut builder = NetworkBuilder::new()
            .inputs(self.ni)
            .output(self.no)
            .hidden_activation(self.actfctname.parse::<Activation>()?)
            .mult_activation(self.multactfctname.parse::<Activation>()?)
            .output_activation(self.oactfctname.parse::<Activation>()?)
            .identity_only(self.onlyid);
        for layer in &self.hidden {
            let mode = layer.mode.parse::<LayerMode>()?;
            let activation = layer
                .actfctname
                .as_deref()
                .map(str::parse::<Activation>)
                .transpose()?;
            builder = builder.add_layer(layer.nn, mode, activation);
        }
        if let Some(inames) = &self.inames {
            builder = builder.input_names(inames.clone());
        }
        if let Some(onames) = &self.onames {
            builder = builder.output_names(onames.clone());
        }
        if let Some(name) = &self.name {
            builder = builder.name(name);
        }
        builder.build()
    }
}

impl Network {
    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        config.build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_errfctname")]
    pub errfctname: String,
    /// Where to save the training after every iteration
    #[serde(default)]
    pub itersavepath: Option<PathBuf>,
    /// Log every cost evaluation
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub regulweight: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
    /// Seed of the minibatch sampling, entropy if not set
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_errfctname() -> String {
    "msrb".to_string()
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            errfctname: default_errfctname(),
            itersavepath: None,
            verbose: false,
            regulweight: None,
            name: None,
            seed: None,
        }
    }
}

impl TrainingConfig {
    pub fn with_errfct(errfctname: &str) -> Self {
        TrainingConfig {
            errfctname: errfctname.to_string(),
            ..Default::default()
        }
    }

    pub fn itersavepath<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.itersavepath = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the settings that can be checked without data.
    pub fn validate(&self) -> Result<ErrorFunction> {
        if self.regulweight.is_some() {
            return Err(TenbilacError::NotImplemented(
                "regularization of the error function".to_string(),
            ));
        }
        self.errfctname.parse()
    }
}

/// One optimization run of a [`Training`](crate::training::Training).
///
/// With `mbsize` (or `mbfrac`, a fraction of the cases) set, the run is `mbloops` BFGS
/// passes of `maxiter` iterations, each on a freshly drawn minibatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptPlan {
    #[serde(default = "default_algo")]
    pub algo: String,
    #[serde(default = "default_maxiter")]
    pub maxiter: usize,
    #[serde(default = "default_gtol")]
    pub gtol: f64,
    #[serde(default)]
    pub mbsize: Option<usize>,
    #[serde(default)]
    pub mbfrac: Option<f64>,
    #[serde(default = "default_mbloops")]
    pub mbloops: usize,
}

fn default_algo() -> String {
    "bfgs".to_string()
}

fn default_maxiter() -> usize {
    100
}

fn default_gtol() -> f64 {
    1e-5
}

fn default_mbloops() -> usize {
    10
}

impl Default for OptPlan {
    fn default() -> Self {
        OptPlan {
            algo: default_algo(),
            maxiter: default_maxiter(),
            gtol: default_gtol(),
            mbsize: None,
            mbfrac: None,
            mbloops: default_mbloops(),
        }
    }
}

impl OptPlan {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn algorithm(&self) -> Result<Algorithm> {
        match self.algo.as_str() {
            "bfgs" => Ok(Algorithm::Bfgs(Bfgs::new(self.maxiter, self.gtol))),
            "cg" => Ok(Algorithm::Cg(ConjugateGradient::new(self.maxiter, self.gtol))),
            other => Err(TenbilacError::invalid_parameter(
                "algo".to_string(),
                format!("unknown optimization algorithm '{}'", other),
            )),
        }
    }

    /// Minibatch size for `ncases` cases, if this is a minibatch plan.
    pub fn minibatch_size(&self, ncases: usize) -> Result<Option<usize>> {
        match (self.mbsize, self.mbfrac) {
            (Some(size), _) => Ok(Some(size)),
            (None, Some(frac)) => {
                if !(frac > 0.0 && frac <= 1.0) {
                    return Err(TenbilacError::invalid_parameter(
                        "mbfrac".to_string(),
                        format!("must be in (0, 1], got {}", frac),
                    ));
                }
                Ok(Some(((frac * ncases as f64).round() as usize).max(1)))
            }
            (None, None) => Ok(None),
        }
    }
}
