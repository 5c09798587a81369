//! # Tenbilac - Feed-Forward Networks for Noisy Regression
//!
//! Tenbilac trains small feed-forward networks on data that comes with several noisy
//! realizations of each case, minimising errors such as the mean square relative bias
//! over the realizations instead of a plain mean square error.
//!
//! ## Key Features
//!
//! - **Layers**: sum units and product units (`prod x_i ** w_i`), run on 1D, 2D or 3D data
//! - **Flat parameters**: all weights and biases live in one vector that an optimizer works on
//! - **Masking**: invalid realizations are demasked once and skipped by the error functions
//! - **Dual networks**: [`wnet::WNet`] predicts outputs together with a weight for each
//! - **Optimizers**: BFGS and conjugate gradient with finite-difference gradients
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ndarray::Array3;
//! use tenbilac::config::TrainingConfig;
//! use tenbilac::data::TrainData;
//! use tenbilac::network::Network;
//! use tenbilac::training::Training;
//!
//! // 2 inputs, one hidden layer of 5 tanh units, 1 output
//! let mut net = Network::new(2, &[5], 1).unwrap();
//! net.set_identity(None);
//!
//! // (realization, feature, case) inputs and (feature, case) targets
//! let inputs = Array3::<f64>::zeros((10, 2, 100));
//! let targets = ndarray::Array2::<f64>::zeros((1, 100));
//! let data = TrainData::from_arrays(inputs, targets).unwrap();
//!
//! let mut training = Training::new(net, data, TrainingConfig::with_errfct("msb")).unwrap();
//! training.bfgs(100, 1e-8).unwrap();
//! let net = training.into_model();
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions (identity, sigmoid, tanh, ReLU)
//! - [`builders`] - Builder for networks
//! - [`config`] - Serde configuration of networks, trainings and optimization plans
//! - [`data`] - Training data, masks and normalization
//! - [`error`] - Error types and result handling
//! - [`layers`] - Sum and product-unit layers
//! - [`loss`] - Error functions
//! - [`model`] - The trait shared by networks and dual networks
//! - [`network`] - Networks and their flat parameter buffer
//! - [`optimizer`] - BFGS and conjugate gradient minimizers
//! - [`training`] - Training state machine, history and checkpoints
//! - [`types`] - Rank 1, 2 and 3 tensors
//! - [`wnet`] - Dual networks predicting outputs and weights

pub mod activations;
pub mod builders;
pub mod config;
pub mod data;
pub mod error;
pub mod layers;
pub mod loss;
pub mod model;
pub mod network;
pub mod optimizer;
pub mod training;
pub mod types;
pub mod wnet;

#[cfg(test)]
mod tests;

pub use error::{Result, TenbilacError};
pub use model::Model;
pub use network::Network;
pub use training::Training;
pub use wnet::WNet;
