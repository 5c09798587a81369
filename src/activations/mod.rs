//! # Activation Functions Module
//!
//! Stateless elementwise transforms applied to the output of each layer.
//!
//! ## Available Activations
//!
//! - **Identity** (`"iden"`): no transformation, the default for output layers (regression)
//! - **Sigmoid** (`"sig"`): `1 / (1 + e^(-x))`, outputs between 0 and 1
//! - **Tanh** (`"tanh"`): hyperbolic tangent, outputs between -1 and 1, the default for hidden layers
//! - **ReLU** (`"relu"`): `max(0, x)`
//!
//! ## Usage Example
//!
//! ```rust
//! use tenbilac::activations::Activation;
//! use ndarray::array;
//!
//! let act: Activation = "tanh".parse().unwrap();
//! let mut data = array![[0.0, 1.0], [-1.0, 2.0]];
//! act.apply(&mut data);
//! assert_eq!(data[[0, 0]], 0.0);
//! ```
//!
//! Tanh is the hidden-layer default because its slope at the origin is 1: a network
//! initialised towards the identity map stays close to it on normalised data.

pub mod functions;

pub use functions::Activation;
