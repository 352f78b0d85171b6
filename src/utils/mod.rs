//! Shared utilities for the layer chain
//!
//! This module provides random number generation and the activation functions
//! used by the layer kernels.

pub mod activations;
pub mod rng;

pub use activations::{relu, relu_g, sigmoid, sigmoid_g, softmax_inplace, tanh_g};
pub use rng::SimpleRng;
