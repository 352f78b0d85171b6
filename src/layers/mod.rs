//! Layer records and their computation kernels
//!
//! A chain is made of [`Layer`] values whose kind-specific parameters live in the
//! [`LayerKind`] tagged variant. Each trainable kind has a kernel module with a
//! forward and a backward function; [`crate::network::Network`] dispatches on
//! the kind while walking the chain.

mod layer;
pub(crate) mod conv2d;
pub(crate) mod dense;
pub(crate) mod recurrent;

pub use layer::{DenseActivation, Layer, LayerKind, Shape};
