//! Layer-chain neural networks
//!
//! A network is a linear chain of layers: an input layer followed by
//! fully-connected, convolutional and recurrent stages. Each layer owns its
//! output, gradient and error buffers, so one forward call and one backward
//! call move values through the whole chain without allocating.
//!
//! # Modules
//!
//! - `network`: The chain itself (construction, forward, backward, update, dump)
//! - `layers`: Layer records and the per-kind kernels
//! - `optimizers`: The gradient-descent step applied by `Network::update`
//! - `trainer`: Minibatch driver helpers used by the binaries
//! - `idx`: Reader for IDX dataset files (MNIST)
//! - `utils`: Shared utilities (RNG, activation functions)
//! - `config`: Training configuration structures
//! - `architecture`: Architecture configuration and chain building

pub mod architecture;
pub mod config;
pub mod idx;
pub mod layers;
pub mod network;
pub mod optimizers;
pub mod trainer;
pub mod utils;

pub use network::Network;
