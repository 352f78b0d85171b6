//! Parameter update rules
//!
//! Only plain stochastic gradient descent is provided. Layers sum per-sample
//! gradients into accumulators between updates; the update applies the summed
//! gradient and clears the accumulator:
//!
//! `w = w - learning_rate * u_w`, then `u_w = 0`
//!
//! # Example
//!
//! ```
//! use neural_chain::optimizers::SGD;
//!
//! let sgd = SGD::new(0.5);
//! let mut weights = vec![1.0, 2.0];
//! let mut accumulated = vec![0.5, -0.5];
//! sgd.apply(&mut weights, &mut accumulated);
//! assert_eq!(weights, vec![0.75, 2.25]);
//! assert_eq!(accumulated, vec![0.0, 0.0]);
//! ```

pub mod sgd;

pub use sgd::SGD;
