//! Stochastic Gradient Descent (SGD) update
//!
//! Applies `parameter = parameter - learning_rate * accumulated_gradient` and
//! resets the accumulator, so a second application without new gradients is a
//! no-op.

/// Stochastic Gradient Descent with a fixed learning rate.
///
/// The accumulators hold a minibatch *sum*. Dividing the rate by the batch size
/// is the caller's choice when an averaged step is wanted.
#[derive(Debug, Clone, Copy)]
pub struct SGD {
    learning_rate: f64,
}

impl SGD {
    /// Creates a new SGD step with the specified learning rate.
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Apply accumulated gradients to `parameters` and zero `accumulators`.
    ///
    /// # Panics
    ///
    /// Panics if the two slices have different lengths.
    pub fn apply(&self, parameters: &mut [f64], accumulators: &mut [f64]) {
        assert_eq!(
            parameters.len(),
            accumulators.len(),
            "Parameters and accumulators must have the same length"
        );

        for (param, accum) in parameters.iter_mut().zip(accumulators.iter_mut()) {
            *param -= self.learning_rate * *accum;
            *accum = 0.0;
        }
    }
}
