//! Activation functions for neural networks
//!
//! Every derivative in this module is expressed in terms of the activation
//! *output* `y`, not the pre-activation input. Layers store `y` after the forward
//! pass and evaluate the gradient from it:
//!
//! - Sigmoid: `y = 1 / (1 + exp(-x))`, `dy/dx = y * (1 - y)`
//! - Tanh: `y = tanh(x)`, `dy/dx = 1 - y²`
//! - ReLU: `y = max(0, x)`, `dy/dx = 1 if y > 0 else 0`
//! - Softmax: max-subtracted exponentials normalized to sum to one

/// Sigmoid activation function.
///
/// Returns the sigmoid of the input: 1 / (1 + exp(-x))
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid derivative assuming y = sigmoid(x).
pub fn sigmoid_g(y: f64) -> f64 {
    y * (1.0 - y)
}

/// Hyperbolic tangent derivative assuming y = tanh(x).
pub fn tanh_g(y: f64) -> f64 {
    1.0 - y * y
}

/// Rectified linear unit.
pub fn relu(x: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        0.0
    }
}

/// ReLU derivative assuming y = relu(x).
pub fn relu_g(y: f64) -> f64 {
    if y > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Softmax applied in-place to a single sample.
///
/// The per-sample maximum is subtracted before exponentiation so that large
/// logits cannot overflow. An empty slice is left untouched.
///
/// # Example
///
/// ```
/// use neural_chain::utils::activations::softmax_inplace;
///
/// let mut values = vec![1.0, 1.0];
/// softmax_inplace(&mut values);
/// assert!((values[0] - 0.5).abs() < 1e-12);
/// ```
pub fn softmax_inplace(values: &mut [f64]) {
    if values.is_empty() {
        return;
    }

    let max_value = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut sum = 0.0;
    for value in values.iter_mut() {
        *value = (*value - max_value).exp();
        sum += *value;
    }

    let inv_sum = 1.0 / sum;
    for value in values.iter_mut() {
        *value *= inv_sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_sigmoid_zero() {
        assert!((sigmoid(0.0) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_sigmoid_g_at_half() {
        assert!((sigmoid_g(0.5) - 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_tanh_g_at_zero() {
        assert!((tanh_g(0.0) - 1.0).abs() < EPSILON);
        assert!(tanh_g(0.99) < 0.02);
    }

    #[test]
    fn test_relu_and_gate() {
        assert_eq!(relu(-2.0), 0.0);
        assert_eq!(relu(3.5), 3.5);
        assert_eq!(relu_g(0.0), 0.0);
        assert_eq!(relu_g(3.5), 1.0);
    }

    #[test]
    fn test_softmax_sum() {
        let mut data = vec![1.0, 2.0, 3.0];
        softmax_inplace(&mut data);
        let sum: f64 = data.iter().sum();
        assert!((sum - 1.0).abs() < EPSILON);
        assert!(data[2] > data[1] && data[1] > data[0]);
    }

    #[test]
    fn test_softmax_numerical_stability() {
        let mut data = vec![1000.0, 1001.0, 1002.0];
        softmax_inplace(&mut data);
        let sum: f64 = data.iter().sum();
        assert!((sum - 1.0).abs() < EPSILON);
        assert!(!data.iter().any(|&x| x.is_nan() || x.is_infinite()));
    }

    #[test]
    fn test_softmax_all_negative() {
        let mut data = vec![-50.0, -60.0];
        softmax_inplace(&mut data);
        assert!(data[0] > 0.99);
        assert!((data.iter().sum::<f64>() - 1.0).abs() < EPSILON);
    }
}
