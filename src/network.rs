//! Linear chain of layers
//!
//! A `Network` owns its layers in chain order. Layer `0` is the input; every
//! later layer's predecessor is the layer just before it, so the links of the
//! chain are index relations rather than references.
//!
//! # Training step
//!
//! ```
//! use neural_chain::layers::DenseActivation;
//! use neural_chain::network::Network;
//! use neural_chain::utils::SimpleRng;
//!
//! let mut rng = SimpleRng::new(0);
//! let mut net = Network::input(2, 1, 1);
//! net.add_full_with(3, 0.1, DenseActivation::Sigmoid, &mut rng);
//! let tail = net.add_full_with(1, 0.1, DenseActivation::Sigmoid, &mut rng);
//!
//! net.set_inputs(&[0.25, 0.75]);
//! net.learn_outputs(&[0.5]);
//! let error = net.error_total(tail);
//! net.update(tail, 1.0);
//! assert!(error >= 0.0);
//! ```

use std::io::{self, Write};

use log::debug;

use crate::layers::{conv2d, dense, recurrent, DenseActivation, Layer, LayerKind, Shape};
use crate::optimizers::SGD;
use crate::utils::SimpleRng;

/// Weight scale of recurrent layers.
pub const RECURRENT_INIT_STD: f64 = 0.1;

/// An ordered chain of layers, input first.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
}

impl Network {
    /// Create a chain holding only an input layer of shape (depth, width, height).
    pub fn input(depth: usize, width: usize, height: usize) -> Self {
        Self::with_head(Layer::new_input(Shape::new(depth, width, height), 1))
    }

    /// Create a chain whose input layer keeps the last `window` input vectors.
    ///
    /// Recurrent layers only propagate error into, and learn input weights
    /// from, predecessor timesteps that are retained, so a recurrent chain
    /// starts from a sequence input with the same window.
    pub fn sequence_input(nnodes: usize, window: usize) -> Self {
        Self::with_head(Layer::new_input(Shape::flat(nnodes), window))
    }

    fn with_head(head: Layer) -> Self {
        debug!(
            "created Layer0 [input]: nodes={}, window={}",
            head.nnodes(),
            head.window()
        );
        Self { layers: vec![head] }
    }

    fn push(&mut self, layer: Layer) -> usize {
        debug!(
            "created Layer{} [{}]: shape=({},{},{}), nodes={}, parameters={}",
            layer.id(),
            layer.kind().name(),
            layer.shape().depth,
            layer.shape().width,
            layer.shape().height,
            layer.nnodes(),
            layer.parameter_count()
        );
        self.layers.push(layer);
        self.layers.len() - 1
    }

    fn last(&self) -> &Layer {
        &self.layers[self.tail()]
    }

    /// Append a fully-connected layer using tanh, or softmax once it is the tail.
    ///
    /// Weights are drawn as `std · N(0, 1)`; biases start at zero. Returns the
    /// index of the new layer.
    pub fn add_full(&mut self, nnodes: usize, std: f64, rng: &mut SimpleRng) -> usize {
        self.add_full_with(nnodes, std, DenseActivation::TanhSoftmax, rng)
    }

    /// Append a fully-connected layer with an explicit activation policy.
    pub fn add_full_with(
        &mut self,
        nnodes: usize,
        std: f64,
        activation: DenseActivation,
        rng: &mut SimpleRng,
    ) -> usize {
        let layer = Layer::new_full(self.last(), nnodes, std, activation, rng);
        self.push(layer)
    }

    /// Append a convolutional layer with output shape (depth, width, height).
    ///
    /// # Panics
    ///
    /// Panics if `kernel_size` is even or zero, `stride` is zero, or either
    /// spatial axis breaks `(size_out - 1) * stride + kernel_size <= size_in + 2 * padding`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_conv(
        &mut self,
        depth: usize,
        width: usize,
        height: usize,
        kernel_size: usize,
        padding: usize,
        stride: usize,
        std: f64,
        rng: &mut SimpleRng,
    ) -> usize {
        let layer = Layer::new_conv(
            self.last(),
            Shape::new(depth, width, height),
            kernel_size,
            padding,
            stride,
            std,
            rng,
        );
        self.push(layer)
    }

    /// Append a tanh recurrent layer retaining `window` timesteps.
    pub fn add_recurrent(&mut self, nnodes: usize, window: usize, rng: &mut SimpleRng) -> usize {
        let layer = Layer::new_recurrent(self.last(), nnodes, window, RECURRENT_INIT_STD, rng);
        self.push(layer)
    }

    /// Number of layers, including the input.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always false: a network holds at least its input layer.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Index of the last layer.
    pub fn tail(&self) -> usize {
        self.layers.len() - 1
    }

    pub fn layer(&self, index: usize) -> &Layer {
        &self.layers[index]
    }

    pub fn layer_mut(&mut self, index: usize) -> &mut Layer {
        &mut self.layers[index]
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Write `values` into the input layer and run the forward pass down the chain.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` differs from the input layer's node count.
    pub fn set_inputs(&mut self, values: &[f64]) {
        let head = &mut self.layers[0];
        assert_eq!(
            values.len(),
            head.nnodes(),
            "input length mismatch in set_inputs"
        );
        head.shift_outputs();
        head.outputs[..values.len()].copy_from_slice(values);

        let count = self.layers.len();
        for i in 1..count {
            let (done, rest) = self.layers.split_at_mut(i);
            let prev = &done[i - 1];
            let layer = &mut rest[0];
            match layer.kind {
                LayerKind::FullyConnected { .. } => dense::forward(layer, prev, i + 1 == count),
                LayerKind::Convolutional { .. } => conv2d::forward(layer, prev),
                LayerKind::Recurrent { .. } => recurrent::forward(layer, prev),
                LayerKind::Input => panic!("Layer{} is an input inside the chain", i),
            }
        }
    }

    /// Current outputs of layer `index`.
    pub fn outputs(&self, index: usize) -> &[f64] {
        self.layers[index].outputs()
    }

    /// Copy the current outputs of layer `index` into `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out.len()` differs from the layer's node count.
    pub fn get_outputs(&self, index: usize, out: &mut [f64]) {
        let outputs = self.outputs(index);
        assert_eq!(
            out.len(),
            outputs.len(),
            "output length mismatch in get_outputs"
        );
        out.copy_from_slice(outputs);
    }

    /// Set the tail errors to `outputs - targets` and backpropagate to the input.
    ///
    /// Gradient contributions are added to every layer's accumulators; nothing
    /// is applied until [`Network::update`].
    ///
    /// # Panics
    ///
    /// Panics if the chain has no trainable layer or `targets.len()` differs
    /// from the tail's node count.
    pub fn learn_outputs(&mut self, targets: &[f64]) {
        assert!(
            self.layers.len() > 1,
            "learn_outputs needs at least one layer after the input"
        );
        let tail_index = self.tail();
        let tail = &mut self.layers[tail_index];
        let n = tail.nnodes();
        assert_eq!(targets.len(), n, "target length mismatch in learn_outputs");
        for i in 0..n {
            tail.errors[i] = tail.outputs[i] - targets[i];
        }

        for i in (1..self.layers.len()).rev() {
            let (done, rest) = self.layers.split_at_mut(i);
            let prev = &mut done[i - 1];
            let layer = &mut rest[0];
            match layer.kind {
                LayerKind::FullyConnected { .. } => dense::backward(layer, prev),
                LayerKind::Convolutional { .. } => conv2d::backward(layer, prev),
                LayerKind::Recurrent { .. } => recurrent::backward(layer, prev),
                LayerKind::Input => panic!("Layer{} is an input inside the chain", i),
            }
        }
    }

    /// Mean squared value of the current errors of layer `index`.
    pub fn error_total(&self, index: usize) -> f64 {
        let errors = self.layers[index].errors();
        let total: f64 = errors.iter().map(|e| e * e).sum();
        total / errors.len() as f64
    }

    /// Apply accumulated gradients to layer `index` and every layer before it,
    /// then clear the accumulators.
    pub fn update(&mut self, index: usize, rate: f64) {
        let sgd = SGD::new(rate);
        for layer in self.layers[..=index].iter_mut().rev() {
            sgd.apply(&mut layer.biases, &mut layer.u_biases);
            sgd.apply(&mut layer.weights, &mut layer.u_weights);
            if let LayerKind::Recurrent {
                hweights,
                u_hweights,
                ..
            } = &mut layer.kind
            {
                sgd.apply(hweights, u_hweights);
            }
        }
    }

    /// Zero the current output of layer `index`, breaking recurrence continuity
    /// between independent sequences. Weights are untouched.
    pub fn reset(&mut self, index: usize) {
        self.layers[index].reset();
    }

    /// [`Network::reset`] every layer.
    pub fn reset_all(&mut self) {
        for layer in &mut self.layers {
            layer.reset();
        }
    }

    /// Write a human-readable rendering of layer `index`.
    pub fn dump<W: Write>(&self, index: usize, out: &mut W) -> io::Result<()> {
        let prev = index.checked_sub(1).map(|p| &self.layers[p]);
        self.layers[index].dump(prev, out)
    }

    /// Dump every layer in chain order.
    pub fn dump_all<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for index in 0..self.layers.len() {
            self.dump(index, out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_follow_chain_order() {
        let mut rng = SimpleRng::new(1);
        let mut net = Network::input(1, 4, 4);
        assert_eq!(net.add_conv(2, 2, 2, 3, 1, 2, 0.1, &mut rng), 1);
        assert_eq!(net.add_full(3, 0.1, &mut rng), 2);
        assert_eq!(net.tail(), 2);
        assert_eq!(net.len(), 3);
        assert_eq!(net.layer(2).id(), 2);
    }

    #[test]
    fn test_error_total_is_mean_square() {
        let mut rng = SimpleRng::new(1);
        let mut net = Network::input(2, 1, 1);
        let tail = net.add_full(2, 0.1, &mut rng);
        net.set_inputs(&[0.0, 0.0]);
        // zero inputs and zero biases: softmax gives [0.5, 0.5]
        net.learn_outputs(&[1.0, 0.0]);

        assert!((net.error_total(tail) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_dump_all_lists_every_layer() {
        let mut rng = SimpleRng::new(1);
        let mut net = Network::input(2, 1, 1);
        net.add_full(2, 0.1, &mut rng);

        let mut text = Vec::new();
        net.dump_all(&mut text).unwrap();
        let text = String::from_utf8(text).unwrap();

        assert!(text.contains("Layer0 [input]"));
        assert!(text.contains("Layer1 [full] (prev=Layer0)"));
    }
}
