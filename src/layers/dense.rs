//! Fully-connected kernel
//!
//! Every output unit `i` sees every predecessor value `j` through the row-major
//! weight `weights[i * nnodes_prev + j]`:
//!
//! `net_i = bias_i + Σ_j prev_j · w_ij`, followed by the layer's activation.

use log::trace;

use crate::layers::{DenseActivation, Layer, LayerKind};
use crate::utils::{sigmoid, sigmoid_g, softmax_inplace, tanh_g};

fn activation_of(layer: &Layer) -> DenseActivation {
    match layer.kind {
        LayerKind::FullyConnected { activation } => activation,
        _ => panic!("Layer{} is not fully-connected", layer.id),
    }
}

/// Forward pass of a fully-connected layer.
///
/// `terminal` tells whether the layer is the chain tail, which selects the
/// softmax branch of [`DenseActivation::TanhSoftmax`].
pub(crate) fn forward(layer: &mut Layer, prev: &Layer, terminal: bool) {
    let activation = activation_of(layer);
    let n = layer.nnodes();
    let inputs = prev.outputs();

    for (i, row) in layer.weights.chunks_exact(inputs.len()).enumerate() {
        let mut x = layer.biases[i];
        for (&input, &weight) in inputs.iter().zip(row) {
            x += input * weight;
        }
        layer.outputs[i] = x;
    }

    let outputs = &mut layer.outputs[..n];
    match activation {
        DenseActivation::Sigmoid => {
            for (y, g) in outputs.iter_mut().zip(layer.gradients.iter_mut()) {
                *y = sigmoid(*y);
                *g = sigmoid_g(*y);
            }
        }
        DenseActivation::TanhSoftmax if terminal => {
            softmax_inplace(outputs);
            layer.gradients.fill(1.0);
        }
        DenseActivation::TanhSoftmax => {
            for (y, g) in outputs.iter_mut().zip(layer.gradients.iter_mut()) {
                *y = y.tanh();
                *g = tanh_g(*y);
            }
        }
    }

    trace!("Layer{} forward: outputs={:?}", layer.id, layer.outputs());
}

/// Backward pass of a fully-connected layer.
///
/// Overwrites the predecessor's current errors with the propagated signal and
/// adds this sample's contribution to the weight and bias accumulators.
pub(crate) fn backward(layer: &mut Layer, prev: &mut Layer) {
    let nprev = prev.nnodes();
    prev.errors[..nprev].fill(0.0);

    for i in 0..layer.nnodes() {
        let dnet = layer.errors[i] * layer.gradients[i];
        let base = i * nprev;
        for j in 0..nprev {
            prev.errors[j] += layer.weights[base + j] * dnet;
            layer.u_weights[base + j] += dnet * prev.outputs[j];
        }
        layer.u_biases[i] += dnet;
    }

    trace!("Layer{} backward: u_biases={:?}", layer.id, layer.u_biases);
}
