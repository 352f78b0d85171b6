//! Recurrent kernel with truncated backpropagation through time
//!
//! A recurrent layer keeps the last `window` hidden states in its output ring
//! (timestep 0 first). Each forward step shifts the ring one slot into the past
//! and computes the new state from the predecessor's current output and the
//! previous hidden state:
//!
//! `h_t = tanh(b + Wx · x_t + Wh · h_{t-1})`
//!
//! The backward step walks the retained window from the most recent timestep
//! outwards, carrying error through `Wh` into the next older slot.

use log::trace;

use crate::layers::{Layer, LayerKind};
use crate::utils::tanh_g;

/// Forward step of a recurrent layer.
pub(crate) fn forward(layer: &mut Layer, prev: &Layer) {
    let n = layer.nnodes();
    let inputs = prev.outputs();
    let nprev = inputs.len();

    let LayerKind::Recurrent { hweights, net, .. } = &mut layer.kind else {
        panic!("Layer{} is not recurrent", layer.id);
    };

    // Timestep 0 still holds h_{t-1}; compute every net input before it is
    // overwritten so a window of 1 behaves the same as a longer one.
    for i in 0..n {
        let mut h = layer.biases[i];
        let xrow = &layer.weights[i * nprev..(i + 1) * nprev];
        for (&x, &w) in inputs.iter().zip(xrow) {
            h += x * w;
        }
        let hrow = &hweights[i * n..(i + 1) * n];
        for (&prior, &w) in layer.outputs[..n].iter().zip(hrow) {
            h += prior * w;
        }
        net[i] = h;
    }

    let n_window = layer.window;
    if n_window > 1 {
        layer.outputs.copy_within(0..(n_window - 1) * n, n);
    }
    for i in 0..n {
        let y = net[i].tanh();
        layer.outputs[i] = y;
        layer.gradients[i] = tanh_g(y);
    }

    trace!("Layer{} forward: outputs={:?}", layer.id, &layer.outputs[..n]);
}

/// Backward step over the retained window.
///
/// For every timestep `t` the local delta is `errors[t] · tanh'(outputs[t])`.
/// Input-to-hidden gradients and the predecessor's error for timestep `t` are
/// produced only when the predecessor also retains timestep `t + 1`;
/// hidden-to-hidden gradients and the recurrent error carried into slot `t + 1`
/// only when this layer does. Afterwards the error ring is shifted so it lines
/// up with the output ring after the next forward step.
pub(crate) fn backward(layer: &mut Layer, prev: &mut Layer) {
    let n = layer.nnodes();
    let nprev = prev.nnodes();
    let window = layer.window;
    let prev_window = prev.window;

    prev.errors[..nprev].fill(0.0);

    let LayerKind::Recurrent {
        hweights,
        u_hweights,
        ..
    } = &mut layer.kind
    else {
        panic!("Layer{} is not recurrent", layer.id);
    };

    for t in 0..window {
        let i0 = t * n;
        let i1 = (t + 1) * n;
        let j0 = t * nprev;
        for i in 0..n {
            let dnet = layer.errors[i0 + i] * tanh_g(layer.outputs[i0 + i]);
            if t + 1 < prev_window {
                let base = i * nprev;
                for j in 0..nprev {
                    prev.errors[j0 + j] += layer.weights[base + j] * dnet;
                    layer.u_weights[base + j] += dnet * prev.outputs[j0 + j];
                }
            }
            if t + 1 < window {
                let base = i * n;
                for j in 0..n {
                    layer.errors[i1 + j] += hweights[base + j] * dnet;
                    u_hweights[base + j] += dnet * layer.outputs[i1 + j];
                }
            }
            layer.u_biases[i] += dnet;
        }
    }

    layer.shift_errors();

    trace!("Layer{} backward: u_biases={:?}", layer.id, layer.u_biases);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Shape;
    use crate::utils::SimpleRng;

    fn chain(window: usize) -> (Layer, Layer) {
        let mut rng = SimpleRng::new(3);
        let input = Layer::new_input(Shape::flat(2), window);
        let layer = Layer::new_recurrent(&input, 2, window, 0.1, &mut rng);
        (input, layer)
    }

    #[test]
    fn test_forward_uses_previous_state() {
        let (mut input, mut layer) = chain(2);
        layer.weights.copy_from_slice(&[1.0, 0.0, 0.0, 1.0]);
        if let Some(h) = layer.hweights_mut() {
            h.copy_from_slice(&[0.5, 0.0, 0.0, 0.5]);
        }

        input.outputs[..2].copy_from_slice(&[0.2, -0.4]);
        forward(&mut layer, &input);
        let first = [0.2f64.tanh(), (-0.4f64).tanh()];
        assert!((layer.outputs[0] - first[0]).abs() < 1e-12);
        assert!((layer.outputs[1] - first[1]).abs() < 1e-12);

        forward(&mut layer, &input);
        let second = (0.2 + 0.5 * first[0]).tanh();
        assert!((layer.outputs[0] - second).abs() < 1e-12);
        // The first state moved one slot into the past.
        assert!((layer.outputs[2] - first[0]).abs() < 1e-12);
        assert!((layer.outputs[3] - first[1]).abs() < 1e-12);
    }

    #[test]
    fn test_forward_window_one_reads_prior_state() {
        let (mut input, mut layer) = chain(1);
        layer.weights.fill(0.0);
        if let Some(h) = layer.hweights_mut() {
            h.copy_from_slice(&[1.0, 0.0, 0.0, 1.0]);
        }
        layer.outputs.copy_from_slice(&[0.3, 0.6]);
        input.outputs.fill(0.0);

        forward(&mut layer, &input);

        assert!((layer.outputs[0] - 0.3f64.tanh()).abs() < 1e-12);
        assert!((layer.outputs[1] - 0.6f64.tanh()).abs() < 1e-12);
    }

    #[test]
    fn test_backward_carries_error_into_older_slot() {
        let (mut input, mut layer) = chain(2);
        layer.weights.fill(0.0);
        if let Some(h) = layer.hweights_mut() {
            h.copy_from_slice(&[1.0, 0.0, 0.0, 1.0]);
        }
        layer.outputs.fill(0.0);
        layer.errors.copy_from_slice(&[1.0, 2.0, 0.0, 0.0]);

        backward(&mut layer, &mut input);

        // With all outputs at zero tanh' is 1: slot 1 receives Wh · delta_0,
        // which then also contributes its own delta to the biases.
        assert_eq!(layer.u_biases, vec![2.0, 4.0]);
        // After the shift slot 1 mirrors slot 0.
        assert_eq!(layer.errors, vec![1.0, 2.0, 1.0, 2.0]);
        // The input retains two timesteps, so only t = 0 reaches it.
        assert_eq!(input.errors, vec![0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_backward_skips_input_gradient_without_history() {
        let (mut input, mut layer) = chain(1);
        input.outputs.fill(1.0);
        layer.errors.fill(1.0);

        backward(&mut layer, &mut input);

        assert!(layer.u_weights.iter().all(|&w| w == 0.0));
        assert!(layer.u_hweights().unwrap().iter().all(|&w| w == 0.0));
        assert!(layer.u_biases.iter().all(|&b| b != 0.0));
    }
}
