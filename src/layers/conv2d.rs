//! 2D convolutional kernel
//!
//! Strided correlation (no kernel flip) with implicit zero padding. Output
//! position `(x1, y1)` of channel `z1` reads the `kernel_size × kernel_size`
//! window whose top-left corner is `(stride·x1 - padding, stride·y1 - padding)`
//! in every input channel. Window positions that fall outside the input are
//! skipped rather than materialized, so they contribute nothing to the output,
//! the propagated error, or the weight gradients.
//!
//! Layouts: outputs and inputs are `[z][y][x]`, weights are `[z1][z0][dy][dx]`.

use log::trace;

use crate::layers::{Layer, LayerKind, Shape};
use crate::utils::{relu, relu_g};

/// Geometry needed to walk the receptive fields of a layer.
struct Geometry {
    kernel_size: usize,
    padding: isize,
    stride: isize,
    input: Shape,
}

impl Geometry {
    fn of(layer: &Layer, prev: &Layer) -> Self {
        match layer.kind {
            LayerKind::Convolutional {
                kernel_size,
                padding,
                stride,
            } => Self {
                kernel_size,
                padding: padding as isize,
                stride: stride as isize,
                input: prev.shape,
            },
            _ => panic!("Layer{} is not convolutional", layer.id),
        }
    }

    /// Visit every (input index, weight index) pair that output position
    /// `(z1, y1, x1)` reads, skipping padded coordinates.
    #[inline]
    fn for_each_tap<F: FnMut(usize, usize)>(&self, z1: usize, y1: usize, x1: usize, mut visit: F) {
        let k = self.kernel_size;
        let in_width = self.input.width as isize;
        let in_height = self.input.height as isize;
        let plane = self.input.width * self.input.height;

        let y0 = self.stride * y1 as isize - self.padding;
        let x0 = self.stride * x1 as isize - self.padding;
        let qbase = z1 * self.input.depth * k * k;

        for z0 in 0..self.input.depth {
            let pbase = z0 * plane;
            let qchannel = qbase + z0 * k * k;
            for dy in 0..k {
                let y = y0 + dy as isize;
                if y < 0 || y >= in_height {
                    continue;
                }
                let p = pbase + y as usize * self.input.width;
                let q = qchannel + dy * k;
                for dx in 0..k {
                    let x = x0 + dx as isize;
                    if x < 0 || x >= in_width {
                        continue;
                    }
                    visit(p + x as usize, q + dx);
                }
            }
        }
    }
}

/// Forward pass: correlation plus bias, then ReLU.
pub(crate) fn forward(layer: &mut Layer, prev: &Layer) {
    let geometry = Geometry::of(layer, prev);
    let inputs = prev.outputs();

    let mut i = 0;
    for z1 in 0..layer.shape.depth {
        for y1 in 0..layer.shape.height {
            for x1 in 0..layer.shape.width {
                let mut v = layer.biases[z1];
                let weights = &layer.weights;
                geometry.for_each_tap(z1, y1, x1, |p, q| {
                    v += inputs[p] * weights[q];
                });
                let y = relu(v);
                layer.outputs[i] = y;
                layer.gradients[i] = relu_g(y);
                i += 1;
            }
        }
    }
    debug_assert_eq!(i, layer.nnodes());

    trace!("Layer{} forward: outputs={:?}", layer.id, layer.outputs());
}

/// Backward pass: the forward receptive fields run in reverse.
pub(crate) fn backward(layer: &mut Layer, prev: &mut Layer) {
    let geometry = Geometry::of(layer, prev);
    let nprev = prev.nnodes();
    prev.errors[..nprev].fill(0.0);

    let mut i = 0;
    for z1 in 0..layer.shape.depth {
        for y1 in 0..layer.shape.height {
            for x1 in 0..layer.shape.width {
                let dnet = layer.errors[i] * layer.gradients[i];
                let weights = &layer.weights;
                let u_weights = &mut layer.u_weights;
                let prev_errors = &mut prev.errors;
                let prev_outputs = &prev.outputs;
                geometry.for_each_tap(z1, y1, x1, |p, q| {
                    prev_errors[p] += weights[q] * dnet;
                    u_weights[q] += dnet * prev_outputs[p];
                });
                layer.u_biases[z1] += dnet;
                i += 1;
            }
        }
    }
    debug_assert_eq!(i, layer.nnodes());

    trace!("Layer{} backward: u_biases={:?}", layer.id, layer.u_biases);
}
