//! The layer record shared by every kind of stage in a chain
//!
//! A `Layer` owns all of its buffers. They are sized once, when the layer is
//! created, from its shape, its kind and the shape of its predecessor; no pass
//! ever resizes them.

use std::io::{self, Write};

use crate::utils::SimpleRng;

/// Output shape of a layer: `depth` channels of `height × width` values.
///
/// Dense and recurrent layers use `(nnodes, 1, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub depth: usize,
    pub width: usize,
    pub height: usize,
}

impl Shape {
    pub fn new(depth: usize, width: usize, height: usize) -> Self {
        Self {
            depth,
            width,
            height,
        }
    }

    /// Shape of a flat layer with `nnodes` units.
    pub fn flat(nnodes: usize) -> Self {
        Self::new(nnodes, 1, 1)
    }

    /// Total output cardinality, `depth * width * height`.
    pub fn nnodes(&self) -> usize {
        self.depth * self.width * self.height
    }
}

/// Activation policy of a fully-connected layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenseActivation {
    /// Sigmoid on every unit, whether or not the layer is the chain tail.
    Sigmoid,
    /// Tanh while the layer has a successor, softmax when it is the tail.
    ///
    /// The softmax gradient buffer is fixed at 1 per unit instead of modelling
    /// the full Jacobian. Paired with `output - target` errors this yields the
    /// exact softmax/cross-entropy delta; with any other loss it is only an
    /// approximation.
    TanhSoftmax,
}

/// Kind-specific parameters of a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    /// Head of the chain. Holds values but no trainable parameters.
    Input,
    FullyConnected {
        activation: DenseActivation,
    },
    Convolutional {
        kernel_size: usize,
        padding: usize,
        stride: usize,
    },
    /// Recurrent layer trained with truncated backpropagation through time.
    ///
    /// The layer's common `weights` hold the input-to-hidden matrix; the
    /// hidden-to-hidden matrix and its accumulator live here.
    Recurrent {
        hweights: Vec<f64>,
        u_hweights: Vec<f64>,
        /// Pre-activation scratch for one timestep.
        net: Vec<f64>,
    },
}

impl LayerKind {
    /// Short lowercase name used in dumps and log lines.
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Input => "input",
            LayerKind::FullyConnected { .. } => "full",
            LayerKind::Convolutional { .. } => "conv",
            LayerKind::Recurrent { .. } => "recurrent",
        }
    }
}

/// One stage of a layer chain.
///
/// `outputs` and `errors` hold `window` snapshots of `nnodes` values each,
/// timestep 0 (the most recent) first. Every kind except recurrent layers and
/// sequence inputs has a window of 1.
#[derive(Debug, Clone)]
pub struct Layer {
    pub(crate) id: usize,
    pub(crate) shape: Shape,
    pub(crate) window: usize,
    pub(crate) outputs: Vec<f64>,
    pub(crate) gradients: Vec<f64>,
    pub(crate) errors: Vec<f64>,
    pub(crate) biases: Vec<f64>,
    pub(crate) u_biases: Vec<f64>,
    pub(crate) weights: Vec<f64>,
    pub(crate) u_weights: Vec<f64>,
    pub(crate) kind: LayerKind,
}

impl Layer {
    fn with_buffers(
        id: usize,
        shape: Shape,
        window: usize,
        nbiases: usize,
        nweights: usize,
        kind: LayerKind,
    ) -> Self {
        let nnodes = shape.nnodes();
        assert!(nnodes > 0, "layer must have at least one node");
        assert!(window > 0, "window must be greater than 0");

        Self {
            id,
            shape,
            window,
            outputs: vec![0.0; nnodes * window],
            gradients: vec![0.0; nnodes],
            errors: vec![0.0; nnodes * window],
            biases: vec![0.0; nbiases],
            u_biases: vec![0.0; nbiases],
            weights: vec![0.0; nweights],
            u_weights: vec![0.0; nweights],
            kind,
        }
    }

    pub(crate) fn new_input(shape: Shape, window: usize) -> Self {
        Self::with_buffers(0, shape, window, 0, 0, LayerKind::Input)
    }

    pub(crate) fn new_full(
        prev: &Layer,
        nnodes: usize,
        std: f64,
        activation: DenseActivation,
        rng: &mut SimpleRng,
    ) -> Self {
        let mut layer = Self::with_buffers(
            prev.id + 1,
            Shape::flat(nnodes),
            1,
            nnodes,
            nnodes * prev.nnodes(),
            LayerKind::FullyConnected { activation },
        );
        fill_normal(&mut layer.weights, std, rng);
        layer
    }

    pub(crate) fn new_conv(
        prev: &Layer,
        shape: Shape,
        kernel_size: usize,
        padding: usize,
        stride: usize,
        std: f64,
        rng: &mut SimpleRng,
    ) -> Self {
        assert!(shape.nnodes() > 0, "layer must have at least one node");
        assert!(kernel_size > 0, "kernel_size must be greater than 0");
        assert!(kernel_size % 2 == 1, "kernel_size must be odd, got {}", kernel_size);
        assert!(stride > 0, "stride must be greater than 0");
        assert!(
            (shape.width - 1) * stride + kernel_size <= prev.shape.width + 2 * padding,
            "convolution width {} does not fit input width {} (kernel {}, padding {}, stride {})",
            shape.width,
            prev.shape.width,
            kernel_size,
            padding,
            stride
        );
        assert!(
            (shape.height - 1) * stride + kernel_size <= prev.shape.height + 2 * padding,
            "convolution height {} does not fit input height {} (kernel {}, padding {}, stride {})",
            shape.height,
            prev.shape.height,
            kernel_size,
            padding,
            stride
        );

        let mut layer = Self::with_buffers(
            prev.id + 1,
            shape,
            1,
            shape.depth,
            shape.depth * prev.shape.depth * kernel_size * kernel_size,
            LayerKind::Convolutional {
                kernel_size,
                padding,
                stride,
            },
        );
        fill_normal(&mut layer.weights, std, rng);
        layer
    }

    pub(crate) fn new_recurrent(
        prev: &Layer,
        nnodes: usize,
        window: usize,
        std: f64,
        rng: &mut SimpleRng,
    ) -> Self {
        let mut layer = Self::with_buffers(
            prev.id + 1,
            Shape::flat(nnodes),
            window,
            nnodes,
            nnodes * prev.nnodes(),
            LayerKind::Recurrent {
                hweights: vec![0.0; nnodes * nnodes],
                u_hweights: vec![0.0; nnodes * nnodes],
                net: vec![0.0; nnodes],
            },
        );
        fill_normal(&mut layer.weights, std, rng);
        if let LayerKind::Recurrent { hweights, .. } = &mut layer.kind {
            fill_normal(hweights, std, rng);
        }
        layer
    }

    /// Position of the layer in its chain.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn nnodes(&self) -> usize {
        self.shape.nnodes()
    }

    /// Number of retained timesteps.
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    /// Current (timestep 0) outputs.
    pub fn outputs(&self) -> &[f64] {
        &self.outputs[..self.nnodes()]
    }

    /// Every stored output snapshot, most recent first.
    pub fn history(&self) -> &[f64] {
        &self.outputs
    }

    /// Output snapshot `t` steps in the past.
    pub fn snapshot(&self, t: usize) -> &[f64] {
        assert!(t < self.window, "timestep {} outside window {}", t, self.window);
        let n = self.nnodes();
        &self.outputs[t * n..(t + 1) * n]
    }

    pub fn gradients(&self) -> &[f64] {
        &self.gradients
    }

    /// Current (timestep 0) errors.
    pub fn errors(&self) -> &[f64] {
        &self.errors[..self.nnodes()]
    }

    /// Every stored error snapshot, most recent first.
    pub fn error_history(&self) -> &[f64] {
        &self.errors
    }

    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    pub fn biases_mut(&mut self) -> &mut [f64] {
        &mut self.biases
    }

    pub fn u_biases(&self) -> &[f64] {
        &self.u_biases
    }

    /// Trained weights. For recurrent layers, the input-to-hidden matrix.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    pub fn u_weights(&self) -> &[f64] {
        &self.u_weights
    }

    /// Hidden-to-hidden weights of a recurrent layer.
    pub fn hweights(&self) -> Option<&[f64]> {
        match &self.kind {
            LayerKind::Recurrent { hweights, .. } => Some(hweights),
            _ => None,
        }
    }

    pub fn hweights_mut(&mut self) -> Option<&mut [f64]> {
        match &mut self.kind {
            LayerKind::Recurrent { hweights, .. } => Some(hweights),
            _ => None,
        }
    }

    pub fn u_hweights(&self) -> Option<&[f64]> {
        match &self.kind {
            LayerKind::Recurrent { u_hweights, .. } => Some(u_hweights),
            _ => None,
        }
    }

    /// Number of trainable parameters (biases and every weight matrix).
    pub fn parameter_count(&self) -> usize {
        self.biases.len() + self.weights.len() + self.hweights().map_or(0, |h| h.len())
    }

    /// Shift output snapshots one step into the past, discarding the oldest.
    /// Timestep 0 keeps its value until overwritten.
    pub(crate) fn shift_outputs(&mut self) {
        let n = self.nnodes();
        shift_ring(&mut self.outputs, n);
    }

    pub(crate) fn shift_errors(&mut self) {
        let n = self.nnodes();
        shift_ring(&mut self.errors, n);
    }

    /// Zero the current output snapshot.
    pub(crate) fn reset(&mut self) {
        let n = self.nnodes();
        self.outputs[..n].fill(0.0);
    }

    /// Write a human-readable rendering of the layer.
    pub fn dump<W: Write>(&self, prev: Option<&Layer>, out: &mut W) -> io::Result<()> {
        write!(out, "Layer{} [{}] ", self.id, self.kind.name())?;
        if let Some(prev) = prev {
            write!(out, "(prev=Layer{}) ", prev.id)?;
        }
        writeln!(
            out,
            "shape=({},{},{}), nodes={}, window={}",
            self.shape.depth,
            self.shape.width,
            self.shape.height,
            self.nnodes(),
            self.window
        )?;

        let plane = self.shape.width * self.shape.height;
        for t in 0..self.window {
            let snapshot = self.snapshot(t);
            if self.window > 1 {
                match t {
                    0 => writeln!(out, "  outputs(t=0):")?,
                    _ => writeln!(out, "  outputs(t=-{}):", t)?,
                }
            }
            for (z, channel) in snapshot.chunks(plane).enumerate() {
                writeln!(out, "  {}:", z)?;
                for row in channel.chunks(self.shape.width) {
                    writeln!(out, "    [{}]", format_values(row))?;
                }
            }
        }

        match &self.kind {
            LayerKind::Input => {}
            LayerKind::FullyConnected { activation } => {
                let fan_in = self.weights.len() / self.nnodes();
                writeln!(out, "  activation={:?}", activation)?;
                writeln!(out, "  biases = [{}]", format_values(&self.biases))?;
                writeln!(out, "  weights = [")?;
                for row in self.weights.chunks(fan_in) {
                    writeln!(out, "    [{}]", format_values(row))?;
                }
                writeln!(out, "  ]")?;
            }
            LayerKind::Convolutional {
                kernel_size,
                padding,
                stride,
            } => {
                writeln!(
                    out,
                    "  stride={}, padding={}, kernel_size={}",
                    stride, padding, kernel_size
                )?;
                let per_channel = self.weights.len() / self.shape.depth;
                for (z, kernel) in self.weights.chunks(per_channel).enumerate() {
                    writeln!(
                        out,
                        "  {}: bias={:.4}, weights = [{}]",
                        z,
                        self.biases[z],
                        format_values(kernel)
                    )?;
                }
            }
            LayerKind::Recurrent { hweights, .. } => {
                let n = self.nnodes();
                let fan_in = self.weights.len() / n;
                for (i, row) in self.weights.chunks(fan_in).enumerate() {
                    writeln!(out, "  xweights({}) = [{}]", i, format_values(row))?;
                }
                for (i, row) in hweights.chunks(n).enumerate() {
                    writeln!(out, "  hweights({}) = [{}]", i, format_values(row))?;
                }
                writeln!(out, "  biases = [{}]", format_values(&self.biases))?;
            }
        }
        Ok(())
    }
}

fn fill_normal(values: &mut [f64], std: f64, rng: &mut SimpleRng) {
    for value in values.iter_mut() {
        *value = std * rng.next_normal();
    }
}

fn shift_ring(buffer: &mut [f64], n: usize) {
    let window = buffer.len() / n;
    for t in (1..window).rev() {
        buffer.copy_within((t - 1) * n..t * n, t * n);
    }
}

fn format_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{:.4}", v))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_nnodes() {
        assert_eq!(Shape::new(16, 14, 14).nnodes(), 16 * 14 * 14);
        assert_eq!(Shape::flat(10), Shape::new(10, 1, 1));
    }

    #[test]
    fn test_shift_ring_discards_oldest() {
        let mut ring = vec![1.0, 1.5, 2.0, 2.5, 3.0, 3.5];
        shift_ring(&mut ring, 2);
        assert_eq!(ring, vec![1.0, 1.5, 1.0, 1.5, 2.0, 2.5]);
    }

    #[test]
    fn test_shift_ring_single_snapshot() {
        let mut ring = vec![4.0, 5.0];
        shift_ring(&mut ring, 2);
        assert_eq!(ring, vec![4.0, 5.0]);
    }

    #[test]
    fn test_biases_start_at_zero() {
        let mut rng = SimpleRng::new(42);
        let input = Layer::new_input(Shape::flat(4), 1);
        let layer = Layer::new_full(&input, 3, 0.1, DenseActivation::Sigmoid, &mut rng);

        assert!(layer.biases().iter().all(|&b| b == 0.0));
        assert!(layer.weights().iter().any(|&w| w != 0.0));
        assert_eq!(layer.id(), 1);
    }

    #[test]
    fn test_dump_full_layer() {
        let mut rng = SimpleRng::new(1);
        let input = Layer::new_input(Shape::flat(2), 1);
        let layer = Layer::new_full(&input, 1, 0.1, DenseActivation::Sigmoid, &mut rng);

        let mut text = Vec::new();
        layer.dump(Some(&input), &mut text).unwrap();
        let text = String::from_utf8(text).unwrap();

        assert!(text.starts_with("Layer1 [full] (prev=Layer0) shape=(1,1,1), nodes=1"));
        assert!(text.contains("biases = [0.0000]"));
    }
}
