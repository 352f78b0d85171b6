//! Architecture configuration structures
//!
//! A linear chain can be described in JSON instead of code: an input shape
//! followed by the layers to append, in order. Every layer's shape is checked
//! against its predecessor while the file is validated, so a bad description
//! is reported as an error before any layer constructor runs.

use serde::Deserialize;
use std::error::Error;
use std::fs;

use crate::layers::{DenseActivation, Shape};
use crate::network::Network;
use crate::utils::rng::SimpleRng;

/// Weight scale used when a dense or convolutional layer gives no `std`.
pub const DEFAULT_INIT_STD: f64 = 0.1;

/// Shape of the input layer.
///
/// A `window` above 1 makes a sequence input retaining that many timesteps;
/// sequence inputs must be flat (`width` and `height` of 1).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InputConfig {
    pub depth: usize,
    pub width: usize,
    pub height: usize,
    pub window: Option<usize>,
}

/// Configuration for a single layer appended to the chain.
///
/// Different layer types require different fields:
///
/// - **full**: Requires `nodes`; optional `std` (default 0.1) and `activation`
///   (`"tanh_softmax"`, the default, or `"sigmoid"`)
/// - **conv**: Requires `depth`, `width`, `height` and `kernel_size` (odd);
///   optional `padding` (default 0), `stride` (default 1) and `std`
/// - **recurrent**: Requires `nodes`; optional `window` (defaults to the
///   predecessor's window)
///
/// # Examples
///
/// ```json
/// {
///   "layer_type": "conv",
///   "depth": 16,
///   "width": 14,
///   "height": 14,
///   "kernel_size": 3,
///   "padding": 1,
///   "stride": 2
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LayerConfig {
    /// Type of layer: "full", "conv" or "recurrent"
    pub layer_type: String,

    /// Node count of full and recurrent layers
    pub nodes: Option<usize>,

    // Convolutional output shape
    pub depth: Option<usize>,
    pub width: Option<usize>,
    pub height: Option<usize>,

    pub kernel_size: Option<usize>,
    /// Implicit zero padding on every side (default: 0)
    pub padding: Option<usize>,
    /// Stride (default: 1)
    pub stride: Option<usize>,

    /// Standard deviation of the initial weights
    pub std: Option<f64>,

    /// Timesteps retained by a recurrent layer
    pub window: Option<usize>,

    /// Activation policy of a full layer
    pub activation: Option<String>,
}

/// Configuration for the entire chain.
///
/// # Example
///
/// ```json
/// {
///   "input": { "depth": 2, "width": 1, "height": 1 },
///   "layers": [
///     { "layer_type": "full", "nodes": 3, "activation": "sigmoid" },
///     { "layer_type": "full", "nodes": 1, "activation": "sigmoid" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ArchitectureConfig {
    pub input: InputConfig,
    /// Layers appended after the input, in chain order
    pub layers: Vec<LayerConfig>,
}

/// Loads an architecture configuration from a JSON file.
///
/// # Returns
///
/// `Ok(ArchitectureConfig)` on success, or an error if the file cannot be read,
/// the JSON is invalid, or the described chain is inconsistent.
///
/// # Examples
///
/// ```no_run
/// use neural_chain::architecture::load_architecture;
///
/// let arch = load_architecture("config/architectures/mlp_simple.json").unwrap();
/// assert_eq!(arch.layers.len(), 2);
/// ```
pub fn load_architecture(path: &str) -> Result<ArchitectureConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: ArchitectureConfig = serde_json::from_str(&contents)?;
    validate_architecture(&config)?;
    Ok(config)
}

fn invalid(message: String) -> Box<dyn Error> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    ))
}

fn require(value: Option<usize>, index: usize, field: &str) -> Result<usize, Box<dyn Error>> {
    match value {
        None => Err(invalid(format!("Layer {}: missing '{}'", index, field))),
        Some(0) => Err(invalid(format!(
            "Layer {}: {} must be greater than 0",
            index, field
        ))),
        Some(v) => Ok(v),
    }
}

fn parse_activation(name: Option<&str>, index: usize) -> Result<DenseActivation, Box<dyn Error>> {
    match name.map(str::to_lowercase).as_deref() {
        None | Some("tanh_softmax") => Ok(DenseActivation::TanhSoftmax),
        Some("sigmoid") => Ok(DenseActivation::Sigmoid),
        Some(other) => Err(invalid(format!(
            "Layer {}: Invalid activation '{}'. Must be one of: tanh_softmax, sigmoid",
            index, other
        ))),
    }
}

fn check_std(std: Option<f64>, index: usize) -> Result<f64, Box<dyn Error>> {
    let std = std.unwrap_or(DEFAULT_INIT_STD);
    if std.is_nan() || std <= 0.0 {
        return Err(invalid(format!("Layer {}: std must be positive", index)));
    }
    Ok(std)
}

/// Checks one spatial axis against `(size_out - 1) * stride + kernel_size <= size_in + 2 * padding`.
fn check_axis(
    axis: &str,
    size_out: usize,
    size_in: usize,
    kernel_size: usize,
    padding: usize,
    stride: usize,
    index: usize,
) -> Result<(), Box<dyn Error>> {
    if (size_out - 1) * stride + kernel_size > size_in + 2 * padding {
        return Err(invalid(format!(
            "Layer {}: convolution {} {} does not fit input {} {} (kernel_size={}, padding={}, stride={})",
            index, axis, size_out, axis, size_in, kernel_size, padding, stride
        )));
    }
    Ok(())
}

/// A layer whose fields passed validation, ready to be appended.
enum Planned {
    Full {
        nodes: usize,
        std: f64,
        activation: DenseActivation,
    },
    Conv {
        shape: Shape,
        kernel_size: usize,
        padding: usize,
        stride: usize,
        std: f64,
    },
    Recurrent {
        nodes: usize,
        window: usize,
    },
}

/// Validates one layer against the shape and window of its predecessor.
///
/// On success returns the plan for the layer together with its output shape
/// and window, which become the predecessor of the next layer.
fn plan_layer(
    layer: &LayerConfig,
    index: usize,
    prev: Shape,
    prev_window: usize,
) -> Result<(Planned, Shape, usize), Box<dyn Error>> {
    match layer.layer_type.to_lowercase().as_str() {
        "full" => {
            let nodes = require(layer.nodes, index, "nodes")?;
            let std = check_std(layer.std, index)?;
            let activation = parse_activation(layer.activation.as_deref(), index)?;
            Ok((
                Planned::Full {
                    nodes,
                    std,
                    activation,
                },
                Shape::flat(nodes),
                1,
            ))
        }
        "conv" => {
            let depth = require(layer.depth, index, "depth")?;
            let width = require(layer.width, index, "width")?;
            let height = require(layer.height, index, "height")?;
            let kernel_size = require(layer.kernel_size, index, "kernel_size")?;
            if kernel_size % 2 == 0 {
                return Err(invalid(format!(
                    "Layer {}: kernel_size must be odd, got {}",
                    index, kernel_size
                )));
            }
            let padding = layer.padding.unwrap_or(0);
            let stride = layer.stride.unwrap_or(1);
            if stride == 0 {
                return Err(invalid(format!(
                    "Layer {}: stride must be greater than 0",
                    index
                )));
            }
            check_axis("width", width, prev.width, kernel_size, padding, stride, index)?;
            check_axis("height", height, prev.height, kernel_size, padding, stride, index)?;
            let std = check_std(layer.std, index)?;
            let shape = Shape::new(depth, width, height);
            Ok((
                Planned::Conv {
                    shape,
                    kernel_size,
                    padding,
                    stride,
                    std,
                },
                shape,
                1,
            ))
        }
        "recurrent" => {
            let nodes = require(layer.nodes, index, "nodes")?;
            let window = require(layer.window.or(Some(prev_window)), index, "window")?;
            if layer.std.is_some() {
                return Err(invalid(format!(
                    "Layer {}: recurrent layers do not take 'std'",
                    index
                )));
            }
            Ok((
                Planned::Recurrent { nodes, window },
                Shape::flat(nodes),
                window,
            ))
        }
        _ => Err(invalid(format!(
            "Layer {}: Invalid layer type '{}'. Must be one of: full, conv, recurrent",
            index, layer.layer_type
        ))),
    }
}

fn validate_input(input: &InputConfig) -> Result<(Shape, usize), Box<dyn Error>> {
    if input.depth == 0 || input.width == 0 || input.height == 0 {
        return Err(invalid(
            "Input: depth, width and height must be greater than 0".to_string(),
        ));
    }
    let window = input.window.unwrap_or(1);
    if window == 0 {
        return Err(invalid("Input: window must be greater than 0".to_string()));
    }
    if window > 1 && (input.width != 1 || input.height != 1) {
        return Err(invalid(
            "Input: a sequence input (window > 1) must have width and height of 1".to_string(),
        ));
    }
    Ok((Shape::new(input.depth, input.width, input.height), window))
}

fn plan(config: &ArchitectureConfig) -> Result<Vec<Planned>, Box<dyn Error>> {
    if config.layers.is_empty() {
        return Err(invalid(
            "Architecture must contain at least one layer after the input".to_string(),
        ));
    }

    let (mut shape, mut window) = validate_input(&config.input)?;
    let mut planned = Vec::with_capacity(config.layers.len());
    // Layer 0 is the input, so appended layers are numbered from 1.
    for (i, layer) in config.layers.iter().enumerate() {
        let (step, next_shape, next_window) = plan_layer(layer, i + 1, shape, window)?;
        planned.push(step);
        shape = next_shape;
        window = next_window;
    }
    Ok(planned)
}

/// Validates an architecture configuration.
///
/// Checks the input shape, every layer's required fields, and the
/// convolution shape law against the running predecessor shape.
pub fn validate_architecture(config: &ArchitectureConfig) -> Result<(), Box<dyn Error>> {
    plan(config).map(|_| ())
}

/// Builds the described chain, drawing initial weights from `rng`.
///
/// # Errors
///
/// Returns an error if the configuration does not validate; no layer is
/// constructed in that case.
///
/// # Examples
///
/// ```no_run
/// use neural_chain::architecture::{build_network, load_architecture};
/// use neural_chain::utils::rng::SimpleRng;
///
/// let config = load_architecture("config/architectures/mnist_cnn.json").unwrap();
/// let mut rng = SimpleRng::new(0);
/// let net = build_network(&config, &mut rng).unwrap();
/// assert_eq!(net.len(), config.layers.len() + 1);
/// ```
pub fn build_network(
    config: &ArchitectureConfig,
    rng: &mut SimpleRng,
) -> Result<Network, Box<dyn Error>> {
    let planned = plan(config)?;

    let input = &config.input;
    let mut net = match input.window.unwrap_or(1) {
        1 => Network::input(input.depth, input.width, input.height),
        window => Network::sequence_input(input.depth, window),
    };

    for step in planned {
        match step {
            Planned::Full {
                nodes,
                std,
                activation,
            } => {
                net.add_full_with(nodes, std, activation, rng);
            }
            Planned::Conv {
                shape,
                kernel_size,
                padding,
                stride,
                std,
            } => {
                net.add_conv(
                    shape.depth,
                    shape.width,
                    shape.height,
                    kernel_size,
                    padding,
                    stride,
                    std,
                    rng,
                );
            }
            Planned::Recurrent { nodes, window } => {
                net.add_recurrent(nodes, window, rng);
            }
        }
    }

    Ok(net)
}
