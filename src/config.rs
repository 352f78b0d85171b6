//! Configuration structures for training
//!
//! Training hyper-parameters can be supplied to the binaries as a JSON file
//! instead of the built-in defaults.

use serde::Deserialize;
use std::error::Error;
use std::fs;

use crate::utils::SimpleRng;

const DEFAULT_BATCH_SIZE: usize = 1;
const DEFAULT_LOG_INTERVAL: usize = 1000;

/// Configuration for a training run.
///
/// Only `learning_rate` and `epochs` are required. What an "epoch" counts is
/// up to the driver: the MNIST binary runs `epochs` passes worth of random
/// samples, the recurrent binary runs `epochs` independent sequences.
///
/// # Example
///
/// ```json
/// {
///   "learning_rate": 0.1,
///   "epochs": 10,
///   "batch_size": 32,
///   "seed": 0,
///   "log_interval": 1000
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainingConfig {
    /// Step size passed to `Network::update` (before division by `batch_size`)
    pub learning_rate: f64,

    /// Number of epochs to train
    pub epochs: usize,

    /// Samples accumulated between updates (default 1)
    pub batch_size: Option<usize>,

    /// Seed for weight initialization and sample selection; time-based when absent
    pub seed: Option<u64>,

    /// Samples between progress log lines (default 1000)
    pub log_interval: Option<usize>,

    /// Standard deviation of initial dense and convolutional weights
    pub init_std: Option<f64>,
}

impl TrainingConfig {
    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    pub fn log_interval(&self) -> usize {
        self.log_interval.unwrap_or(DEFAULT_LOG_INTERVAL)
    }

    /// Generator seeded from `seed`, or from the clock when no seed is set.
    pub fn rng(&self) -> SimpleRng {
        match self.seed {
            Some(seed) => SimpleRng::new(seed),
            None => SimpleRng::from_time(),
        }
    }
}

/// Loads a training configuration from a JSON file.
///
/// Reads the file at `path` and deserializes its JSON contents into a `TrainingConfig`.
///
/// # Returns
///
/// `Ok(TrainingConfig)` on success, or an error if the file cannot be read, the JSON is
/// invalid, or a value is out of range.
///
/// # Examples
///
/// ```no_run
/// use neural_chain::config::load_config;
///
/// let cfg = load_config("config/training/mnist_cnn.json").unwrap();
/// assert_eq!(cfg.batch_size(), 32);
/// ```
pub fn load_config(path: &str) -> Result<TrainingConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: TrainingConfig = serde_json::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

fn invalid(message: &str) -> Box<dyn Error> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message.to_string(),
    ))
}

/// Checks that every value in `config` is usable.
pub fn validate_config(config: &TrainingConfig) -> Result<(), Box<dyn Error>> {
    if config.learning_rate.is_nan() || config.learning_rate <= 0.0 {
        return Err(invalid("learning_rate must be positive"));
    }

    if config.epochs == 0 {
        return Err(invalid("epochs must be greater than 0"));
    }

    if config.batch_size == Some(0) {
        return Err(invalid("batch_size must be greater than 0"));
    }

    if config.log_interval == Some(0) {
        return Err(invalid("log_interval must be greater than 0"));
    }

    if let Some(std) = config.init_std {
        if std.is_nan() || std <= 0.0 {
            return Err(invalid("init_std must be positive"));
        }
    }

    Ok(())
}
