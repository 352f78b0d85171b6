//! Minibatch training helpers shared by the binaries
//!
//! Gradients accumulate inside the network on every `learn_outputs` call;
//! `Trainer` decides when they are applied.

use log::debug;

use crate::config::TrainingConfig;
use crate::network::Network;

/// Drives one network through single-sample training steps.
#[derive(Debug, Clone)]
pub struct Trainer {
    learning_rate: f64,
    batch_size: usize,
    step: usize,
}

impl Trainer {
    /// Creates a trainer applying `learning_rate / batch_size` every
    /// `batch_size` samples.
    ///
    /// # Panics
    ///
    /// Panics if `batch_size` is zero.
    pub fn new(learning_rate: f64, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch_size must be greater than 0");
        Self {
            learning_rate,
            batch_size,
            step: 0,
        }
    }

    pub fn from_config(config: &TrainingConfig) -> Self {
        Self::new(config.learning_rate, config.batch_size())
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Samples seen so far.
    pub fn step(&self) -> usize {
        self.step
    }

    fn effective_rate(&self) -> f64 {
        self.learning_rate / self.batch_size as f64
    }

    /// Forward `input`, backpropagate against `target`, and update the whole
    /// chain when the step counter sits on a batch boundary.
    ///
    /// Returns the tail's error total for this sample.
    pub fn train_sample(&mut self, net: &mut Network, input: &[f64], target: &[f64]) -> f64 {
        net.set_inputs(input);
        net.learn_outputs(target);
        let tail = net.tail();
        let error = net.error_total(tail);
        if self.step % self.batch_size == 0 {
            net.update(tail, self.effective_rate());
        }
        self.step += 1;
        error
    }

    /// Apply whatever has accumulated since the last update.
    pub fn flush(&mut self, net: &mut Network) {
        debug!("flushing accumulated gradients at step {}", self.step);
        let tail = net.tail();
        net.update(tail, self.effective_rate());
    }
}

/// Run the forward pass on `input` and return the tail outputs.
pub fn predict<'a>(net: &'a mut Network, input: &[f64]) -> &'a [f64] {
    net.set_inputs(input);
    let tail = net.tail();
    net.outputs(tail)
}

/// Index of the largest value; the first one wins ties.
///
/// # Panics
///
/// Panics if `values` is empty.
pub fn argmax(values: &[f64]) -> usize {
    assert!(!values.is_empty(), "argmax of an empty slice");
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Write the one-hot encoding of `label` into `out`.
pub fn one_hot(label: usize, out: &mut [f64]) {
    assert!(
        label < out.len(),
        "label {} out of range for {} classes",
        label,
        out.len()
    );
    out.fill(0.0);
    out[label] = 1.0;
}

/// Running mean of per-sample error totals between progress reports.
#[derive(Debug, Clone, Default)]
pub struct ErrorWindow {
    sum: f64,
    count: usize,
}

impl ErrorWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: f64) {
        self.sum += error;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean of the pushed values, 0 when nothing was pushed.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Return the mean and start a new window.
    pub fn take_mean(&mut self) -> f64 {
        let mean = self.mean();
        *self = Self::default();
        mean
    }
}
