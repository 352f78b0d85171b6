use log::{error, info};
use neural_chain::architecture::{build_network, load_architecture};
use neural_chain::config::{load_config, TrainingConfig};
use neural_chain::layers::DenseActivation;
use neural_chain::network::Network;
use neural_chain::trainer::{ErrorWindow, Trainer};
use neural_chain::utils::SimpleRng;
use std::env;
use std::io;
use std::process;

// Small sigmoid network learning |a - b| on [0, 1]^2 (educational example).
const NUM_INPUTS: usize = 2;
const NUM_HIDDEN: usize = 3;
const NUM_OUTPUTS: usize = 1;
const INIT_STD: f64 = 0.1;
// Training hyperparameters.
const LEARNING_RATE: f64 = 1.0;
const NUM_SAMPLES: usize = 10_000;
const SEED: u64 = 0;
const LOG_INTERVAL: usize = 1000;

fn target(a: f64, b: f64) -> f64 {
    (a - b).abs()
}

fn default_config() -> TrainingConfig {
    TrainingConfig {
        learning_rate: LEARNING_RATE,
        epochs: NUM_SAMPLES,
        batch_size: Some(1),
        seed: Some(SEED),
        log_interval: Some(LOG_INTERVAL),
        init_std: Some(INIT_STD),
    }
}

fn default_network(std: f64, rng: &mut SimpleRng) -> Network {
    let mut net = Network::input(NUM_INPUTS, 1, 1);
    net.add_full_with(NUM_HIDDEN, std, DenseActivation::Sigmoid, rng);
    net.add_full_with(NUM_OUTPUTS, std, DenseActivation::Sigmoid, rng);
    net
}

// Value following `flag` on the command line, if present.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let config = match flag_value(&args, "--config") {
        Some(path) => match load_config(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("Could not load config {}: {}", path, e);
                process::exit(1);
            }
        },
        None => default_config(),
    };

    let mut rng = config.rng();
    let mut net = match flag_value(&args, "--arch") {
        Some(path) => match load_architecture(&path).and_then(|a| build_network(&a, &mut rng)) {
            Ok(net) => net,
            Err(e) => {
                error!("Could not build architecture {}: {}", path, e);
                process::exit(1);
            }
        },
        None => default_network(config.init_std.unwrap_or(INIT_STD), &mut rng),
    };

    if net.outputs(0).len() != NUM_INPUTS || net.outputs(net.tail()).len() != NUM_OUTPUTS {
        error!(
            "Architecture must map {} inputs to {} output",
            NUM_INPUTS, NUM_OUTPUTS
        );
        process::exit(1);
    }

    let stderr = io::stderr();
    if let Err(e) = net.dump_all(&mut stderr.lock()) {
        error!("Could not dump network: {}", e);
    }

    let mut trainer = Trainer::from_config(&config);
    let mut window = ErrorWindow::new();
    let log_interval = config.log_interval();
    for i in 0..config.epochs {
        let a = rng.next_f64();
        let b = rng.next_f64();
        let t = target(a, b);
        let etotal = trainer.train_sample(&mut net, &[a, b], &[t]);
        window.push(etotal);

        if (i + 1) % log_interval == 0 {
            let y = net.outputs(net.tail())[0];
            info!(
                "i={}, x=[{:.4}, {:.4}], y=[{:.4}], t=[{:.4}], error={:.6}",
                i,
                a,
                b,
                y,
                t,
                window.take_mean()
            );
        }
    }
    trainer.flush(&mut net);

    // Dump the finished network.
    let stdout = io::stdout();
    if let Err(e) = net.dump_all(&mut stdout.lock()) {
        error!("Could not dump network: {}", e);
        process::exit(1);
    }
}
