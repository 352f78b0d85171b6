use log::{error, info};
use neural_chain::architecture::{build_network, load_architecture};
use neural_chain::config::{load_config, TrainingConfig};
use neural_chain::network::Network;
use neural_chain::utils::SimpleRng;
use std::env;
use std::io;
use std::process;

// Recurrent network detecting one position of a repeating symbol sequence.
const NUM_SYMBOLS: usize = 10;
const WINDOW: usize = 5;
const NUM_HIDDEN: usize = 3;
const NUM_OUTPUTS: usize = 1;
// Training hyperparameters.
const LEARNING_RATE: f64 = 0.005;
const NUM_SEQUENCES: usize = 100;
const SEQUENCE_LENGTH: usize = 100;
const SEED: u64 = 0;
const LOG_INTERVAL: usize = 10;
// Steps replayed from a fresh state after training.
const EVAL_STEPS: usize = 20;

const PATTERN: [usize; 8] = [5, 9, 4, 0, 5, 9, 6, 3];

// Symbol presented at step i.
fn symbol(i: usize) -> usize {
    PATTERN[i % PATTERN.len()]
}

// Value to learn at step i: 1 at the fifth step of each period.
fn answer(i: usize) -> f64 {
    if i % PATTERN.len() == 4 {
        1.0
    } else {
        0.0
    }
}

fn encode(p: usize, x: &mut [f64]) {
    for (k, v) in x.iter_mut().enumerate() {
        *v = if k == p { 1.0 } else { 0.0 };
    }
}

fn default_config() -> TrainingConfig {
    TrainingConfig {
        learning_rate: LEARNING_RATE,
        epochs: NUM_SEQUENCES,
        batch_size: None,
        seed: Some(SEED),
        log_interval: Some(LOG_INTERVAL),
        init_std: None,
    }
}

fn default_network(rng: &mut SimpleRng) -> Network {
    let mut net = Network::sequence_input(NUM_SYMBOLS, WINDOW);
    net.add_recurrent(NUM_HIDDEN, WINDOW, rng);
    net.add_recurrent(NUM_OUTPUTS, WINDOW, rng);
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
        None => default_network(&mut rng),
    };

    let tail = net.tail();
    if net.outputs(0).len() != NUM_SYMBOLS || net.outputs(tail).len() != NUM_OUTPUTS {
        error!(
            "Architecture must map {} inputs to {} output",
            NUM_SYMBOLS, NUM_OUTPUTS
        );
        process::exit(1);
    }

    let stderr = io::stderr();
    if let Err(e) = net.dump_all(&mut stderr.lock()) {
        error!("Could not dump network: {}", e);
    }

    let rate = config.learning_rate;
    let log_interval = config.log_interval();
    let mut x = [0.0; NUM_SYMBOLS];
    for n in 0..config.epochs {
        // Each sequence starts at a random phase from a cleared state and is
        // applied as one update.
        let mut i = rng.gen_usize(10_000);
        net.reset_all();
        let mut etotal = 0.0;
        for _ in 0..SEQUENCE_LENGTH {
            encode(symbol(i), &mut x);
            net.set_inputs(&x);
            net.learn_outputs(&[answer(i)]);
            etotal += net.error_total(tail);
            i += 1;
        }
        net.update(tail, rate);

        if (n + 1) % log_interval == 0 {
            info!(
                "sequence={}, error={:.6}",
                n,
                etotal / SEQUENCE_LENGTH as f64
            );
        }
    }

    // Dump the finished network.
    let stdout = io::stdout();
    if let Err(e) = net.dump_all(&mut stdout.lock()) {
        error!("Could not dump network: {}", e);
        process::exit(1);
    }

    net.reset_all();
    let mut y = [0.0; NUM_OUTPUTS];
    for i in 0..EVAL_STEPS {
        let p = symbol(i);
        encode(p, &mut x);
        net.set_inputs(&x);
        net.get_outputs(tail, &mut y);
        info!("x[{}]={}, y={:.4}, {:.4}", i, p, y[0], answer(i));
    }
}
