use log::{error, info};
use neural_chain::architecture::{build_network, load_architecture};
use neural_chain::config::{load_config, TrainingConfig};
use neural_chain::idx::{normalize_into, IdxError, IdxFile};
use neural_chain::network::Network;
use neural_chain::trainer::{argmax, one_hot, predict, ErrorWindow, Trainer};
use neural_chain::utils::SimpleRng;
use std::env;
use std::process;
use std::time::Instant;

// Convolutional MNIST classifier.
// Usage: mnist_cnn train-images train-labels test-images test-labels [--config FILE] [--arch FILE]
const IMG_H: usize = 28;
const IMG_W: usize = 28;
const NUM_INPUTS: usize = IMG_H * IMG_W;
const NUM_CLASSES: usize = 10;
const INIT_STD: f64 = 0.1;
// Training hyperparameters.
const LEARNING_RATE: f64 = 0.1;
const EPOCHS: usize = 10;
const BATCH_SIZE: usize = 32;
const SEED: u64 = 0;
const LOG_INTERVAL: usize = 1000;

const EXIT_USAGE: i32 = 100;
const EXIT_DATA: i32 = 111;

fn default_config() -> TrainingConfig {
    TrainingConfig {
        learning_rate: LEARNING_RATE,
        epochs: EPOCHS,
        batch_size: Some(BATCH_SIZE),
        seed: Some(SEED),
        log_interval: Some(LOG_INTERVAL),
        init_std: Some(INIT_STD),
    }
}

// 1x28x28 -> conv 16x14x14 -> conv 32x7x7 -> full 200 -> full 200 -> full 10.
fn default_network(std: f64, rng: &mut SimpleRng) -> Network {
    let mut net = Network::input(1, IMG_W, IMG_H);
    // (14-1)*2+3 <= 28+1*2
    net.add_conv(16, 14, 14, 3, 1, 2, std, rng);
    // (7-1)*2+3 <= 14+1*2
    net.add_conv(32, 7, 7, 3, 1, 2, std, rng);
    net.add_full(200, std, rng);
    net.add_full(200, std, rng);
    net.add_full(NUM_CLASSES, std, rng);
    net
}

// Images and labels of one split, checked against each other.
struct Split {
    images: IdxFile,
    labels: IdxFile,
}

fn load_split(images_path: &str, labels_path: &str) -> Result<Split, IdxError> {
    let images = IdxFile::open(images_path)?;
    let labels = IdxFile::open(labels_path)?;
    Ok(Split { images, labels })
}

fn check_split(split: &Split, name: &str) -> Result<(), String> {
    let dims = split.images.dims();
    if dims.len() != 3 || dims[1] as usize != IMG_H || dims[2] as usize != IMG_W {
        return Err(format!("{} images have shape {:?}, expected Nx28x28", name, dims));
    }
    if split.labels.dims().len() != 1 {
        return Err(format!("{} labels are not a 1-D file", name));
    }
    if split.images.len() != split.labels.len() {
        return Err(format!(
            "{} has {} images but {} labels",
            name,
            split.images.len(),
            split.labels.len()
        ));
    }
    if split.images.is_empty() {
        return Err(format!("{} split is empty", name));
    }
    split
        .labels
        .check_labels(NUM_CLASSES)
        .map_err(|e| format!("{} labels: {}", name, e))
}

fn load_or_exit(images_path: &str, labels_path: &str, name: &str) -> Split {
    let split = match load_split(images_path, labels_path) {
        Ok(split) => split,
        Err(e) => {
            error!("Could not read {} data: {}", name, e);
            process::exit(EXIT_DATA);
        }
    };
    if let Err(message) = check_split(&split, name) {
        error!("{}", message);
        process::exit(EXIT_DATA);
    }
    split
}

// Value following `flag` on the command line, if present.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

// Arguments that are neither flags nor flag values.
fn positional(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            iter.next();
        } else {
            out.push(arg.clone());
        }
    }
    out
}

fn test_accuracy(net: &mut Network, test: &Split) -> f64 {
    let mut x = vec![0.0; NUM_INPUTS];
    let mut correct = 0;
    for i in 0..test.images.len() {
        normalize_into(test.images.get3(i), &mut x);
        let predicted = argmax(predict(net, &x));
        if predicted == test.labels.get1(i) as usize {
            correct += 1;
        }
    }
    100.0 * correct as f64 / test.images.len() as f64
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let paths = positional(&args);
    if paths.len() < 4 {
        error!(
            "Usage: {} train-images train-labels test-images test-labels [--config FILE] [--arch FILE]",
            args.first().map(String::as_str).unwrap_or("mnist_cnn")
        );
        process::exit(EXIT_USAGE);
    }

    let config = match flag_value(&args, "--config") {
        Some(path) => match load_config(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("Could not load config {}: {}", path, e);
                process::exit(EXIT_USAGE);
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
                process::exit(EXIT_USAGE);
            }
        },
        None => default_network(config.init_std.unwrap_or(INIT_STD), &mut rng),
    };

    let tail = net.tail();
    if net.outputs(0).len() != NUM_INPUTS || net.outputs(tail).len() != NUM_CLASSES {
        error!(
            "Architecture must map {} inputs to {} classes",
            NUM_INPUTS, NUM_CLASSES
        );
        process::exit(EXIT_USAGE);
    }

    info!("Loading MNIST...");
    let train = load_or_exit(&paths[0], &paths[1], "training");
    let train_size = train.images.len();
    info!("Train: {}", train_size);

    info!("Training...");
    let start = Instant::now();
    let mut trainer = Trainer::from_config(&config);
    let mut window = ErrorWindow::new();
    let log_interval = config.log_interval();
    let mut x = vec![0.0; NUM_INPUTS];
    let mut target = [0.0; NUM_CLASSES];
    for i in 0..config.epochs * train_size {
        // Pick a random sample from the training data.
        let index = rng.gen_usize(train_size);
        normalize_into(train.images.get3(index), &mut x);
        one_hot(train.labels.get1(index) as usize, &mut target);

        window.push(trainer.train_sample(&mut net, &x, &target));
        if i % log_interval == 0 {
            info!("i={}, error={:.4}", i, window.take_mean());
        }
        if (i + 1) % train_size == 0 {
            info!(
                "Epoch {} done in {:.2}s",
                (i + 1) / train_size,
                start.elapsed().as_secs_f64()
            );
        }
    }
    trainer.flush(&mut net);
    drop(train);

    let test = load_or_exit(&paths[2], &paths[3], "test");
    info!("Testing on {} images...", test.images.len());
    let accuracy = test_accuracy(&mut net, &test);
    info!("Test Accuracy: {:.2}%", accuracy);
}
