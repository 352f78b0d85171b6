// End-to-end training tests: small networks driven through the trainer
// must reduce their error.

use neural_chain::layers::DenseActivation;
use neural_chain::network::Network;
use neural_chain::trainer::{argmax, one_hot, predict, Trainer};
use neural_chain::utils::SimpleRng;

// Mean squared error of |a - b| over an 11x11 grid of [0, 1]^2.
fn grid_error(net: &mut Network) -> f64 {
    let mut total = 0.0;
    let mut count = 0;
    for i in 0..=10 {
        for j in 0..=10 {
            let a = i as f64 / 10.0;
            let b = j as f64 / 10.0;
            let y = predict(net, &[a, b])[0];
            let t = (a - b).abs();
            total += (y - t) * (y - t);
            count += 1;
        }
    }
    total / count as f64
}

#[test]
fn test_absolute_difference_error_decreases() {
    let mut rng = SimpleRng::new(0);
    let mut net = Network::input(2, 1, 1);
    net.add_full_with(3, 0.1, DenseActivation::Sigmoid, &mut rng);
    net.add_full_with(1, 0.1, DenseActivation::Sigmoid, &mut rng);

    let initial = grid_error(&mut net);
    let mut trainer = Trainer::new(1.0, 1);
    for _ in 0..10_000 {
        let a = rng.next_f64();
        let b = rng.next_f64();
        let error = trainer.train_sample(&mut net, &[a, b], &[(a - b).abs()]);
        assert!(error.is_finite());
    }
    let trained = grid_error(&mut net);

    assert!(
        trained < 0.9 * initial,
        "error did not drop: {} -> {}",
        initial,
        trained
    );
}

#[test]
fn test_softmax_classifier_learns_separable_classes() {
    let mut rng = SimpleRng::new(1);
    let mut net = Network::input(2, 1, 1);
    net.add_full(8, 0.5, &mut rng);
    net.add_full(2, 0.5, &mut rng);

    let label = |x: &[f64; 2]| usize::from(x[0] > x[1]);
    let mut trainer = Trainer::new(0.5, 4);
    let mut target = [0.0; 2];
    for _ in 0..10_000 {
        let x = [rng.next_f64(), rng.next_f64()];
        one_hot(label(&x), &mut target);
        trainer.train_sample(&mut net, &x, &target);
    }
    trainer.flush(&mut net);

    let mut correct = 0;
    let total = 200;
    for _ in 0..total {
        let x = [rng.next_f64(), rng.next_f64()];
        if argmax(predict(&mut net, &x)) == label(&x) {
            correct += 1;
        }
    }
    assert!(correct > total * 8 / 10, "accuracy {}/{}", correct, total);
}
