// Tests for chain construction: buffer shapes, parameter counts and the
// contract checks on every traversal call.

use neural_chain::layers::{DenseActivation, LayerKind, Shape};
use neural_chain::network::Network;
use neural_chain::utils::SimpleRng;

// ============================================================================
// Shapes and buffer sizes
// ============================================================================

mod shape_tests {
    use super::*;

    #[test]
    fn test_input_layer() {
        let net = Network::input(1, 28, 28);
        let input = net.layer(0);
        assert_eq!(input.nnodes(), 784);
        assert_eq!(input.window(), 1);
        assert_eq!(input.outputs().len(), 784);
        assert_eq!(input.parameter_count(), 0);
        assert_eq!(input.kind(), &LayerKind::Input);
        assert_eq!(net.len(), 1);
        assert!(!net.is_empty());
    }

    #[test]
    fn test_mnist_chain_sizes() {
        let mut rng = SimpleRng::new(0);
        let mut net = Network::input(1, 28, 28);
        let conv1 = net.add_conv(16, 14, 14, 3, 1, 2, 0.1, &mut rng);
        let conv2 = net.add_conv(32, 7, 7, 3, 1, 2, 0.1, &mut rng);
        let full1 = net.add_full(200, 0.1, &mut rng);
        let full2 = net.add_full(200, 0.1, &mut rng);
        let output = net.add_full(10, 0.1, &mut rng);

        assert_eq!((conv1, conv2, full1, full2, output), (1, 2, 3, 4, 5));

        let l1 = net.layer(conv1);
        assert_eq!(l1.shape(), Shape::new(16, 14, 14));
        assert_eq!(l1.weights().len(), 16 * 1 * 3 * 3);
        assert_eq!(l1.biases().len(), 16);
        assert_eq!(l1.gradients().len(), 16 * 14 * 14);

        let l2 = net.layer(conv2);
        assert_eq!(l2.weights().len(), 32 * 16 * 3 * 3);
        assert_eq!(l2.biases().len(), 32);

        let l3 = net.layer(full1);
        assert_eq!(l3.weights().len(), 200 * 32 * 7 * 7);
        assert_eq!(l3.biases().len(), 200);
        assert_eq!(l3.parameter_count(), 200 + 200 * 1568);

        assert_eq!(net.layer(output).nnodes(), 10);
        assert_eq!(net.tail(), output);
    }

    #[test]
    fn test_recurrent_buffer_sizes() {
        let mut rng = SimpleRng::new(0);
        let mut net = Network::sequence_input(10, 5);
        let hidden = net.add_recurrent(3, 5, &mut rng);

        let layer = net.layer(hidden);
        assert_eq!(layer.window(), 5);
        assert_eq!(layer.history().len(), 3 * 5);
        assert_eq!(layer.error_history().len(), 3 * 5);
        assert_eq!(layer.gradients().len(), 3);
        assert_eq!(layer.weights().len(), 3 * 10);
        assert_eq!(layer.hweights().map(|h| h.len()), Some(9));
        assert_eq!(layer.parameter_count(), 3 + 30 + 9);
        assert_eq!(net.layer(0).history().len(), 10 * 5);
    }

    #[test]
    fn test_initial_biases_zero_weights_scaled() {
        let mut rng = SimpleRng::new(11);
        let mut net = Network::input(50, 1, 1);
        let full = net.add_full(40, 0.1, &mut rng);
        let layer = net.layer(full);

        assert!(layer.biases().iter().all(|&b| b == 0.0));
        assert!(layer.weights().iter().any(|&w| w != 0.0));
        // four-uniform draws are bounded by 2 * 1.724
        assert!(layer.weights().iter().all(|&w| w.abs() <= 0.1 * 3.448 + 1e-12));
        assert!(layer.u_weights().iter().all(|&u| u == 0.0));
    }

    #[test]
    fn test_hweights_absent_for_dense() {
        let mut rng = SimpleRng::new(1);
        let mut net = Network::input(2, 1, 1);
        let full = net.add_full_with(2, 0.1, DenseActivation::Sigmoid, &mut rng);
        assert!(net.layer(full).hweights().is_none());
        assert!(net.layer(full).u_hweights().is_none());
    }
}

// ============================================================================
// Contract violations
// ============================================================================

mod contract_tests {
    use super::*;

    #[test]
    #[should_panic(expected = "input length mismatch in set_inputs")]
    fn test_set_inputs_wrong_length() {
        let mut rng = SimpleRng::new(0);
        let mut net = Network::input(3, 1, 1);
        net.add_full(2, 0.1, &mut rng);
        net.set_inputs(&[1.0, 2.0]);
    }

    #[test]
    #[should_panic(expected = "output length mismatch in get_outputs")]
    fn test_get_outputs_wrong_length() {
        let mut rng = SimpleRng::new(0);
        let mut net = Network::input(3, 1, 1);
        let tail = net.add_full(2, 0.1, &mut rng);
        let mut out = [0.0; 3];
        net.get_outputs(tail, &mut out);
    }

    #[test]
    #[should_panic(expected = "target length mismatch in learn_outputs")]
    fn test_learn_outputs_wrong_length() {
        let mut rng = SimpleRng::new(0);
        let mut net = Network::input(3, 1, 1);
        net.add_full(2, 0.1, &mut rng);
        net.set_inputs(&[1.0, 2.0, 3.0]);
        net.learn_outputs(&[1.0]);
    }

    #[test]
    #[should_panic(expected = "learn_outputs needs at least one layer after the input")]
    fn test_learn_outputs_on_input_only() {
        let mut net = Network::input(2, 1, 1);
        net.learn_outputs(&[1.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "kernel_size must be odd")]
    fn test_even_kernel() {
        let mut rng = SimpleRng::new(0);
        let mut net = Network::input(1, 8, 8);
        net.add_conv(1, 4, 4, 2, 0, 2, 0.1, &mut rng);
    }

    #[test]
    #[should_panic(expected = "does not fit input width")]
    fn test_conv_too_wide() {
        let mut rng = SimpleRng::new(0);
        let mut net = Network::input(1, 28, 28);
        // (15-1)*2 + 3 = 31 > 28 + 2
        net.add_conv(16, 15, 14, 3, 1, 2, 0.1, &mut rng);
    }

    #[test]
    #[should_panic(expected = "stride must be greater than 0")]
    fn test_zero_stride() {
        let mut rng = SimpleRng::new(0);
        let mut net = Network::input(1, 4, 4);
        net.add_conv(1, 4, 4, 3, 1, 0, 0.1, &mut rng);
    }

    #[test]
    #[should_panic(expected = "layer must have at least one node")]
    fn test_empty_full_layer() {
        let mut rng = SimpleRng::new(0);
        let mut net = Network::input(2, 1, 1);
        net.add_full(0, 0.1, &mut rng);
    }

    #[test]
    #[should_panic(expected = "window must be greater than 0")]
    fn test_zero_window() {
        let _ = Network::sequence_input(3, 0);
    }
}

// ============================================================================
// Dump
// ============================================================================

mod dump_tests {
    use super::*;

    fn dump_text(net: &Network, index: usize) -> String {
        let mut out = Vec::new();
        net.dump(index, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_dump_dense() {
        let mut rng = SimpleRng::new(0);
        let mut net = Network::input(2, 1, 1);
        let full = net.add_full_with(3, 0.1, DenseActivation::Sigmoid, &mut rng);
        net.set_inputs(&[0.5, 0.25]);

        let text = dump_text(&net, full);
        assert!(text.starts_with("Layer1 [full] (prev=Layer0) shape=(3,1,1), nodes=3, window=1"));
        assert!(text.contains("biases = [0.0000 0.0000 0.0000]"));
        assert!(text.contains("weights = ["));
    }

    #[test]
    fn test_dump_conv() {
        let mut rng = SimpleRng::new(0);
        let mut net = Network::input(1, 4, 4);
        let conv = net.add_conv(2, 2, 2, 3, 1, 2, 0.1, &mut rng);

        let text = dump_text(&net, conv);
        assert!(text.contains("Layer1 [conv] (prev=Layer0)"));
        assert!(text.contains("stride=2, padding=1, kernel_size=3"));
        assert!(text.contains("  1: bias=0.0000"));
    }

    #[test]
    fn test_dump_recurrent_labels_timesteps() {
        let mut rng = SimpleRng::new(0);
        let mut net = Network::sequence_input(2, 2);
        let rec = net.add_recurrent(2, 2, &mut rng);

        let text = dump_text(&net, rec);
        assert!(text.contains("Layer1 [recurrent] (prev=Layer0)"));
        assert!(text.contains("outputs(t=0):"));
        assert!(text.contains("outputs(t=-1):"));
        assert!(text.contains("xweights(1) = ["));
        assert!(text.contains("hweights(0) = ["));
    }

    #[test]
    fn test_dump_input_has_no_predecessor() {
        let net = Network::input(2, 1, 1);
        let text = dump_text(&net, 0);
        assert!(text.starts_with("Layer0 [input] shape=(2,1,1)"));
    }
}
