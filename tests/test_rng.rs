// Tests for the seedable random number generator.

use neural_chain::utils::SimpleRng;

#[test]
fn test_same_seed_same_stream() {
    let mut a = SimpleRng::new(1234);
    let mut b = SimpleRng::new(1234);
    for _ in 0..100 {
        assert_eq!(a.next_u32(), b.next_u32());
    }
}

#[test]
fn test_different_seeds_differ() {
    let mut a = SimpleRng::new(1);
    let mut b = SimpleRng::new(2);
    let same = (0..20).filter(|_| a.next_u32() == b.next_u32()).count();
    assert!(same < 20);
}

#[test]
fn test_zero_seed_is_usable() {
    let mut rng = SimpleRng::new(0);
    let values: Vec<u32> = (0..10).map(|_| rng.next_u32()).collect();
    assert!(values.iter().any(|&v| v != 0));
}

#[test]
fn test_next_f64_in_unit_interval() {
    let mut rng = SimpleRng::new(7);
    for _ in 0..10_000 {
        let v = rng.next_f64();
        assert!((0.0..=1.0).contains(&v));
    }
}

#[test]
fn test_gen_usize_bounds() {
    let mut rng = SimpleRng::new(9);
    for _ in 0..1000 {
        assert!(rng.gen_usize(10) < 10);
    }
    assert_eq!(rng.gen_usize(0), 0);
}

#[test]
fn test_next_normal_moments() {
    let mut rng = SimpleRng::new(42);
    let n = 100_000;
    let samples: Vec<f64> = (0..n).map(|_| rng.next_normal()).collect();
    let mean = samples.iter().sum::<f64>() / n as f64;
    let var = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n as f64;

    assert!(mean.abs() < 0.02, "mean {}", mean);
    assert!((var.sqrt() - 1.0).abs() < 0.05, "std {}", var.sqrt());
    assert!(samples.iter().all(|x| x.abs() <= 2.0 * 1.724 + 1e-12));
}
