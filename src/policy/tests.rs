//! Property tests shared across the three policies

use super::*;
use crate::model::{DenseLayer, DenseModel, LayerRef};
use crate::tensor::{reshape, Tensor};
use approx::assert_relative_eq;
use ndarray::arr2;
use proptest::prelude::*;

fn tensor_strategy() -> impl Strategy<Value = Tensor> {
    proptest::collection::vec(1usize..6, 1..4).prop_flat_map(|dims| {
        let len: usize = dims.iter().product();
        proptest::collection::vec(-0.5f32..0.5, len)
            .prop_map(move |data| reshape(&dims, data).unwrap())
    })
}

fn single_layer(weights: Tensor) -> DenseModel {
    let bias_len = weights.shape()[0];
    DenseModel::new().with_layer(
        DenseLayer::new("dense", weights)
            .with_biases(Tensor::from_elem(ndarray::IxDyn(&[bias_len]), 0.001)),
    )
}

fn run_once(policy: &mut Policy, model: &mut DenseModel) {
    policy.on_epoch_end(&CallbackContext::new(0), model).unwrap();
}

#[test]
fn test_end_to_end_neuroplast_example() {
    let config = NeuroPlastConfig::default().with_band(-0.01, 0.01).with_bounds(-0.05, 0.05);
    let mut policy: Policy = NeuroPlast::new(config).unwrap().into();
    let mut model = single_layer(arr2(&[[0.001_f32, 0.5], [-0.3, 0.0]]).into_dyn());

    run_once(&mut policy, &mut model);

    let w = model.weights(&LayerRef::Model).unwrap();
    assert_eq!(w.shape(), &[2, 2]);
    assert_eq!(w[[0, 1]], 0.5);
    assert_eq!(w[[1, 0]], -0.3);
    for idx in [[0, 0], [1, 1]] {
        assert!((-0.05..=0.05).contains(&w[idx]), "w{idx:?} = {}", w[idx]);
    }
}

#[test]
fn test_policy_enum_dispatch() {
    let policies = vec![
        PolicyConfig::NeuroPlast(NeuroPlastConfig::default()).build().unwrap(),
        PolicyConfig::Pruning(PruningConfig::default()).build().unwrap(),
        PolicyConfig::Stroke(StrokeConfig::default()).build().unwrap(),
    ];
    let names: Vec<_> = policies.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["NeuroPlast", "Pruning", "Stroke"]);
    assert!(policies.iter().all(|p| p.epochs_completed() == 0));
}

#[test]
fn test_sequential_composition() {
    // Pruning zeroes the band, NeuroPlast then re-seeds the zeros
    let mut prune: Policy =
        Pruning::new(PruningConfig::default().with_band(-0.1, 0.1)).unwrap().into();
    let plast_config = NeuroPlastConfig::default().with_band(0.0, 0.0).with_set_value(0.07);
    let mut plast: Policy = NeuroPlast::new(plast_config).unwrap().into();
    let mut model = single_layer(arr2(&[[0.05_f32, 0.5], [-0.09, 0.2]]).into_dyn());

    run_once(&mut prune, &mut model);
    run_once(&mut plast, &mut model);

    assert_eq!(
        model.weights(&LayerRef::Model).unwrap(),
        arr2(&[[0.07_f32, 0.5], [0.07, 0.2]]).into_dyn()
    );
}

#[test]
fn test_stroke_decay_from_half() {
    let mut stroke =
        Stroke::new(StrokeConfig::default().with_volatility_ratio(0.5).with_decay(0.9)).unwrap();
    let mut model = single_layer(Tensor::zeros(ndarray::IxDyn(&[4, 4])));
    stroke.on_epoch_end(&CallbackContext::new(0), &mut model).unwrap();
    assert_relative_eq!(stroke.volatility_ratio(), 0.45);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_all_policies_preserve_shape(t in tensor_strategy(), seed in 0..1000u64) {
        let shape = t.shape().to_vec();
        let configs = vec![
            PolicyConfig::NeuroPlast(
                NeuroPlastConfig::default().with_band(-0.2, 0.2).with_seed(seed).with_biases(true),
            ),
            PolicyConfig::Pruning(PruningConfig::default().with_biases(true)),
            PolicyConfig::Stroke(
                StrokeConfig::default()
                    .with_volatility_ratio(0.6)
                    .with_seed(seed)
                    .with_biases(true),
            ),
        ];
        for config in configs {
            let mut policy = config.build().unwrap();
            let mut model = single_layer(t.clone());
            run_once(&mut policy, &mut model);
            let layer = model.layer(&LayerRef::Model).unwrap();
            prop_assert_eq!(layer.weights.shape(), shape.as_slice());
            prop_assert_eq!(layer.biases.as_ref().unwrap().shape(), &[shape[0]]);
        }
    }

    #[test]
    fn prop_neuroplast_touches_only_band(t in tensor_strategy(), seed in 0..1000u64) {
        let config = NeuroPlastConfig::default()
            .with_band(-0.1, 0.1)
            .with_bounds(-0.05, 0.05)
            .with_seed(seed);
        let mut policy = NeuroPlast::new(config).unwrap();
        let mut model = single_layer(t.clone());
        policy.on_epoch_end(&CallbackContext::new(0), &mut model).unwrap();

        let out = model.weights(&LayerRef::Model).unwrap();
        let mut in_band = 0;
        for (before, after) in t.iter().zip(out.iter()) {
            if (-0.1..=0.1).contains(before) {
                in_band += 1;
                prop_assert!((-0.05..=0.05).contains(after));
            } else {
                prop_assert_eq!(before, after);
            }
        }
        prop_assert_eq!(policy.last_epoch_mutations(), in_band);
    }

    #[test]
    fn prop_pruning_sets_exact_value(t in tensor_strategy(), value in -1.0f32..1.0) {
        let config = PruningConfig::default().with_band(-0.25, 0.25).with_set_value(value);
        let pruning = Pruning::new(config).unwrap();
        let (out, _) = pruning.apply(&t).unwrap();
        for (before, after) in t.iter().zip(out.iter()) {
            if (-0.25..=0.25).contains(before) {
                prop_assert_eq!(*after, value);
            } else {
                prop_assert_eq!(before, after);
            }
        }
    }

    #[test]
    fn prop_stroke_strike_count(t in tensor_strategy(), ratio in 0.0f64..0.99, seed in 0..1000u64) {
        let config =
            StrokeConfig::default().with_volatility_ratio(ratio).with_value(7.0).with_seed(seed);
        let mut stroke = Stroke::new(config).unwrap();
        let (out, n) = stroke.apply(&t).unwrap();
        prop_assert_eq!(n, (t.len() as f64 * ratio) as usize);
        let changed = t.iter().zip(out.iter()).filter(|(a, b)| a != b).count();
        prop_assert!(changed <= n);
        for (before, after) in t.iter().zip(out.iter()) {
            prop_assert!(after == before || *after == 7.0);
        }
    }

    #[test]
    fn prop_cutoff_gating(cutoff in 0usize..6, calls in 0usize..10) {
        let config = PruningConfig::default().with_cutoff(Cutoff::Epochs(cutoff));
        let mut pruning = Pruning::new(config).unwrap();
        let mut model = single_layer(Tensor::zeros(ndarray::IxDyn(&[2, 2])));
        let mut mutated_epochs = Vec::new();
        for epoch in 0..calls {
            pruning.on_epoch_end(&CallbackContext::new(epoch), &mut model).unwrap();
            if pruning.last_epoch_pruned() > 0 {
                mutated_epochs.push(epoch);
            }
        }
        let expected: Vec<usize> = (0..calls.min(cutoff)).collect();
        prop_assert_eq!(mutated_epochs, expected);
        prop_assert_eq!(pruning.epochs_completed(), calls);
    }

    #[test]
    fn prop_stroke_ratio_stays_in_bounds(
        ratio in 0.02f64..0.99,
        decay in 0.1f64..3.0,
        epochs in 1usize..40,
    ) {
        let config =
            StrokeConfig::default().with_volatility_ratio(ratio).with_decay(decay).with_value(0.0);
        let mut stroke = Stroke::new(config).unwrap();
        let mut model = single_layer(Tensor::zeros(ndarray::IxDyn(&[3, 3])));
        for epoch in 0..epochs {
            stroke.on_epoch_end(&CallbackContext::new(epoch), &mut model).unwrap();
            let r = stroke.volatility_ratio();
            prop_assert!(r > MIN_VOLATILITY && r < MAX_VOLATILITY, "ratio escaped: {}", r);
        }
    }
}
