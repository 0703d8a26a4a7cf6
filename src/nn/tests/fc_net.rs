/*
 * @Author       : 老董
 * @Date         : 2026-03-10
 * @Description  : FullyConnectedNet单元测试
 *                 结构、梯度检验、批归一化统计量与dropout
 */

use approx::assert_abs_diff_eq;
use ndarray::{Array2, Array4};

use super::{assert_grads_close, numerical_gradients, randomize_biases, toy_data, train_loss};
use crate::assert_panic;
use crate::errors::NetError;
use crate::nn::layer::softmax_loss;
use crate::nn::{
    BatchNormStats, Computed, FullyConnectedConfig, FullyConnectedNet, Model, ParamKey,
};

fn config(hidden_dims: Vec<usize>) -> FullyConnectedConfig {
    FullyConnectedConfig::new(hidden_dims, 4, 3)
        .with_weight_scale(0.5)
        .with_init_seed(7)
}

fn keys_of(net: &FullyConnectedNet<f64>) -> Vec<String> {
    net.params().keys().map(|k| k.to_string()).collect()
}

#[test]
fn test_fc_net_param_keys() {
    let net = FullyConnectedNet::<f64>::new(config(vec![6, 5])).unwrap();
    assert_eq!(keys_of(&net), ["W1", "b1", "W2", "b2", "W3", "b3"]);
    assert_eq!(net.num_layers(), 3);
    assert!(net.bn_stats().is_empty());

    let net = FullyConnectedNet::<f64>::new(config(vec![6, 5]).with_batchnorm(true)).unwrap();
    assert_eq!(
        keys_of(&net),
        ["W1", "b1", "gamma1", "beta1", "W2", "b2", "gamma2", "beta2", "W3", "b3"]
    );
    let bn = net.params().layer(2).unwrap().bn().unwrap();
    assert!(bn.gamma.iter().all(|&v| v == 1.0));
    assert!(bn.beta.iter().all(|&v| v == 0.0));
    assert_eq!(net.bn_stats().len(), 2);
    assert_eq!(net.bn_stats()[1].num_features(), 5);
}

#[test]
fn test_fc_net_param_shapes() {
    let net = FullyConnectedNet::<f32>::new(config(vec![6, 5])).unwrap();
    let params = net.params();
    assert_eq!(params.get(ParamKey::W(1)).unwrap().shape(), &[4, 6]);
    assert_eq!(params.get(ParamKey::W(2)).unwrap().shape(), &[6, 5]);
    assert_eq!(params.get(ParamKey::W(3)).unwrap().shape(), &[5, 3]);
    assert_eq!(params.get(ParamKey::B(3)).unwrap().shape(), &[3]);
    assert_eq!(net.num_params(), 4 * 6 + 6 + 6 * 5 + 5 + 5 * 3 + 3);
}

#[test]
fn test_fc_net_display() {
    let config = config(vec![6]).with_batchnorm(true).with_dropout(0.5);
    let net = FullyConnectedNet::<f64>::new(config).unwrap();
    assert_eq!(
        net.to_string(),
        "affine1[4→6] - batchnorm1 - relu1 - dropout1 - affine2[6→3] - softmax"
    );
}

#[test]
fn test_fc_net_gradients_all_variants() {
    let (x, y) = toy_data(8, 4, 3, 21);
    for (use_batchnorm, dropout, reg) in [
        (false, 0.0, 0.0),
        (false, 0.0, 0.5),
        (true, 0.0, 0.0),
        (true, 0.0, 0.25),
        (false, 0.5, 0.0),
        (true, 0.75, 0.1),
    ] {
        let mut net = FullyConnectedNet::<f64>::new(
            config(vec![6, 5])
                .with_batchnorm(use_batchnorm)
                .with_dropout(dropout)
                .with_reg(reg)
                .with_seed(123),
        )
        .unwrap();
        randomize_biases(&mut net, 31);
        let (_, grads) = net.loss(&x, &y);
        assert!(grads.same_keys(net.params()));
        let numeric = numerical_gradients(&mut net, &x, &y);
        assert_grads_close(&grads, &numeric);
    }
}

#[test]
fn test_fc_net_without_hidden_layers() {
    let (x, y) = toy_data(5, 4, 3, 2);
    let config = config(Vec::new()).with_batchnorm(true).with_reg(0.1);
    let mut net = FullyConnectedNet::<f64>::new(config).unwrap();
    assert_eq!(keys_of(&net), ["W1", "b1"]);
    assert!(net.bn_stats().is_empty());
    assert_eq!(net.to_string(), "affine1[4→3] - softmax");
    randomize_biases(&mut net, 3);

    // 没有隐藏层时，得分就是x·W1 + b1，损失就是softmax损失加0.5·λ·‖W1‖²
    let layer = net.params().layer(1).unwrap();
    let (w, b) = (layer.w.clone(), layer.b.clone());
    let expected_scores = x.dot(&w) + &b;
    assert_abs_diff_eq!(net.scores(&x), expected_scores, epsilon = 1e-12);
    let expected_loss =
        softmax_loss(&expected_scores, &y).0 + 0.5 * 0.1 * w.mapv(|v| v * v).sum();
    assert_abs_diff_eq!(train_loss(&mut net, &x, &y), expected_loss, epsilon = 1e-12);

    let (_, grads) = net.loss(&x, &y);
    let numeric = numerical_gradients(&mut net, &x, &y);
    assert_grads_close(&grads, &numeric);
}

#[test]
fn test_fc_net_reg_adds_weight_penalty() {
    let (x, y) = toy_data(6, 4, 3, 5);
    let base = config(vec![6, 5]).with_batchnorm(true).with_dropout(0.5).with_seed(1);
    let mut plain = FullyConnectedNet::<f64>::new(base.clone()).unwrap();
    let mut regularized = FullyConnectedNet::<f64>::new(base.with_reg(0.2)).unwrap();

    let loss_plain = train_loss(&mut plain, &x, &y);
    let loss_reg = train_loss(&mut regularized, &x, &y);
    assert_abs_diff_eq!(
        loss_reg - loss_plain,
        0.5 * 0.2 * regularized.params().sum_squared_weights(),
        epsilon = 1e-10
    );
}

#[test]
fn test_fc_net_loss_matches_softmax_of_scores() {
    let (x, y) = toy_data(6, 4, 3, 6);
    let mut net = FullyConnectedNet::<f64>::new(config(vec![6, 5])).unwrap();
    let (expected, _) = softmax_loss(&net.scores(&x), &y);
    assert_abs_diff_eq!(train_loss(&mut net, &x, &y), expected, epsilon = 1e-12);
}

#[test]
fn test_fc_net_inference_is_idempotent() {
    let (x, y) = toy_data(6, 4, 3, 7);
    let config = config(vec![6, 5]).with_batchnorm(true).with_dropout(0.5);
    let mut net = FullyConnectedNet::<f64>::new(config).unwrap();
    train_loss(&mut net, &x, &y);
    let stats_before = net.bn_stats().to_vec();

    let first = net.compute(&x, None).into_scores().unwrap();
    let second = net.compute(&x, None).into_scores().unwrap();
    assert_eq!(first, second);
    assert_eq!(net.scores(&x), first);
    // 测试模式不更新滑动统计量
    assert_eq!(net.bn_stats(), stats_before.as_slice());
}

#[test]
fn test_fc_net_training_updates_bn_stats() {
    let (x, y) = toy_data(10, 4, 3, 8);
    let mut net = FullyConnectedNet::<f64>::new(config(vec![6]).with_batchnorm(true)).unwrap();
    assert!(net.bn_stats()[0].running_var().iter().all(|&v| v == 0.0));

    train_loss(&mut net, &x, &y);
    assert!(net.bn_stats()[0].running_var().iter().all(|&v| v > 0.0));
    let after_one = net.bn_stats()[0].clone();
    train_loss(&mut net, &x, &y);
    assert_ne!(net.bn_stats()[0], after_one);
}

#[test]
fn test_fc_net_test_mode_has_no_dropout() {
    let (x, _) = toy_data(6, 4, 3, 9);
    // 不给dropout种子，训练时的掩码每次都不同，但测试模式的输出不受影响
    let with_dropout = FullyConnectedNet::<f64>::new(config(vec![6, 5]).with_dropout(0.3)).unwrap();
    let without_dropout = FullyConnectedNet::<f64>::new(config(vec![6, 5])).unwrap();
    assert_eq!(with_dropout.scores(&x), without_dropout.scores(&x));
}

#[test]
fn test_fc_net_compute_with_external_stats() {
    let (x, y) = toy_data(6, 4, 3, 10);
    let net = FullyConnectedNet::<f64>::new(config(vec![6, 5]).with_batchnorm(true)).unwrap();
    let mut stats = vec![BatchNormStats::new(6), BatchNormStats::new(5)];

    let computed = net.compute_with_stats(&x, Some(y.as_slice()), &mut stats);
    assert!(matches!(computed, Computed::Loss { .. }));
    assert_ne!(stats[0], BatchNormStats::new(6));
    // 网络自身的统计量保持不变
    assert_eq!(net.bn_stats()[0], BatchNormStats::new(6));

    let scores = net.compute_with_stats(&x, None, &mut stats).into_scores().unwrap();
    assert_eq!(scores.shape(), &[6, 3]);
}

#[test]
fn test_fc_net_wrong_stats_count_panics() {
    let (x, _) = toy_data(3, 4, 3, 11);
    let net = FullyConnectedNet::<f64>::new(config(vec![6, 5]).with_batchnorm(true)).unwrap();
    let mut stats = vec![BatchNormStats::new(6)];
    assert_panic!(
        net.compute_with_stats(&x, None, &mut stats),
        NetError::ShapeMismatch {
            op: "批归一化统计量的个数",
            expected: vec![2],
            got: vec![1],
        }
    );
}

#[test]
fn test_fc_net_input_dim_mismatch_panics() {
    let net = FullyConnectedNet::<f64>::new(config(vec![6])).unwrap();
    assert_panic!(
        net.scores(&Array2::<f64>::zeros((2, 3))),
        NetError::ShapeMismatch {
            op: "仿射变换",
            expected: vec![2, 4],
            got: vec![2, 3],
        }
    );
}

#[test]
fn test_fc_net_label_out_of_range_panics() {
    let (x, _) = toy_data(2, 4, 3, 12);
    let mut net = FullyConnectedNet::<f64>::new(config(vec![6])).unwrap();
    assert_panic!(
        net.loss(&x, &[0, 5]),
        NetError::LabelOutOfRange {
            index: 1,
            label: 5,
            num_classes: 3,
        }
    );
}

#[test]
fn test_fc_net_f32_with_image_input() {
    let config = FullyConnectedConfig::new(vec![8], 3 * 2 * 2, 4)
        .with_batchnorm(true)
        .with_dropout(0.5)
        .with_seed(3)
        .with_init_seed(3);
    let mut net = FullyConnectedNet::<f32>::new(config).unwrap();
    let images = Array4::from_shape_fn((5, 3, 2, 2), |(n, c, i, j)| {
        ((n * 7 + c * 3 + i * 2 + j) % 5) as f64 - 2.0
    });

    let (loss, grads) = net.loss(&images, &[0, 1, 2, 3, 0]);
    assert!(loss.is_finite() && loss > 0.0);
    assert!(grads.same_keys(net.params()));
    assert!(grads.iter().all(|(_, g)| g.iter().all(|v| v.is_finite())));
    assert_eq!(net.scores(&images).shape(), &[5, 4]);
}
