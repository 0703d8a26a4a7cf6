/*
 * @Author       : 老董
 * @Date         : 2026-03-09
 * @Description  : nn模块的单元测试，以及数值梯度检验等测试辅助函数
 */

mod fc_net;

use ndarray::Array2;

use crate::nn::{Model, ParamKey, ParamStore};
use crate::utils::{new_rng, normal_array2};

/// 中心差分的步长
const H: f64 = 1e-5;

/// 一批服从标准正态分布的样本与循环标签
pub(super) fn toy_data(
    n: usize,
    d: usize,
    num_classes: usize,
    seed: u64,
) -> (Array2<f64>, Vec<usize>) {
    let x = normal_array2(0.0, 1.0, (n, d), &mut new_rng(Some(seed)));
    let y = (0..n).map(|i| i % num_classes).collect();
    (x, y)
}

/// 把各层偏置改为N(0, 0.1²)的随机值。
/// 偏置全为0时，被dropout整行清零的输入会让下一层的预激活恰好落在ReLU的拐点上，
/// 中心差分在那里没有意义。
pub(super) fn randomize_biases<M: Model<f64>>(net: &mut M, seed: u64) {
    let mut rng = new_rng(Some(seed));
    for layer in net.params_mut().layers_mut() {
        let n = layer.b.len();
        layer.b = normal_array2::<f64, _>(0.0, 0.1, (1, n), &mut rng)
            .row(0)
            .to_owned();
    }
}

pub(super) fn train_loss<M: Model<f64>>(net: &mut M, x: &Array2<f64>, y: &[usize]) -> f64 {
    net.compute(x, Some(y))
        .into_loss()
        .expect("提供了标签，应得到损失")
        .0
}

/// 对网络的每个参数逐元素做中心差分，得到损失关于参数的数值梯度
pub(super) fn numerical_gradients<M: Model<f64>>(
    net: &mut M,
    x: &Array2<f64>,
    y: &[usize],
) -> ParamStore<f64> {
    let mut grads = net.params().zeros_like();
    let keys: Vec<ParamKey> = net.params().keys().collect();
    for key in keys {
        let len = net.params().get(key).unwrap().len();
        for idx in 0..len {
            let old = set_param(net, key, idx, None);
            set_param(net, key, idx, Some(old + H));
            let loss_plus = train_loss(net, x, y);
            set_param(net, key, idx, Some(old - H));
            let loss_minus = train_loss(net, x, y);
            set_param(net, key, idx, Some(old));

            let mut grad = grads.get_mut(key).unwrap();
            grad.as_slice_mut().unwrap()[idx] = (loss_plus - loss_minus) / (2.0 * H);
        }
    }
    grads
}

/// 读取（并可选地改写）参数`key`的第`idx`个元素，返回改写前的值
fn set_param<M: Model<f64>>(net: &mut M, key: ParamKey, idx: usize, value: Option<f64>) -> f64 {
    let mut param = net.params_mut().get_mut(key).unwrap();
    let slot = &mut param.as_slice_mut().unwrap()[idx];
    let old = *slot;
    if let Some(value) = value {
        *slot = value;
    }
    old
}

/// 对一个以矩阵为输入的标量函数做中心差分
pub(super) fn numerical_gradient_of<F>(mut f: F, x: &Array2<f64>) -> Array2<f64>
where
    F: FnMut(&Array2<f64>) -> f64,
{
    let mut grad = Array2::zeros(x.raw_dim());
    let mut perturbed = x.clone();
    for ((i, j), g) in grad.indexed_iter_mut() {
        let old = perturbed[[i, j]];
        perturbed[[i, j]] = old + H;
        let plus = f(&perturbed);
        perturbed[[i, j]] = old - H;
        let minus = f(&perturbed);
        perturbed[[i, j]] = old;
        *g = (plus - minus) / (2.0 * H);
    }
    grad
}

/// 逐元素比较解析梯度与数值梯度：|a - n| ≤ 1e-7 + 1e-5·max(|a|, |n|)
pub(super) fn assert_grads_close(analytic: &ParamStore<f64>, numeric: &ParamStore<f64>) {
    assert!(analytic.same_keys(numeric), "梯度的参数键不一致");
    for (key, a) in analytic.iter() {
        let n = numeric.get(key).unwrap();
        assert_eq!(a.shape(), n.shape(), "{key}的形状不一致");
        for (&av, &nv) in a.iter().zip(n.iter()) {
            let tol = 1e-7 + 1e-5 * av.abs().max(nv.abs());
            assert!(
                (av - nv).abs() <= tol,
                "{key}的梯度不一致：解析{av}，数值{nv}"
            );
        }
    }
}
