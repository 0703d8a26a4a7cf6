/*
 * @Author       : 老董
 * @Date         : 2026-03-03
 * @Description  : 批归一化（batch normalization）
 *
 * 训练时：用当前批的均值、（有偏）方差做逐特征标准化，并以动量更新滑动统计量；
 * 测试时：直接使用滑动统计量，不修改它们。
 * 标准化后再做逐特征的缩放（gamma）与平移（beta）。
 */

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::errors::NetError;
use crate::nn::Mode;
use crate::utils::Element;

/// 批归一化的数值超参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchNormConfig {
    /// 加在方差上的小常数，防止除零
    pub eps: f64,
    /// 滑动统计量的动量：running = momentum·running + (1 - momentum)·batch
    pub momentum: f64,
}

impl Default for BatchNormConfig {
    fn default() -> Self {
        Self {
            eps: 1e-5,
            momentum: 0.9,
        }
    }
}

/// 某一隐藏层的滑动均值与滑动方差。
/// 跨多次前向计算持久存在：训练模式的前向会就地更新它，测试模式的前向只读取它。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "A: Element")]
pub struct BatchNormStats<A> {
    running_mean: Array1<A>,
    running_var: Array1<A>,
}

impl<A: Element> BatchNormStats<A> {
    /// 滑动均值与方差均初始化为0
    pub fn new(num_features: usize) -> Self {
        Self {
            running_mean: Array1::zeros(num_features),
            running_var: Array1::zeros(num_features),
        }
    }

    pub fn num_features(&self) -> usize {
        self.running_mean.len()
    }

    pub const fn running_mean(&self) -> &Array1<A> {
        &self.running_mean
    }

    pub const fn running_var(&self) -> &Array1<A> {
        &self.running_var
    }
}

#[derive(Debug, Clone)]
pub struct BatchNormCache<A> {
    x_hat: Array2<A>,
    gamma: Array1<A>,
    inv_std: Array1<A>,
    mode: Mode,
}

/// 批归一化前向
///
/// # 参数
/// - `x`: 输入，形状 [N, D]
/// - `gamma`、`beta`: 缩放与平移参数，形状 [D]
/// - `stats`: 该层的滑动统计量，训练模式下会被更新
pub fn batch_norm_forward<A: Element>(
    x: &Array2<A>,
    gamma: &Array1<A>,
    beta: &Array1<A>,
    stats: &mut BatchNormStats<A>,
    mode: Mode,
    config: &BatchNormConfig,
) -> (Array2<A>, BatchNormCache<A>) {
    let d = x.ncols();
    for (op, len) in [
        ("批归一化的gamma", gamma.len()),
        ("批归一化的beta", beta.len()),
        ("批归一化的滑动统计量", stats.num_features()),
    ] {
        assert!(
            len == d,
            "{}",
            NetError::ShapeMismatch {
                op,
                expected: vec![d],
                got: vec![len],
            }
        );
    }

    let eps = A::from_f64_lossy(config.eps);
    let (mean, var) = match mode {
        Mode::Train => {
            let n = A::from_usize(x.nrows());
            let mean = x.sum_axis(Axis(0)) / n;
            let var = (x - &mean).mapv(|v| v * v).sum_axis(Axis(0)) / n;

            let momentum = A::from_f64_lossy(config.momentum);
            let rest = A::one() - momentum;
            stats.running_mean = &stats.running_mean * momentum + &(&mean * rest);
            stats.running_var = &stats.running_var * momentum + &(&var * rest);
            (mean, var)
        }
        Mode::Test => (stats.running_mean.clone(), stats.running_var.clone()),
    };

    let inv_std = var.mapv(|v| (v + eps).sqrt().recip());
    let x_hat = (x - &mean) * &inv_std;
    let out = &x_hat * gamma + beta;
    let cache = BatchNormCache {
        x_hat,
        gamma: gamma.clone(),
        inv_std,
        mode,
    };
    (out, cache)
}

/// 批归一化反向
///
/// # 返回
/// `(dx, dgamma, dbeta)`
///
/// 训练模式下均值、方差依赖于整个批，采用化简后的闭式解：
/// `dx = (istd/N)·(N·dx̂ - Σdx̂ - x̂·Σ(dx̂·x̂))`，其中`dx̂ = dout·γ`；
/// 测试模式下统计量是常数，dx只是逐特征的缩放。
pub fn batch_norm_backward<A: Element>(
    dout: &Array2<A>,
    cache: BatchNormCache<A>,
) -> (Array2<A>, Array1<A>, Array1<A>) {
    let BatchNormCache {
        x_hat,
        gamma,
        inv_std,
        mode,
    } = cache;
    assert!(
        dout.shape() == x_hat.shape(),
        "{}",
        NetError::ShapeMismatch {
            op: "批归一化的反向传播",
            expected: x_hat.shape().to_vec(),
            got: dout.shape().to_vec(),
        }
    );

    let dbeta = dout.sum_axis(Axis(0));
    let dgamma = (dout * &x_hat).sum_axis(Axis(0));
    let dx_hat = dout * &gamma;

    let dx = match mode {
        Mode::Train => {
            let n = A::from_usize(dout.nrows());
            let sum_dx_hat = dx_hat.sum_axis(Axis(0));
            let sum_dx_hat_x_hat = (&dx_hat * &x_hat).sum_axis(Axis(0));
            let scale = inv_std / n;
            let centered = &(&dx_hat * n - &sum_dx_hat) - &(&x_hat * &sum_dx_hat_x_hat);
            centered * &scale
        }
        Mode::Test => dx_hat * &inv_std,
    };
    (dx, dgamma, dbeta)
}
