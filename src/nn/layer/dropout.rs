/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 反向（inverted）dropout
 *
 * 训练时以概率`p`保留每个激活并将保留值放大为`1/p`倍，使输出期望与输入一致；
 * 测试时为恒等映射。
 */

use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::NetError;
use crate::nn::Mode;
use crate::utils::{Element, new_rng};

/// dropout配置，网络中所有dropout层共用同一份
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropoutConfig {
    /// 保留概率，取值[0, 1]
    pub p: f64,
    /// 若给出，每次前向都用该种子重新生成随机数发生器，掩码因此可复现（便于梯度检验）
    pub seed: Option<u64>,
}

impl DropoutConfig {
    pub const fn new(p: f64, seed: Option<u64>) -> Self {
        Self { p, seed }
    }
}

#[derive(Debug, Clone)]
pub struct DropoutCache<A> {
    /// 训练模式下的掩码（已含1/p缩放）；测试模式为None
    mask: Option<Array2<A>>,
}

impl<A> DropoutCache<A> {
    pub const fn mask(&self) -> Option<&Array2<A>> {
        self.mask.as_ref()
    }
}

pub fn dropout_forward<A: Element>(
    x: Array2<A>,
    config: &DropoutConfig,
    mode: Mode,
) -> (Array2<A>, DropoutCache<A>) {
    match mode {
        Mode::Train => {
            let mut rng = new_rng(config.seed);
            let keep = config.p;
            let scale = A::from_f64_lossy(1.0 / keep);
            let mask = Array2::from_shape_fn(x.raw_dim(), |_| {
                if rng.r#gen::<f64>() < keep {
                    scale
                } else {
                    A::zero()
                }
            });
            let out = x * &mask;
            (out, DropoutCache { mask: Some(mask) })
        }
        Mode::Test => (x, DropoutCache { mask: None }),
    }
}

pub fn dropout_backward<A: Element>(dout: Array2<A>, cache: DropoutCache<A>) -> Array2<A> {
    match cache.mask {
        Some(mask) => {
            assert!(
                dout.shape() == mask.shape(),
                "{}",
                NetError::ShapeMismatch {
                    op: "dropout的反向传播",
                    expected: mask.shape().to_vec(),
                    got: dout.shape().to_vec(),
                }
            );
            dout * &mask
        }
        None => dout,
    }
}
