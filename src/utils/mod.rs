//! # 常用接口模块
//!
//! 本模块提供数值精度（`f32`/`f64`）的统一抽象，以及权重初始化、dropout掩码所需的随机数工具

#[cfg(test)]
mod tests;


use ndarray::{Array, Array2, Dimension, NdFloat};
use ndarray_npy::{ReadableElement, WritableElement};
use num_traits::NumCast;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// 网络可用的浮点元素类型，即所谓的“数值精度”。
/// 网络的所有参数、中间结果与梯度都以同一种`Element`存储；
/// 对数值梯度检验而言`f64`更合适，`f32`则更快。
pub trait Element:
    NdFloat + Serialize + DeserializeOwned + ReadableElement + WritableElement + Default
{
    /// 精度名称，仅用于日志
    const NAME: &'static str;

    fn from_f64_lossy(value: f64) -> Self;

    fn to_f64_lossy(self) -> f64;

    fn from_usize(value: usize) -> Self {
        <Self as NumCast>::from(value).unwrap_or_else(Self::max_value)
    }
}

impl Element for f32 {
    const NAME: &'static str = "f32";

    fn from_f64_lossy(value: f64) -> Self {
        value as f32
    }

    fn to_f64_lossy(self) -> f64 {
        self as f64
    }
}

impl Element for f64 {
    const NAME: &'static str = "f64";

    fn from_f64_lossy(value: f64) -> Self {
        value
    }

    fn to_f64_lossy(self) -> f64 {
        self
    }
}

/// 将任意精度的数组转换为精度`B`
pub fn cast_array<A, B, D>(array: &Array<A, D>) -> Array<B, D>
where
    A: Element,
    B: Element,
    D: Dimension,
{
    array.mapv(|v| B::from_f64_lossy(v.to_f64_lossy()))
}

/// 有种子则用种子构造可复现的随机数发生器，否则从系统熵构造
pub(crate) fn new_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// 一次Box-Muller变换，得到两个独立的标准正态样本
fn box_muller<R: Rng + ?Sized>(rng: &mut R) -> (f64, f64) {
    // u1取(0, 1]，避免ln(0)
    let u1: f64 = 1.0 - rng.r#gen::<f64>();
    let u2: f64 = rng.r#gen();
    let r = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * std::f64::consts::PI * u2;
    (r * theta.cos(), r * theta.sin())
}

/// 创建一个形状为`(rows, cols)`、服从正态分布N(mean, std_dev²)的随机矩阵。
pub(crate) fn normal_array2<A, R>(
    mean: f64,
    std_dev: f64,
    shape: (usize, usize),
    rng: &mut R,
) -> Array2<A>
where
    A: Element,
    R: Rng + ?Sized,
{
    let mut spare: Option<f64> = None;
    Array2::from_shape_fn(shape, |_| {
        let z = match spare.take() {
            Some(z) => z,
            None => {
                let (z0, z1) = box_muller(rng);
                spare = Some(z1);
                z0
            }
        };
        A::from_f64_lossy(mean + std_dev * z)
    })
}
