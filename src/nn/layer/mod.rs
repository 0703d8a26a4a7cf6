/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 基本层函数：每个层都是一对纯函数。
 *                 前向函数：输入 → （输出，缓存）；
 *                 反向函数：（上游梯度，缓存） → 下游梯度。
 *                 缓存按值传入反向函数，因此每个缓存只能被消费一次。
 */

mod affine;
mod batch_norm;
mod dropout;
mod relu;
mod softmax_loss;

pub use affine::{AffineCache, affine_backward, affine_forward, flatten_batch};
pub use batch_norm::{
    BatchNormCache, BatchNormConfig, BatchNormStats, batch_norm_backward, batch_norm_forward,
};
pub use dropout::{DropoutCache, DropoutConfig, dropout_backward, dropout_forward};
pub use relu::{ReluCache, relu_backward, relu_forward};
pub use softmax_loss::softmax_loss;
