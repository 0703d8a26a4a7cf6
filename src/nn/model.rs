/*
 * @Author       : 老董
 * @Date         : 2026-03-05
 * @Description  : Model trait 定义，即外部优化器（Solver）所依赖的网络接口
 */

use ndarray::{Array, Array2, Dimension};

use super::params::{Gradients, ParamStore};
use crate::utils::Element;

/// 一次`compute`的结果
#[derive(Debug, Clone)]
pub enum Computed<A> {
    /// 测试模式（未提供标签）：形状 [N, C] 的类别得分
    Scores(Array2<A>),
    /// 训练模式：含正则项的损失，及与参数同构的梯度
    Loss { loss: A, grads: Gradients<A> },
}

impl<A> Computed<A> {
    pub fn into_scores(self) -> Option<Array2<A>> {
        match self {
            Self::Scores(scores) => Some(scores),
            Self::Loss { .. } => None,
        }
    }

    pub fn into_loss(self) -> Option<(A, Gradients<A>)> {
        match self {
            Self::Loss { loss, grads } => Some((loss, grads)),
            Self::Scores(_) => None,
        }
    }
}

/// 模型 trait
///
/// # 设计原则
/// - `new()` **不是** trait 方法（配置各异）
/// - `compute()` 是唯一的计算入口：无标签即推理，有标签即训练（前向 + 损失 + 反向）
/// - `params_mut()` 供优化器在两次`compute`之间更新参数；`compute`本身从不修改参数
///
/// # 使用示例
///
/// ```ignore
/// use fcnet::nn::{Computed, Model, Sgd, TwoLayerNet, TwoLayerConfig};
///
/// let mut net = TwoLayerNet::<f64>::new(TwoLayerConfig::new(4, 10, 3))?;
/// let sgd = Sgd::new(1e-1);
/// if let Computed::Loss { loss, grads } = net.compute(&x, Some(&y)) {
///     sgd.step(net.params_mut(), &grads);
/// }
/// ```
pub trait Model<A: Element> {
    /// 输入`x`的形状为 [N, d_1, ..., d_k]，元素可以是任意精度，会先转换为`A`；
    /// `y`为长度N的类别标签
    fn compute<B, D>(&mut self, x: &Array<B, D>, y: Option<&[usize]>) -> Computed<A>
    where
        B: Element,
        D: Dimension;

    fn params(&self) -> &ParamStore<A>;

    fn params_mut(&mut self) -> &mut ParamStore<A>;

    /// 获取标量参数数量
    fn num_params(&self) -> usize {
        self.params().num_params()
    }
}
