/*
 * @Author       : 老董
 * @Date         : 2026-03-08
 * @Description  : 梯度下降优化器实现
 */

use ndarray::{Array, Dimension};
use tracing::trace;

use crate::errors::NetError;
use crate::nn::params::{Gradients, ParamStore};
use crate::utils::Element;

/// SGD (随机梯度下降) 优化器
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sgd {
    learning_rate: f64,
}

impl Sgd {
    pub const fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }

    pub const fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// 梯度下降更新：θ = θ - α * ∇θ，作用于每一个参数
    ///
    /// `grads`须与`params`有相同的键与形状，否则panic
    pub fn step<A: Element>(&self, params: &mut ParamStore<A>, grads: &Gradients<A>) {
        assert!(
            params.same_keys(grads),
            "{}",
            NetError::ShapeMismatch {
                op: "SGD参数与梯度的键集合",
                expected: vec![params.keys().count()],
                got: vec![grads.keys().count()],
            }
        );

        let alpha = -A::from_f64_lossy(self.learning_rate);
        for (param, grad) in params.layers_mut().iter_mut().zip(grads.layers()) {
            descend(&mut param.w, &grad.w, alpha, "SGD更新W");
            descend(&mut param.b, &grad.b, alpha, "SGD更新b");
            if let (Some(bn), Some(dbn)) = (param.bn_mut(), grad.bn()) {
                descend(&mut bn.gamma, &dbn.gamma, alpha, "SGD更新gamma");
                descend(&mut bn.beta, &dbn.beta, alpha, "SGD更新beta");
            }
        }
        trace!(learning_rate = self.learning_rate, "SGD更新参数");
    }
}

fn descend<A: Element, D: Dimension>(
    param: &mut Array<A, D>,
    grad: &Array<A, D>,
    alpha: A,
    op: &'static str,
) {
    assert!(
        param.shape() == grad.shape(),
        "{}",
        NetError::ShapeMismatch {
            op,
            expected: param.shape().to_vec(),
            got: grad.shape().to_vec(),
        }
    );
    param.scaled_add(alpha, grad);
}
