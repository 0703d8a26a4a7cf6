/*
 * @Author       : 老董
 * @Date         : 2026-03-03
 * @Description  : Softmax + 交叉熵融合损失
 */

use ndarray::{Array2, Axis};

use crate::errors::NetError;
use crate::utils::Element;

/// Softmax交叉熵损失（对批取平均）
///
/// 先减去每行最大值再求指数，避免溢出：
/// ```text
/// log p_ij = s_ij - max_i - log Σ_k exp(s_ik - max_i)
/// L = -(1/N) Σ_i log p_{i, y_i}
/// ∂L/∂s = (softmax(s) - onehot(y)) / N
/// ```
///
/// # 参数
/// - `scores`: 形状 [N, C] 的类别得分
/// - `y`: 长度为N的标签，取值[0, C)
///
/// # 返回
/// `(loss, dscores)`
pub fn softmax_loss<A: Element>(scores: &Array2<A>, y: &[usize]) -> (A, Array2<A>) {
    let (n, num_classes) = scores.dim();
    assert!(
        y.len() == n,
        "{}",
        NetError::ShapeMismatch {
            op: "softmax损失的标签",
            expected: vec![n],
            got: vec![y.len()],
        }
    );
    if let Some((index, &label)) = y.iter().enumerate().find(|&(_, &l)| l >= num_classes) {
        panic!(
            "{}",
            NetError::LabelOutOfRange {
                index,
                label,
                num_classes,
            }
        );
    }

    let row_max = scores
        .fold_axis(Axis(1), A::neg_infinity(), |&m, &v| m.max(v))
        .insert_axis(Axis(1));
    let shifted = scores - &row_max;
    let exp = shifted.mapv(A::exp);
    let sum_exp = exp.sum_axis(Axis(1)).insert_axis(Axis(1));
    let log_sum_exp = sum_exp.mapv(A::ln);

    let n_a = A::from_usize(n);
    let mut loss = A::zero();
    for (i, &label) in y.iter().enumerate() {
        loss -= shifted[[i, label]] - log_sum_exp[[i, 0]];
    }
    loss /= n_a;

    let mut dscores = exp / &sum_exp;
    for (i, &label) in y.iter().enumerate() {
        dscores[[i, label]] -= A::one();
    }
    dscores /= n_a;
    (loss, dscores)
}
