/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 仿射（全连接）层：out = x·W + b
 */

use ndarray::{Array, Array1, Array2, Axis, Dimension};

use crate::errors::NetError;
use crate::utils::Element;

/// 仿射层前向时保存的输入与权重
#[derive(Debug, Clone)]
pub struct AffineCache<A> {
    x: Array2<A>,
    w: Array2<A>,
}

/// 将形状为(N, d_1, ..., d_k)的一批样本展平为(N, D)的矩阵（D = d_1·...·d_k），
/// 同时转换为精度`A`。输入至少要有1个维度（批维度）。
pub fn flatten_batch<A, B, D>(x: &Array<B, D>) -> Array2<A>
where
    A: Element,
    B: Element,
    D: Dimension,
{
    assert!(
        x.ndim() >= 1,
        "{}",
        NetError::ShapeMismatch {
            op: "展平批数据",
            expected: vec![0],
            got: x.shape().to_vec(),
        }
    );
    let n = x.shape()[0];
    let d = x.shape()[1..].iter().product::<usize>();
    // 按逻辑（行优先）顺序逐个取值
    let mut values = x.iter();
    Array2::from_shape_fn((n, d), |_| {
        values
            .next()
            .map_or_else(A::zero, |&v| A::from_f64_lossy(v.to_f64_lossy()))
    })
}

/// 仿射层前向：`out = x·W + b`
///
/// # 参数
/// - `x`: 输入，形状 [N, D]（多维输入请先用[`flatten_batch`]展平）
/// - `w`: 权重，形状 [D, M]
/// - `b`: 偏置，形状 [M]
///
/// # Panics
/// D与`w`的行数不一致，或`b`的长度与`w`的列数不一致
pub fn affine_forward<A: Element>(
    x: Array2<A>,
    w: &Array2<A>,
    b: &Array1<A>,
) -> (Array2<A>, AffineCache<A>) {
    assert!(
        x.ncols() == w.nrows(),
        "{}",
        NetError::ShapeMismatch {
            op: "仿射变换",
            expected: vec![x.nrows(), w.nrows()],
            got: x.shape().to_vec(),
        }
    );
    assert!(
        b.len() == w.ncols(),
        "{}",
        NetError::ShapeMismatch {
            op: "仿射变换的偏置",
            expected: vec![w.ncols()],
            got: b.shape().to_vec(),
        }
    );

    let out = x.dot(w) + b;
    let cache = AffineCache { x, w: w.clone() };
    (out, cache)
}

/// 仿射层反向
///
/// # 返回
/// `(dx, dw, db)`，形状分别为 [N, D]、[D, M]、[M]
pub fn affine_backward<A: Element>(
    dout: &Array2<A>,
    cache: AffineCache<A>,
) -> (Array2<A>, Array2<A>, Array1<A>) {
    let AffineCache { x, w } = cache;
    assert!(
        dout.nrows() == x.nrows() && dout.ncols() == w.ncols(),
        "{}",
        NetError::ShapeMismatch {
            op: "仿射变换的反向传播",
            expected: vec![x.nrows(), w.ncols()],
            got: dout.shape().to_vec(),
        }
    );

    let dx = dout.dot(&w.t());
    let dw = x.t().dot(dout);
    let db = dout.sum_axis(Axis(0));
    (dx, dw, db)
}
