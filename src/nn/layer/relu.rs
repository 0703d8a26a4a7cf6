/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : ReLU激活：out = max(0, x)
 */

use ndarray::{Array2, Zip};

use crate::errors::NetError;
use crate::utils::Element;

#[derive(Debug, Clone)]
pub struct ReluCache<A> {
    x: Array2<A>,
}

pub fn relu_forward<A: Element>(x: Array2<A>) -> (Array2<A>, ReluCache<A>) {
    let out = x.mapv(|v| v.max(A::zero()));
    (out, ReluCache { x })
}

/// 仅在输入严格大于0处回传梯度
pub fn relu_backward<A: Element>(mut dout: Array2<A>, cache: ReluCache<A>) -> Array2<A> {
    assert!(
        dout.shape() == cache.x.shape(),
        "{}",
        NetError::ShapeMismatch {
            op: "ReLU的反向传播",
            expected: cache.x.shape().to_vec(),
            got: dout.shape().to_vec(),
        }
    );
    Zip::from(&mut dout).and(&cache.x).for_each(|d, &x| {
        if x <= A::zero() {
            *d = A::zero();
        }
    });
    dout
}
