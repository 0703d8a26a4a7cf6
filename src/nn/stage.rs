/*
 * @Author       : 老董
 * @Date         : 2026-03-05
 * @Description  : 子层流水线
 *
 * `FullyConnectedNet`在构造时把可选的批归一化、dropout“编译”成一个固定的子层列表：
 * [Affine(1), BatchNorm(1)?, Relu(1), Dropout(1)?, ..., Affine(L)]
 * 前向按顺序执行并把每个子层的缓存压栈，反向逐个出栈，
 * 因此反向遍历的子层恰好是前向遍历过的那些，顺序相反。
 */

use std::fmt;

use ndarray::{Array1, Array2};

use super::Mode;
use super::layer::{
    AffineCache, BatchNormCache, BatchNormConfig, BatchNormStats, DropoutCache, DropoutConfig,
    ReluCache, affine_backward, affine_forward, batch_norm_backward, batch_norm_forward,
    dropout_backward, dropout_forward, relu_backward, relu_forward,
};
use super::params::{ParamKey, ParamStore};
use crate::errors::NetError;
use crate::utils::Element;

/// 一个子层，携带所属的层号（从1开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Affine(usize),
    BatchNorm(usize),
    Relu(usize),
    Dropout(usize),
}

/// 子层前向时保存的缓存
#[derive(Debug)]
pub(crate) enum StageCache<A> {
    Affine(AffineCache<A>),
    BatchNorm(BatchNormCache<A>),
    Relu(ReluCache<A>),
    Dropout(DropoutCache<A>),
}

/// 子层反向得到的参数梯度
pub(crate) enum StageGrads<A> {
    None,
    Affine { dw: Array2<A>, db: Array1<A> },
    BatchNorm { dgamma: Array1<A>, dbeta: Array1<A> },
}

/// 前向计算所需的只读上下文
pub(crate) struct StageContext<'a, A> {
    pub params: &'a ParamStore<A>,
    pub dropout: Option<&'a DropoutConfig>,
    pub batch_norm: &'a BatchNormConfig,
    pub mode: Mode,
}

impl Stage {
    /// 按L-1个隐藏层与两个开关生成完整的子层列表（含最后的输出仿射层）
    pub(crate) fn compile(
        num_hidden: usize,
        use_batchnorm: bool,
        use_dropout: bool,
    ) -> Vec<Self> {
        let mut stages = Vec::with_capacity(num_hidden * 4 + 1);
        for i in 1..=num_hidden {
            stages.push(Self::Affine(i));
            if use_batchnorm {
                stages.push(Self::BatchNorm(i));
            }
            stages.push(Self::Relu(i));
            if use_dropout {
                stages.push(Self::Dropout(i));
            }
        }
        stages.push(Self::Affine(num_hidden + 1));
        stages
    }

    pub(crate) const fn layer(self) -> usize {
        match self {
            Self::Affine(i) | Self::BatchNorm(i) | Self::Relu(i) | Self::Dropout(i) => i,
        }
    }

    /// 子层前向。`stats`为各隐藏层的批归一化统计量，按层号从1开始对应`stats[i - 1]`
    pub(crate) fn forward<A: Element>(
        self,
        x: Array2<A>,
        ctx: &StageContext<'_, A>,
        stats: &mut [BatchNormStats<A>],
    ) -> (Array2<A>, StageCache<A>) {
        let i = self.layer();
        match self {
            Self::Affine(_) => {
                let layer = ctx.params.layer(i).unwrap_or_else(|| {
                    panic!("{}", NetError::MissingParam(ParamKey::W(i).to_string()))
                });
                let (out, cache) = affine_forward(x, &layer.w, &layer.b);
                (out, StageCache::Affine(cache))
            }
            Self::BatchNorm(_) => {
                let bn = ctx
                    .params
                    .layer(i)
                    .and_then(|layer| layer.bn())
                    .unwrap_or_else(|| {
                        panic!("{}", NetError::MissingParam(ParamKey::Gamma(i).to_string()))
                    });
                let num_stats = stats.len();
                let layer_stats = stats.get_mut(i - 1).unwrap_or_else(|| {
                    panic!(
                        "{}",
                        NetError::ShapeMismatch {
                            op: "批归一化统计量的个数",
                            expected: vec![i],
                            got: vec![num_stats],
                        }
                    )
                });
                let (out, cache) = batch_norm_forward(
                    &x,
                    &bn.gamma,
                    &bn.beta,
                    layer_stats,
                    ctx.mode,
                    ctx.batch_norm,
                );
                (out, StageCache::BatchNorm(cache))
            }
            Self::Relu(_) => {
                let (out, cache) = relu_forward(x);
                (out, StageCache::Relu(cache))
            }
            Self::Dropout(_) => {
                let config = ctx.dropout.unwrap_or_else(|| {
                    panic!(
                        "{}",
                        NetError::InvalidConfig("子层列表含dropout，却没有dropout配置".to_string())
                    )
                });
                let (out, cache) = dropout_forward(x, config, ctx.mode);
                (out, StageCache::Dropout(cache))
            }
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Affine(i) => write!(f, "affine{i}"),
            Self::BatchNorm(i) => write!(f, "batchnorm{i}"),
            Self::Relu(i) => write!(f, "relu{i}"),
            Self::Dropout(i) => write!(f, "dropout{i}"),
        }
    }
}

impl<A: Element> StageCache<A> {
    /// 子层反向：消费本缓存，返回对子层输入的梯度及参数梯度
    pub(crate) fn backward(self, dout: Array2<A>) -> (Array2<A>, StageGrads<A>) {
        match self {
            Self::Affine(cache) => {
                let (dx, dw, db) = affine_backward(&dout, cache);
                (dx, StageGrads::Affine { dw, db })
            }
            Self::BatchNorm(cache) => {
                let (dx, dgamma, dbeta) = batch_norm_backward(&dout, cache);
                (dx, StageGrads::BatchNorm { dgamma, dbeta })
            }
            Self::Relu(cache) => (relu_backward(dout, cache), StageGrads::None),
            Self::Dropout(cache) => (dropout_backward(dout, cache), StageGrads::None),
        }
    }
}
