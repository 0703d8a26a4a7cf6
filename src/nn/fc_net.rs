/*
 * @Author       : 老董
 * @Date         : 2026-03-07
 * @Description  : 任意层数的全连接网络
 *
 * 对于L层的网络，结构为
 *   {affine - [batch norm] - relu - [dropout]} × (L - 1) - affine - softmax
 * 其中批归一化与dropout可选。
 * 隐藏层列表可以为空，此时网络就是一个仿射层加softmax。
 */

use std::fmt;

use ndarray::{Array, Array1, Array2, Dimension};
use tracing::{debug, trace};

use super::Mode;
use super::config::FullyConnectedConfig;
use super::layer::{BatchNormStats, DropoutConfig, flatten_batch, softmax_loss};
use super::model::{Computed, Model};
use super::params::{BatchNormParams, Gradients, LayerParams, ParamStore};
use super::stage::{Stage, StageCache, StageContext, StageGrads};
use crate::errors::NetError;
use crate::utils::{Element, new_rng, normal_array2};

/// 网络中除批归一化统计量以外的部分：配置、参数与子层列表。
/// 在一次`compute`中只读。
#[derive(Debug, Clone)]
struct Architecture<A> {
    config: FullyConnectedConfig,
    params: ParamStore<A>,
    stages: Vec<Stage>,
    dropout: Option<DropoutConfig>,
}

/// 前向时按子层顺序压入的缓存栈
type CacheStack<A> = Vec<(Stage, StageCache<A>)>;

/// 任意层数的全连接网络
///
/// # 参数键
/// - 第i层（i = 1..L）：`W{i}`、`b{i}`
/// - 启用批归一化时，第i个隐藏层（i = 1..L-1）另有：`gamma{i}`、`beta{i}`
///
/// # 批归一化统计量
/// 每个隐藏层一份[`BatchNormStats`]，训练模式的`compute`会就地更新它们，
/// 因此`compute`需要`&mut self`；也可以用[`Self::compute_with_stats`]显式传入统计量。
#[derive(Debug, Clone)]
pub struct FullyConnectedNet<A: Element = f32> {
    arch: Architecture<A>,
    bn_stats: Vec<BatchNormStats<A>>,
}

impl<A: Element> FullyConnectedNet<A> {
    /// 按配置创建网络：权重服从N(0, weight_scale²)，偏置与beta为0，gamma为1
    pub fn new(config: FullyConnectedConfig) -> Result<Self, NetError> {
        config.validate()?;

        let mut rng = new_rng(config.init_seed);
        let mut layers = Vec::with_capacity(config.num_layers());
        let mut prev_dim = config.input_dim;
        for &hidden_dim in &config.hidden_dims {
            let w = normal_array2(0.0, config.weight_scale, (prev_dim, hidden_dim), &mut rng);
            let bn = config.use_batchnorm.then(|| BatchNormParams {
                gamma: Array1::ones(hidden_dim),
                beta: Array1::zeros(hidden_dim),
            });
            layers.push(LayerParams::new(w, Array1::zeros(hidden_dim), bn));
            prev_dim = hidden_dim;
        }
        let w = normal_array2(0.0, config.weight_scale, (prev_dim, config.num_classes), &mut rng);
        layers.push(LayerParams::new(w, Array1::zeros(config.num_classes), None));

        let use_dropout = config.use_dropout();
        let dropout = use_dropout.then(|| DropoutConfig::new(config.dropout, config.seed));
        let bn_stats = if config.use_batchnorm {
            config
                .hidden_dims
                .iter()
                .map(|&hidden_dim| BatchNormStats::new(hidden_dim))
                .collect()
        } else {
            Vec::new()
        };
        let stages = Stage::compile(config.hidden_dims.len(), config.use_batchnorm, use_dropout);

        let net = Self {
            arch: Architecture {
                params: ParamStore::from_layers(layers),
                stages,
                dropout,
                config,
            },
            bn_stats,
        };
        debug!(
            num_layers = net.num_layers(),
            num_params = net.arch.params.num_params(),
            precision = A::NAME,
            "创建FullyConnectedNet：{net}"
        );
        Ok(net)
    }

    pub const fn config(&self) -> &FullyConnectedConfig {
        &self.arch.config
    }

    /// 层数L（隐藏层数 + 1）
    pub fn num_layers(&self) -> usize {
        self.arch.config.num_layers()
    }

    /// 各隐藏层的批归一化统计量；未启用批归一化时为空
    pub fn bn_stats(&self) -> &[BatchNormStats<A>] {
        &self.bn_stats
    }

    /// 推理：返回形状 [N, C] 的类别得分（批归一化使用滑动统计量，dropout为恒等）
    pub fn scores<B, D>(&self, x: &Array<B, D>) -> Array2<A>
    where
        B: Element,
        D: Dimension,
    {
        // 测试模式不修改统计量，这里的克隆只是为了满足可变借用
        let mut stats = self.bn_stats.clone();
        self.arch.scores(x, &mut stats)
    }

    /// 训练：前向、损失、反向，并更新批归一化的滑动统计量
    pub fn loss<B, D>(&mut self, x: &Array<B, D>, y: &[usize]) -> (A, Gradients<A>)
    where
        B: Element,
        D: Dimension,
    {
        self.arch.loss(x, y, &mut self.bn_stats)
    }

    /// 与[`Model::compute`]相同，但批归一化统计量由调用者显式提供。
    /// `stats`须为每个隐藏层各一份（未启用批归一化时可为空）。
    pub fn compute_with_stats<B, D>(
        &self,
        x: &Array<B, D>,
        y: Option<&[usize]>,
        stats: &mut [BatchNormStats<A>],
    ) -> Computed<A>
    where
        B: Element,
        D: Dimension,
    {
        self.arch.compute(x, y, stats)
    }
}

impl<A: Element> Architecture<A> {
    /// 无标签即测试模式，有标签即训练模式
    fn compute<B, D>(
        &self,
        x: &Array<B, D>,
        y: Option<&[usize]>,
        stats: &mut [BatchNormStats<A>],
    ) -> Computed<A>
    where
        B: Element,
        D: Dimension,
    {
        match y {
            None => Computed::Scores(self.scores(x, stats)),
            Some(y) => {
                let (loss, grads) = self.loss(x, y, stats);
                Computed::Loss { loss, grads }
            }
        }
    }

    fn scores<B, D>(&self, x: &Array<B, D>, stats: &mut [BatchNormStats<A>]) -> Array2<A>
    where
        B: Element,
        D: Dimension,
    {
        let (scores, _caches, _reg_loss) = self.forward(flatten_batch(x), Mode::Test, stats);
        trace!(batch_size = scores.nrows(), "FullyConnectedNet推理");
        scores
    }

    fn loss<B, D>(
        &self,
        x: &Array<B, D>,
        y: &[usize],
        stats: &mut [BatchNormStats<A>],
    ) -> (A, Gradients<A>)
    where
        B: Element,
        D: Dimension,
    {
        let (scores, caches, reg_loss) = self.forward(flatten_batch(x), Mode::Train, stats);
        let (data_loss, dscores) = softmax_loss(&scores, y);
        let loss = data_loss + reg_loss;
        trace!(
            batch_size = y.len(),
            data_loss = data_loss.to_f64_lossy(),
            loss = loss.to_f64_lossy(),
            "FullyConnectedNet训练计算"
        );
        (loss, self.backward(dscores, caches))
    }

    /// 依次执行所有子层。训练模式下同时累计正则项 0.5·λ·Σ‖W_i‖²
    fn forward(
        &self,
        x: Array2<A>,
        mode: Mode,
        stats: &mut [BatchNormStats<A>],
    ) -> (Array2<A>, CacheStack<A>, A) {
        if self.config.use_batchnorm {
            assert!(
                stats.len() == self.config.hidden_dims.len(),
                "{}",
                NetError::ShapeMismatch {
                    op: "批归一化统计量的个数",
                    expected: vec![self.config.hidden_dims.len()],
                    got: vec![stats.len()],
                }
            );
        }

        let ctx = StageContext {
            params: &self.params,
            dropout: self.dropout.as_ref(),
            batch_norm: &self.config.batch_norm,
            mode,
        };
        let half_reg = A::from_f64_lossy(0.5 * self.config.reg);

        let mut out = x;
        let mut caches = Vec::with_capacity(self.stages.len());
        let mut reg_loss = A::zero();
        for &stage in &self.stages {
            if let (Stage::Affine(i), Mode::Train) = (stage, mode) {
                if let Some(layer) = self.params.layer(i) {
                    reg_loss += half_reg * layer.w.iter().fold(A::zero(), |acc, &v| acc + v * v);
                }
            }
            let (next, cache) = stage.forward(out, &ctx, stats);
            out = next;
            if mode.is_train() {
                caches.push((stage, cache));
            }
        }
        (out, caches, reg_loss)
    }

    /// 按与前向相反的顺序逐个消费缓存，收集每层的梯度
    fn backward(&self, dscores: Array2<A>, mut caches: CacheStack<A>) -> Gradients<A> {
        let reg = A::from_f64_lossy(self.config.reg);
        let mut layers = Vec::with_capacity(self.params.num_layers());
        // 反向时同一层的批归一化先于仿射层出栈
        let mut pending_bn = None;
        let mut dout = dscores;

        while let Some((stage, cache)) = caches.pop() {
            let (dprev, grads) = cache.backward(dout);
            dout = dprev;
            match grads {
                StageGrads::Affine { mut dw, db } => {
                    if let Some(layer) = self.params.layer(stage.layer()) {
                        dw.scaled_add(reg, &layer.w);
                    }
                    layers.push(LayerParams::new(dw, db, pending_bn.take()));
                }
                StageGrads::BatchNorm { dgamma, dbeta } => {
                    pending_bn = Some(BatchNormParams {
                        gamma: dgamma,
                        beta: dbeta,
                    });
                }
                StageGrads::None => {}
            }
        }

        layers.reverse();
        ParamStore::from_layers(layers)
    }
}

impl<A: Element> Model<A> for FullyConnectedNet<A> {
    fn compute<B, D>(&mut self, x: &Array<B, D>, y: Option<&[usize]>) -> Computed<A>
    where
        B: Element,
        D: Dimension,
    {
        self.arch.compute(x, y, &mut self.bn_stats)
    }

    fn params(&self) -> &ParamStore<A> {
        &self.arch.params
    }

    fn params_mut(&mut self) -> &mut ParamStore<A> {
        &mut self.arch.params
    }
}

/// 形如`affine1[3072→100] - relu1 - affine2[100→10] - softmax`
impl<A: Element> fmt::Display for FullyConnectedNet<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stage in &self.arch.stages {
            write!(f, "{stage}")?;
            if let Stage::Affine(i) = stage {
                if let Some(layer) = self.arch.params.layer(*i) {
                    write!(f, "[{}→{}]", layer.w.nrows(), layer.w.ncols())?;
                }
            }
            write!(f, " - ")?;
        }
        write!(f, "softmax")
    }
}
