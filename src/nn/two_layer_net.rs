/*
 * @Author       : 老董
 * @Date         : 2026-03-06
 * @Description  : 两层全连接网络：affine - relu - affine - softmax
 *
 * 输入维度D，隐藏层宽度H，类别数C。
 * 本网络不做梯度下降，参数更新由外部优化器通过`params_mut()`完成。
 */

use ndarray::{Array, Array1, Array2, Dimension};
use tracing::{debug, trace};

use super::config::TwoLayerConfig;
use super::layer::{
    AffineCache, ReluCache, affine_backward, affine_forward, flatten_batch, relu_backward,
    relu_forward, softmax_loss,
};
use super::model::{Computed, Model};
use super::params::{Gradients, LayerParams, ParamStore};
use crate::errors::NetError;
use crate::utils::{Element, new_rng, normal_array2};

/// 两层全连接网络。参数键为W1、b1、W2、b2
#[derive(Debug, Clone)]
pub struct TwoLayerNet<A: Element = f32> {
    config: TwoLayerConfig,
    params: ParamStore<A>,
}

type TwoLayerCaches<A> = (AffineCache<A>, ReluCache<A>, AffineCache<A>);

impl<A: Element> TwoLayerNet<A> {
    /// 按配置创建网络：W1 ∈ R^{D×H}、W2 ∈ R^{H×C}服从N(0, weight_scale²)，b1、b2为0
    pub fn new(config: TwoLayerConfig) -> Result<Self, NetError> {
        config.validate()?;
        let TwoLayerConfig {
            input_dim,
            hidden_dim,
            num_classes,
            weight_scale,
            ..
        } = config;

        let mut rng = new_rng(config.init_seed);
        let w1 = normal_array2(0.0, weight_scale, (input_dim, hidden_dim), &mut rng);
        let w2 = normal_array2(0.0, weight_scale, (hidden_dim, num_classes), &mut rng);
        let params = ParamStore::from_layers(vec![
            LayerParams::new(w1, Array1::zeros(hidden_dim), None),
            LayerParams::new(w2, Array1::zeros(num_classes), None),
        ]);
        debug!(
            input_dim,
            hidden_dim,
            num_classes,
            weight_scale,
            reg = config.reg,
            precision = A::NAME,
            "创建TwoLayerNet"
        );

        Ok(Self { config, params })
    }

    pub const fn config(&self) -> &TwoLayerConfig {
        &self.config
    }

    /// 推理：返回形状 [N, C] 的类别得分
    pub fn scores<B, D>(&self, x: &Array<B, D>) -> Array2<A>
    where
        B: Element,
        D: Dimension,
    {
        self.forward(flatten_batch(x)).0
    }

    /// 训练：返回含L2正则项的损失，及W1、b1、W2、b2的梯度
    pub fn loss<B, D>(&self, x: &Array<B, D>, y: &[usize]) -> (A, Gradients<A>)
    where
        B: Element,
        D: Dimension,
    {
        let (scores, (cache_a1, cache_r, cache_a2)) = self.forward(flatten_batch(x));
        let (data_loss, dscores) = softmax_loss(&scores, y);

        let reg = A::from_f64_lossy(self.config.reg);
        let (layer1, layer2) = self.layers();

        let (dh2, mut dw2, db2) = affine_backward(&dscores, cache_a2);
        dw2.scaled_add(reg, &layer2.w);
        let dh1 = relu_backward(dh2, cache_r);
        let (_dx, mut dw1, db1) = affine_backward(&dh1, cache_a1);
        dw1.scaled_add(reg, &layer1.w);

        let half = A::from_f64_lossy(0.5);
        let loss = data_loss + half * reg * self.params.sum_squared_weights();
        trace!(batch_size = y.len(), loss = loss.to_f64_lossy(), "TwoLayerNet训练计算");

        let grads = ParamStore::from_layers(vec![
            LayerParams::new(dw1, db1, None),
            LayerParams::new(dw2, db2, None),
        ]);
        (loss, grads)
    }

    fn forward(&self, x: Array2<A>) -> (Array2<A>, TwoLayerCaches<A>) {
        let (layer1, layer2) = self.layers();
        let (h1, cache_a1) = affine_forward(x, &layer1.w, &layer1.b);
        let (h2, cache_r) = relu_forward(h1);
        let (scores, cache_a2) = affine_forward(h2, &layer2.w, &layer2.b);
        (scores, (cache_a1, cache_r, cache_a2))
    }

    fn layers(&self) -> (&LayerParams<A>, &LayerParams<A>) {
        match self.params.layers() {
            [layer1, layer2] => (layer1, layer2),
            layers => panic!(
                "{}",
                NetError::ShapeMismatch {
                    op: "TwoLayerNet的层数",
                    expected: vec![2],
                    got: vec![layers.len()],
                }
            ),
        }
    }
}

impl<A: Element> Model<A> for TwoLayerNet<A> {
    fn compute<B, D>(&mut self, x: &Array<B, D>, y: Option<&[usize]>) -> Computed<A>
    where
        B: Element,
        D: Dimension,
    {
        match y {
            None => Computed::Scores(self.scores(x)),
            Some(y) => {
                let (loss, grads) = self.loss(x, y);
                Computed::Loss { loss, grads }
            }
        }
    }

    fn params(&self) -> &ParamStore<A> {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamStore<A> {
        &mut self.params
    }
}
