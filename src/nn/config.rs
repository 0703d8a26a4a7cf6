/*
 * @Author       : 老董
 * @Date         : 2026-03-04
 * @Description  : 两种网络的超参数配置。构造后不可变；可由JSON加载。
 *                 默认值对应CIFAR-10规模的输入（3×32×32）与10个类别。
 */

use serde::{Deserialize, Serialize};

use crate::errors::NetError;
use crate::nn::layer::BatchNormConfig;

const DEFAULT_INPUT_DIM: usize = 3 * 32 * 32;
const DEFAULT_NUM_CLASSES: usize = 10;

/// `TwoLayerNet`的配置：affine - relu - affine - softmax
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwoLayerConfig {
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub num_classes: usize,
    /// 权重初始化的标准差
    pub weight_scale: f64,
    /// L2正则化强度
    pub reg: f64,
    /// 权重初始化的随机种子；None则每次构造都不同
    pub init_seed: Option<u64>,
}

impl Default for TwoLayerConfig {
    fn default() -> Self {
        Self {
            input_dim: DEFAULT_INPUT_DIM,
            hidden_dim: 100,
            num_classes: DEFAULT_NUM_CLASSES,
            weight_scale: 1e-3,
            reg: 0.0,
            init_seed: None,
        }
    }
}

impl TwoLayerConfig {
    pub fn new(input_dim: usize, hidden_dim: usize, num_classes: usize) -> Self {
        Self {
            input_dim,
            hidden_dim,
            num_classes,
            ..Self::default()
        }
    }

    pub const fn with_weight_scale(mut self, weight_scale: f64) -> Self {
        self.weight_scale = weight_scale;
        self
    }

    pub const fn with_reg(mut self, reg: f64) -> Self {
        self.reg = reg;
        self
    }

    pub const fn with_init_seed(mut self, seed: u64) -> Self {
        self.init_seed = Some(seed);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, NetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, NetError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), NetError> {
        check_dims(self.input_dim, &[self.hidden_dim], self.num_classes)?;
        check_scalars(self.weight_scale, self.reg)
    }
}

/// `FullyConnectedNet`的配置：
/// {affine - [batch norm] - relu - [dropout]} × (L - 1) - affine - softmax
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FullyConnectedConfig {
    /// 各隐藏层宽度，可以为空（此时网络退化为单个仿射层 + softmax）
    pub hidden_dims: Vec<usize>,
    pub input_dim: usize,
    pub num_classes: usize,
    /// dropout的保留概率；0表示不使用dropout
    pub dropout: f64,
    pub use_batchnorm: bool,
    /// L2正则化强度
    pub reg: f64,
    /// 权重初始化的标准差
    pub weight_scale: f64,
    /// dropout的随机种子，给出后每次前向的掩码都相同（用于梯度检验）
    pub seed: Option<u64>,
    /// 权重初始化的随机种子
    pub init_seed: Option<u64>,
    pub batch_norm: BatchNormConfig,
}

impl Default for FullyConnectedConfig {
    fn default() -> Self {
        Self {
            hidden_dims: Vec::new(),
            input_dim: DEFAULT_INPUT_DIM,
            num_classes: DEFAULT_NUM_CLASSES,
            dropout: 0.0,
            use_batchnorm: false,
            reg: 0.0,
            weight_scale: 1e-2,
            seed: None,
            init_seed: None,
            batch_norm: BatchNormConfig::default(),
        }
    }
}

impl FullyConnectedConfig {
    pub fn new(hidden_dims: Vec<usize>, input_dim: usize, num_classes: usize) -> Self {
        Self {
            hidden_dims,
            input_dim,
            num_classes,
            ..Self::default()
        }
    }

    pub fn with_dropout(mut self, p: f64) -> Self {
        self.dropout = p;
        self
    }

    pub fn with_batchnorm(mut self, use_batchnorm: bool) -> Self {
        self.use_batchnorm = use_batchnorm;
        self
    }

    pub fn with_reg(mut self, reg: f64) -> Self {
        self.reg = reg;
        self
    }

    pub fn with_weight_scale(mut self, weight_scale: f64) -> Self {
        self.weight_scale = weight_scale;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_init_seed(mut self, seed: u64) -> Self {
        self.init_seed = Some(seed);
        self
    }

    pub fn with_batch_norm_config(mut self, batch_norm: BatchNormConfig) -> Self {
        self.batch_norm = batch_norm;
        self
    }

    pub fn use_dropout(&self) -> bool {
        self.dropout > 0.0
    }

    /// 层数L = 隐藏层数 + 1（输出层）
    pub fn num_layers(&self) -> usize {
        self.hidden_dims.len() + 1
    }

    pub fn from_json(json: &str) -> Result<Self, NetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, NetError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), NetError> {
        check_dims(self.input_dim, &self.hidden_dims, self.num_classes)?;
        check_scalars(self.weight_scale, self.reg)?;
        if !(0.0..=1.0).contains(&self.dropout) {
            return Err(NetError::InvalidConfig(format!(
                "dropout的保留概率须在[0, 1]内，实际为{}",
                self.dropout
            )));
        }
        if self.use_batchnorm {
            let BatchNormConfig { eps, momentum } = self.batch_norm;
            if !(eps > 0.0 && eps.is_finite()) {
                return Err(NetError::InvalidConfig(format!(
                    "批归一化的eps须为正数，实际为{eps}"
                )));
            }
            if !(0.0..=1.0).contains(&momentum) {
                return Err(NetError::InvalidConfig(format!(
                    "批归一化的momentum须在[0, 1]内，实际为{momentum}"
                )));
            }
        }
        Ok(())
    }
}

fn check_dims(input_dim: usize, hidden_dims: &[usize], num_classes: usize) -> Result<(), NetError> {
    if input_dim == 0 {
        return Err(NetError::InvalidConfig("输入维度须大于0".to_string()));
    }
    if let Some(i) = hidden_dims.iter().position(|&h| h == 0) {
        return Err(NetError::InvalidConfig(format!(
            "第{}个隐藏层的宽度须大于0",
            i + 1
        )));
    }
    if num_classes == 0 {
        return Err(NetError::InvalidConfig("类别数须大于0".to_string()));
    }
    Ok(())
}

fn check_scalars(weight_scale: f64, reg: f64) -> Result<(), NetError> {
    if !(weight_scale >= 0.0 && weight_scale.is_finite()) {
        return Err(NetError::InvalidConfig(format!(
            "weight_scale须为非负有限数，实际为{weight_scale}"
        )));
    }
    if !(reg >= 0.0 && reg.is_finite()) {
        return Err(NetError::InvalidConfig(format!(
            "正则化强度须为非负有限数，实际为{reg}"
        )));
    }
    Ok(())
}
