/*
 * @Author       : 老董
 * @Date         : 2026-03-04
 * @Description  : 网络参数的存储
 *
 * 参数按层组织为`Vec<LayerParams>`，用强类型的`ParamKey`寻址；
 * `ParamKey`的文本形式沿用“W1”、“b1”、“gamma1”、“beta1”的命名（层号从1开始），
 * 仅用于显示、解析和npz文件中的数组名。
 * 梯度与参数同构，因此直接复用同一个类型（见`Gradients`）。
 */

use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayViewD, ArrayViewMutD, Dimension};
use ndarray_npy::{NpzReader, NpzWriter};
use serde::{Deserialize, Serialize};

use crate::errors::NetError;
use crate::utils::Element;

/// 参数键：参数种类 + 层号（从1开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKey {
    /// 仿射层权重
    W(usize),
    /// 仿射层偏置
    B(usize),
    /// 批归一化缩放
    Gamma(usize),
    /// 批归一化平移
    Beta(usize),
}

impl ParamKey {
    /// 层号（从1开始）
    pub const fn layer(self) -> usize {
        match self {
            Self::W(i) | Self::B(i) | Self::Gamma(i) | Self::Beta(i) => i,
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::W(i) => write!(f, "W{i}"),
            Self::B(i) => write!(f, "b{i}"),
            Self::Gamma(i) => write!(f, "gamma{i}"),
            Self::Beta(i) => write!(f, "beta{i}"),
        }
    }
}

impl FromStr for ParamKey {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "beta"须先于"b"匹配
        let (ctor, index): (fn(usize) -> Self, &str) = if let Some(rest) = s.strip_prefix("gamma")
        {
            (Self::Gamma, rest)
        } else if let Some(rest) = s.strip_prefix("beta") {
            (Self::Beta, rest)
        } else if let Some(rest) = s.strip_prefix('W') {
            (Self::W, rest)
        } else if let Some(rest) = s.strip_prefix('b') {
            (Self::B, rest)
        } else {
            return Err(NetError::UnknownParam(s.to_string()));
        };

        // 层号只能是不带前导0的正整数，保证与`Display`互逆
        let is_canonical = !index.is_empty()
            && !index.starts_with('0')
            && index.chars().all(|c| c.is_ascii_digit());
        match index.parse::<usize>() {
            Ok(i) if is_canonical => Ok(ctor(i)),
            _ => Err(NetError::UnknownParam(s.to_string())),
        }
    }
}

/// 批归一化层的可学习参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "A: Element")]
pub struct BatchNormParams<A> {
    pub gamma: Array1<A>,
    pub beta: Array1<A>,
}

/// 一层的全部参数：仿射层的W、b，以及（若启用）批归一化的gamma、beta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "A: Element")]
pub struct LayerParams<A> {
    pub w: Array2<A>,
    pub b: Array1<A>,
    bn: Option<BatchNormParams<A>>,
}

impl<A: Element> LayerParams<A> {
    pub const fn new(w: Array2<A>, b: Array1<A>, bn: Option<BatchNormParams<A>>) -> Self {
        Self { w, b, bn }
    }

    pub const fn bn(&self) -> Option<&BatchNormParams<A>> {
        self.bn.as_ref()
    }

    /// 只能修改gamma、beta的取值，不能增删它们（参数键集合在构造后固定）
    pub fn bn_mut(&mut self) -> Option<&mut BatchNormParams<A>> {
        self.bn.as_mut()
    }

    fn zeros_like(&self) -> Self {
        Self {
            w: Array2::zeros(self.w.raw_dim()),
            b: Array1::zeros(self.b.raw_dim()),
            bn: self.bn.as_ref().map(|bn| BatchNormParams {
                gamma: Array1::zeros(bn.gamma.raw_dim()),
                beta: Array1::zeros(bn.beta.raw_dim()),
            }),
        }
    }
}

/// 网络参数（或与之同构的梯度）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "A: Element")]
pub struct ParamStore<A> {
    layers: Vec<LayerParams<A>>,
}

/// 一次训练模式计算得到的梯度，键集合与形状都与`ParamStore`一致
pub type Gradients<A> = ParamStore<A>;

impl<A: Element> ParamStore<A> {
    pub const fn from_layers(layers: Vec<LayerParams<A>>) -> Self {
        Self { layers }
    }

    /// 层数（含输出层）
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[LayerParams<A>] {
        &self.layers
    }

    /// 以切片形式给出，可以改取值但不能增删层
    pub fn layers_mut(&mut self) -> &mut [LayerParams<A>] {
        &mut self.layers
    }

    /// 第`i`层（从1开始）
    pub fn layer(&self, i: usize) -> Option<&LayerParams<A>> {
        i.checked_sub(1).and_then(|idx| self.layers.get(idx))
    }

    /// 按层序给出全部参数键：W、b[、gamma、beta]
    pub fn keys(&self) -> impl Iterator<Item = ParamKey> + '_ {
        self.layers.iter().enumerate().flat_map(|(idx, layer)| {
            let i = idx + 1;
            let bn_keys = layer
                .bn
                .as_ref()
                .map(|_| [ParamKey::Gamma(i), ParamKey::Beta(i)]);
            [ParamKey::W(i), ParamKey::B(i)]
                .into_iter()
                .chain(bn_keys.into_iter().flatten())
        })
    }

    pub fn contains(&self, key: ParamKey) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: ParamKey) -> Option<ArrayViewD<'_, A>> {
        let layer = self.layer(key.layer())?;
        match key {
            ParamKey::W(_) => Some(layer.w.view().into_dyn()),
            ParamKey::B(_) => Some(layer.b.view().into_dyn()),
            ParamKey::Gamma(_) => layer.bn.as_ref().map(|bn| bn.gamma.view().into_dyn()),
            ParamKey::Beta(_) => layer.bn.as_ref().map(|bn| bn.beta.view().into_dyn()),
        }
    }

    pub fn get_mut(&mut self, key: ParamKey) -> Option<ArrayViewMutD<'_, A>> {
        let layer = key
            .layer()
            .checked_sub(1)
            .and_then(|idx| self.layers.get_mut(idx))?;
        match key {
            ParamKey::W(_) => Some(layer.w.view_mut().into_dyn()),
            ParamKey::B(_) => Some(layer.b.view_mut().into_dyn()),
            ParamKey::Gamma(_) => layer.bn.as_mut().map(|bn| bn.gamma.view_mut().into_dyn()),
            ParamKey::Beta(_) => layer.bn.as_mut().map(|bn| bn.beta.view_mut().into_dyn()),
        }
    }

    /// 按层序遍历（键，参数）
    pub fn iter(&self) -> impl Iterator<Item = (ParamKey, ArrayViewD<'_, A>)> + '_ {
        self.keys()
            .filter_map(move |key| self.get(key).map(|value| (key, value)))
    }

    /// 两者的参数键集合是否完全一致
    pub fn same_keys<B: Element>(&self, other: &ParamStore<B>) -> bool {
        self.keys().eq(other.keys())
    }

    /// 形状相同、取值全为0的参数（或梯度）
    pub fn zeros_like(&self) -> Self {
        Self {
            layers: self.layers.iter().map(LayerParams::zeros_like).collect(),
        }
    }

    /// 标量参数总数
    pub fn num_params(&self) -> usize {
        self.iter().map(|(_, value)| value.len()).sum()
    }

    /// 所有权重矩阵的Frobenius范数平方之和：Σ‖W_i‖²
    pub fn sum_squared_weights(&self) -> A {
        self.layers
            .iter()
            .map(|layer| layer.w.iter().fold(A::zero(), |acc, &v| acc + v * v))
            .fold(A::zero(), |acc, v| acc + v)
    }
}

// 保存和加载参数
impl<A: Element> ParamStore<A> {
    /// 用bincode序列化为字节
    pub fn to_bytes(&self) -> Result<Vec<u8>, NetError> {
        Ok(bincode::serialize(self)?)
    }

    /// 从`to_bytes`的结果恢复
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, NetError> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// 写入npz文件，每个参数一个数组，数组名即参数名（如“W1”）
    pub fn write_npz(&self, path: impl AsRef<Path>) -> Result<(), NetError> {
        let mut npz = NpzWriter::new(File::create(path)?);
        for (i, layer) in self.layers.iter().enumerate().map(|(idx, l)| (idx + 1, l)) {
            npz.add_array(ParamKey::W(i).to_string(), &layer.w)?;
            npz.add_array(ParamKey::B(i).to_string(), &layer.b)?;
            if let Some(bn) = &layer.bn {
                npz.add_array(ParamKey::Gamma(i).to_string(), &bn.gamma)?;
                npz.add_array(ParamKey::Beta(i).to_string(), &bn.beta)?;
            }
        }
        npz.finish()?;
        Ok(())
    }

    /// 从npz文件读取取值，覆盖当前参数。
    /// 以当前的参数键集合为准：文件中缺少任一参数、或形状不符都会报错，且此时当前参数保持不变。
    pub fn read_npz(&mut self, path: impl AsRef<Path>) -> Result<(), NetError> {
        let mut npz = NpzReader::new(File::open(path)?)?;
        let mut loaded = self.clone();
        for (i, layer) in loaded.layers.iter_mut().enumerate().map(|(idx, l)| (idx + 1, l)) {
            read_into(&mut npz, ParamKey::W(i), &mut layer.w)?;
            read_into(&mut npz, ParamKey::B(i), &mut layer.b)?;
            if let Some(bn) = &mut layer.bn {
                read_into(&mut npz, ParamKey::Gamma(i), &mut bn.gamma)?;
                read_into(&mut npz, ParamKey::Beta(i), &mut bn.beta)?;
            }
        }
        *self = loaded;
        Ok(())
    }
}

fn read_into<A, D>(
    npz: &mut NpzReader<File>,
    key: ParamKey,
    target: &mut ndarray::Array<A, D>,
) -> Result<(), NetError>
where
    A: Element,
    D: Dimension,
{
    let name = key.to_string();
    let value: ndarray::Array<A, D> = npz.by_name(&name)?;
    if value.shape() != target.shape() {
        return Err(NetError::ShapeMismatch {
            op: "读取npz参数",
            expected: target.shape().to_vec(),
            got: value.shape().to_vec(),
        });
    }
    *target = value;
    Ok(())
}
