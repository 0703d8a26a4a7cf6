//! # fcnet
//!
//! `fcnet`用纯rust实现全连接分类网络的前向与反向计算：
//! 固定结构的两层网络[`nn::TwoLayerNet`]，
//! 以及层数任意、可选批归一化与dropout的[`nn::FullyConnectedNet`]。
//! 损失为softmax交叉熵加L2正则项，梯度以与参数同构的[`nn::ParamStore`]返回，
//! 参数更新交给外部优化器（如[`nn::Sgd`]）。
//!

pub mod errors;
pub mod nn;
pub mod utils;
