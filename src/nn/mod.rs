/*
 * @Author       : 老董
 * @Date         : 2024-01-31 20:23:53
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-08 10:12:40
 * @Description  : 负责全连接分类网络（neural network）的构建与前向/反向计算
 */

mod config;
mod fc_net;
pub mod layer;
mod mode;
mod model;
pub mod optimizer;
mod params;
mod stage;
mod two_layer_net;

pub use config::{FullyConnectedConfig, TwoLayerConfig};
pub use fc_net::FullyConnectedNet;
pub use layer::{BatchNormConfig, BatchNormStats, DropoutConfig};
pub use mode::Mode;
pub use model::{Computed, Model};
pub use optimizer::Sgd;
pub use params::{BatchNormParams, Gradients, LayerParams, ParamKey, ParamStore};
pub use two_layer_net::TwoLayerNet;

#[cfg(test)]
mod tests;
