/*
 * @Author       : 老董
 * @Date         : 2026-03-08
 * @Description  : 优化器。网络本身不更新参数，由优化器在两次`compute`之间通过`params_mut()`写入
 */

mod sgd;

pub use sgd::Sgd;
