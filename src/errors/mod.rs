/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 全库唯一的错误类型。
 *                 网络内部的契约违背（形状不符、标签越界、缓存栈错位）直接以本错误的文本触发panic；
 *                 可恢复的错误（配置校验、参数存取、键名解析）则以`Result<_, NetError>`返回。
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetError {
    // 张量形状
    #[error("{op}：形状不一致，期望{expected:?}，实际为{got:?}")]
    ShapeMismatch {
        op: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("第{index}个样本的标签{label}越界，类别数为{num_classes}")]
    LabelOutOfRange {
        index: usize,
        label: usize,
        num_classes: usize,
    },

    // 配置
    #[error("无效的超参数配置：{0}")]
    InvalidConfig(String),

    // 参数键名
    #[error("未知的参数名：`{0}`")]
    UnknownParam(String),
    #[error("缺少参数：`{0}`")]
    MissingParam(String),

    // 保存、加载
    #[error("读写文件失败：{0}")]
    Io(#[from] std::io::Error),
    #[error("参数（反）序列化失败：{0}")]
    Serialization(#[from] bincode::Error),
    #[error("配置（反）序列化失败：{0}")]
    Json(#[from] serde_json::Error),
    #[error("npz读写失败：{0}")]
    Npz(String),
}

impl From<ndarray_npy::WriteNpzError> for NetError {
    fn from(err: ndarray_npy::WriteNpzError) -> Self {
        Self::Npz(err.to_string())
    }
}

impl From<ndarray_npy::ReadNpzError> for NetError {
    fn from(err: ndarray_npy::ReadNpzError) -> Self {
        Self::Npz(err.to_string())
    }
}
