/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 训练/测试模式
 */

/// 一次前向计算所处的模式。
/// 由是否提供标签决定，并显式传入 dropout 与批归一化的前向函数，
/// 而不是写进某个共享的配置对象里。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// 训练：dropout 生效，批归一化使用并更新批统计量，随后执行反向传播
    #[default]
    Train,
    /// 测试：dropout 为恒等映射，批归一化使用滑动统计量，不执行反向传播
    Test,
}

impl Mode {
    pub const fn is_train(self) -> bool {
        matches!(self, Self::Train)
    }
}
