//! 帧类型路由：同一生产者交替输送两种尺寸的负载时，决定下一次传输写入哪个池。
//!
//! ## 契约说明（What）
//! - 类型标签严格按 `A, B, A, B, ...` 交替，每完成一次传输翻转一次，不检查数据内容；
//! - 标签在传输**开始**时被写口捕获，传输中途不会重新求值；
//! - 生产者若漏发或重发一次传输，路由将永久错位，直到外部复位把标签拉回 `A`。

use core::fmt;

/// 负载类型，同时作为池的寻址键。
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum FrameType {
    /// 主池（单池配置下唯一的池）。
    A,
    /// 扩展池，仅在配置 `secondary` 后存在。
    B,
}

impl FrameType {
    /// 全部类型，按复位清零的顺序排列。
    pub const ALL: [FrameType; 2] = [FrameType::A, FrameType::B];

    /// 池数组中的下标。
    pub const fn index(self) -> usize {
        match self {
            FrameType::A => 0,
            FrameType::B => 1,
        }
    }

    /// 交替序列中的下一个类型。
    pub const fn toggled(self) -> Self {
        match self {
            FrameType::A => FrameType::B,
            FrameType::B => FrameType::A,
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameType::A => f.write_str("A"),
            FrameType::B => f.write_str("B"),
        }
    }
}

/// 确定性交替路由器。
///
/// # 教案式说明
/// - **意图 (Why)**：让写口在开始新传输时知道该去哪个池找空槽；
/// - **契约 (What)**：`enabled == false` 时（单池配置）恒定返回 [`FrameType::A`]，完成事件不翻转；
/// - **风险 (Trade-offs)**：不做内容探测，节奏错位无法自动恢复。
#[derive(Clone, Debug)]
pub struct FrameTypeRouter {
    enabled: bool,
    next_type: FrameType,
    routed: [u64; 2],
}

impl FrameTypeRouter {
    /// 创建路由器；`dual_pool` 为 `false` 时路由器处于旁路状态。
    pub fn new(dual_pool: bool) -> Self {
        Self {
            enabled: dual_pool,
            next_type: FrameType::A,
            routed: [0; 2],
        }
    }

    /// 是否启用了双池交替。
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 下一次传输开始时应写入的池。
    pub fn current_type(&self) -> FrameType {
        if self.enabled {
            self.next_type
        } else {
            FrameType::A
        }
    }

    /// 写口在传输完成时调用：记录本次完成的类型并翻转标签。
    pub(crate) fn on_transfer_complete(&mut self, completed: FrameType) {
        self.routed[completed.index()] += 1;
        if self.enabled {
            self.next_type = self.next_type.toggled();
            tracing::trace!(next = %self.next_type, "frame type tag toggled");
        }
    }

    /// 已路由到指定类型池的完成传输数。
    pub fn routed(&self, frame_type: FrameType) -> u64 {
        self.routed[frame_type.index()]
    }

    /// 复位：标签回到 `A`，计数保留。
    pub(crate) fn reset(&mut self) {
        self.next_type = FrameType::A;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternates_after_every_completion() {
        let mut router = FrameTypeRouter::new(true);
        let mut seen = Vec::new();
        for _ in 0..4 {
            let ty = router.current_type();
            seen.push(ty);
            router.on_transfer_complete(ty);
        }
        assert_eq!(
            seen,
            vec![FrameType::A, FrameType::B, FrameType::A, FrameType::B]
        );
        assert_eq!(router.routed(FrameType::A), 2);
        assert_eq!(router.routed(FrameType::B), 2);
    }

    #[test]
    fn single_pool_router_never_leaves_a() {
        let mut router = FrameTypeRouter::new(false);
        for _ in 0..3 {
            assert_eq!(router.current_type(), FrameType::A);
            router.on_transfer_complete(FrameType::A);
        }
        assert_eq!(router.routed(FrameType::A), 3);
    }

    #[test]
    fn reset_realigns_to_a() {
        let mut router = FrameTypeRouter::new(true);
        router.on_transfer_complete(FrameType::A);
        assert_eq!(router.current_type(), FrameType::B);
        router.reset();
        assert_eq!(router.current_type(), FrameType::A);
    }
}
