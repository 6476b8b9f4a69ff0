//! 写口就绪与背压语义。
//!
//! ## 契约说明（What）
//! - 背压是设计内的调度点而非错误：生产者收到 [`ReadyState::Busy`] 后应在下一拍重试；
//! - [`BusyReason`] 区分“池内没有可认领槽位”与“复位序列正在清零”两种来源，便于观测与退避。

use crate::{router::FrameType, slot::SlotId};

/// 写口的就绪状态。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReadyState {
    /// 下一个字节会被接收。
    Ready,
    /// 写口拒收，需要生产者保持数据并重试。
    Busy(BusyReason),
}

impl ReadyState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReadyState::Ready)
    }
}

/// 写口繁忙的原因。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BusyReason {
    /// 目标池内所有槽位都被会话占用、被选择指针引用或被显示保留。
    ///
    /// `busy` 为会话占用数，`held` 为因选择指针或显示保留而不可认领的其余槽位数。
    NoWritableSlot {
        pool: FrameType,
        busy: usize,
        held: usize,
    },
    /// 复位序列尚未清零完毕。
    Resetting,
}

/// 单字节提交的结果，对应生产者握手中的 ready 信号。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WriteOutcome {
    /// 字节已写入，槽位尚未写满。
    Accepted {
        pool: FrameType,
        slot: SlotId,
        fill_count: usize,
    },
    /// 字节已写入且恰好写满槽位，槽位已发布。
    Completed(Completion),
    /// 字节未被接收。
    Rejected(BusyReason),
}

impl WriteOutcome {
    /// `accept(byte) -> bool` 契约：字节是否被消费。
    pub fn is_accepted(&self) -> bool {
        !matches!(self, WriteOutcome::Rejected(_))
    }
}

/// 一次完整传输的发布记录。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Completion {
    pub pool: FrameType,
    pub slot: SlotId,
    pub generation: u64,
}
