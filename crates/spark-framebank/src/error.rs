//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为帧缓冲控制器对外暴露的错误语义提供集中定义；
//! - 只承载“调用方契约被破坏”一类的失败：坐标越界、握手顺序错误、配置损坏、COE 文件格式错误。
//!
//! ## 设计要求（What）
//! - 背压（全部槽位不可写）与饥饿（尚无完成帧）**不是**错误，分别通过
//!   [`ReadyState`](crate::status::ReadyState) 与 `Poll::Pending` 表达；
//! - 所有变体派生 `thiserror::Error`，并保持 `Clone + Eq`，便于在测试中直接比较。

use thiserror::Error;

use crate::{
    router::FrameType,
    slot::{SlotId, SlotState},
};

/// 帧缓冲控制器的错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把读口、写口、配置与文件工具的异常收拢到一个枚举，调用方可以用 `?` 直接传播；
/// - **契约 (What)**：每个变体都携带足以定位问题的上下文（池、槽位、坐标等）；
/// - **风险 (Trade-offs)**：`ConfigParse` 与 `Coe` 以 `String` 保存底层描述，换取 `Eq` 能力。
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum FrameBankError {
    /// 随机读口收到超出图像尺寸的 `(row, col)`。
    #[error("pool {pool}: coordinate ({row}, {col}) is outside the {rows}x{cols} image")]
    AddressOutOfRange {
        pool: FrameType,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// 周期读口的扫描地址超出槽位容量。
    #[error("pool {pool}: scan address {address} exceeds slot capacity {capacity}")]
    ScanOutOfRange {
        pool: FrameType,
        address: usize,
        capacity: usize,
    },

    /// 槽位编号超出池大小。
    #[error("pool {pool}: {slot} does not exist (pool holds {slots} slots)")]
    SlotOutOfRange {
        pool: FrameType,
        slot: SlotId,
        slots: usize,
    },

    /// 单池配置下访问了未配置的第二个池。
    #[error("pool {pool} is not configured on this bank")]
    PoolNotConfigured { pool: FrameType },

    /// 在会话建立之前触发了取数。
    #[error("pool {pool}: no read session is open; request one before fetching")]
    NoSession { pool: FrameType },

    /// 上一次取数尚未交付就再次触发。
    #[error("pool {pool}: a fetch is already in flight")]
    FetchInFlight { pool: FrameType },

    /// 没有待交付的取数时轮询数据。
    #[error("pool {pool}: no fetch has been triggered")]
    NoFetchPending { pool: FrameType },

    /// 槽位状态机拒绝了非法跃迁。
    #[error("{slot}: state transition {from:?} -> {to:?} is not permitted")]
    InvalidSlotTransition {
        slot: SlotId,
        from: SlotState,
        to: SlotState,
    },

    /// 配置内容合法解析但语义不成立，例如槽位数过少。
    #[error("invalid frame bank configuration: {detail}")]
    InvalidConfig { detail: String },

    /// TOML 文本无法解析或渲染。
    #[error("failed to process frame bank configuration: {detail}")]
    ConfigParse { detail: String },

    /// COE 内存镜像格式错误。
    #[error("malformed COE image: {detail}")]
    Coe { detail: String },
}

impl FrameBankError {
    /// 构造配置语义错误的便捷函数。
    pub fn invalid_config(detail: impl Into<String>) -> Self {
        FrameBankError::InvalidConfig {
            detail: detail.into(),
        }
    }

    /// 构造 COE 格式错误的便捷函数。
    pub fn coe(detail: impl Into<String>) -> Self {
        FrameBankError::Coe {
            detail: detail.into(),
        }
    }

    /// 是否属于调用方可以通过修正输入立即规避的错误。
    ///
    /// - **契约 (What)**：坐标越界与握手顺序错误返回 `true`；配置、文件类错误返回 `false`。
    pub fn is_caller_contract_violation(&self) -> bool {
        matches!(
            self,
            FrameBankError::AddressOutOfRange { .. }
                | FrameBankError::ScanOutOfRange { .. }
                | FrameBankError::SlotOutOfRange { .. }
                | FrameBankError::PoolNotConfigured { .. }
                | FrameBankError::NoSession { .. }
                | FrameBankError::FetchInFlight { .. }
                | FrameBankError::NoFetchPending { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_coordinates() {
        let err = FrameBankError::AddressOutOfRange {
            pool: FrameType::A,
            row: 3,
            col: 1,
            rows: 3,
            cols: 3,
        };
        let text = err.to_string();
        assert!(text.contains("(3, 1)"), "错误描述应包含坐标: {text}");
        assert!(text.contains("3x3"), "错误描述应包含图像尺寸: {text}");
        assert!(err.is_caller_contract_violation());
    }

    #[test]
    fn config_errors_are_not_caller_violations() {
        let err = FrameBankError::invalid_config("slots must be at least 2");
        assert!(!err.is_caller_contract_violation());
        assert_eq!(
            err.to_string(),
            "invalid frame bank configuration: slots must be at least 2"
        );
    }
}
