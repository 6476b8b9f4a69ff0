//! # 周期扫描读口（PeriodicReader）
//!
//! 每个帧边界脉冲把选择指针复制进显示锁存，之后整个周期内的扫描地址都从锁存槽位读取，
//! 绝不直接跟随选择指针，从而保证一帧画面全部来自同一代数据。
//!
//! - 从未有槽位完成时保留原锁存（上电默认槽位 0），此时锁存不“生效”，也不阻止写口；
//! - 锁存生效后登记为池的显示保留，写口不会认领该槽位；
//! - 扫描不独占槽位，可以与随机读口会话同时读取同一个 `Busy` 槽位。

use crate::{error::FrameBankError, pool::Pool, router::FrameType, slot::SlotId};

/// 按帧边界锁存槽位的扫描读口。
#[derive(Clone, Debug)]
pub struct PeriodicReader {
    pool: FrameType,
    latch: SlotId,
    engaged: bool,
    periods: u64,
}

impl PeriodicReader {
    pub fn new(pool: FrameType) -> Self {
        Self {
            pool,
            latch: SlotId::new(0),
            engaged: false,
            periods: 0,
        }
    }

    /// 当前锁存的槽位。
    pub fn latched_slot(&self) -> SlotId {
        self.latch
    }

    /// 锁存是否已捕获过一个完成槽位。
    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// 已经历的帧边界数。
    pub fn periods(&self) -> u64 {
        self.periods
    }

    /// 帧边界脉冲：刷新锁存并返回本周期使用的槽位。
    pub fn frame_boundary(&mut self, pool: &mut Pool) -> SlotId {
        self.periods += 1;
        if let Some(selected) = pool.selection() {
            if !self.engaged || selected != self.latch {
                tracing::debug!(
                    pool = %self.pool,
                    from = %self.latch,
                    to = %selected,
                    period = self.periods,
                    "display latch refreshed"
                );
            }
            self.latch = selected;
            self.engaged = true;
            pool.set_display_hold(Some(selected));
        }
        self.latch
    }

    /// 扫描读取：始终从锁存槽位取数。
    pub fn scan(&self, pool: &Pool, address: usize) -> Result<u8, FrameBankError> {
        pool.slot(self.latch)?
            .read(address)
            .ok_or(FrameBankError::ScanOutOfRange {
                pool: self.pool,
                address,
                capacity: pool.capacity(),
            })
    }

    /// 复位：回到上电默认锁存。
    pub(crate) fn reset(&mut self) {
        self.latch = SlotId::new(0);
        self.engaged = false;
    }
}
