//! # 复位序列（ResetSequencer）
//!
//! 状态机：`Idle → Clearing(池 A 槽 0) → … → Clearing(池 B 槽 0) → … → Done → Idle`。
//! 每个时钟清零一个地址，总耗时为所有池 `槽位数 × 容量` 之和。清零期间写口拒收、读口会话不建立；
//! 中途再次复位会从池 A 槽 0 地址 0 重新开始，不做断点续清。

use crate::{pool::Pool, slot::SlotId};

/// 复位序列的阶段。
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ResetPhase {
    /// 没有复位在进行。
    #[default]
    Idle,
    /// 下一个时钟将清零 `(pool, slot, address)`。
    Clearing {
        pool: usize,
        slot: usize,
        address: usize,
    },
    /// 全部地址已清零，保持一个时钟后回到 `Idle`。
    Done,
}

/// 逐地址清零全部存储的序列器。
#[derive(Clone, Debug, Default)]
pub struct ResetSequencer {
    phase: ResetPhase,
    cycles_completed: u64,
}

impl ResetSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ResetPhase {
        self.phase
    }

    /// 是否仍在清零，期间其它组件不得运行。
    pub fn is_clearing(&self) -> bool {
        matches!(self.phase, ResetPhase::Clearing { .. })
    }

    /// 已完整走完的复位次数。
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    /// 复位输入：无条件从头开始清零。
    pub(crate) fn assert_reset(&mut self) {
        self.phase = ResetPhase::Clearing {
            pool: 0,
            slot: 0,
            address: 0,
        };
    }

    /// 推进一个时钟。
    pub(crate) fn step(&mut self, pools: &mut [Pool]) -> ResetPhase {
        self.phase = match self.phase {
            ResetPhase::Idle | ResetPhase::Done => ResetPhase::Idle,
            ResetPhase::Clearing {
                pool,
                slot,
                address,
            } => {
                if let Some(target) = pools.get_mut(pool) {
                    if let Ok(cell) = target.slot_mut(SlotId::new(slot)) {
                        cell.clear_address(address);
                    }
                }
                self.advance(pools, pool, slot, address)
            }
        };
        self.phase
    }

    fn advance(&mut self, pools: &[Pool], pool: usize, slot: usize, address: usize) -> ResetPhase {
        let Some(current) = pools.get(pool) else {
            return self.finish();
        };
        if address + 1 < current.capacity() {
            return ResetPhase::Clearing {
                pool,
                slot,
                address: address + 1,
            };
        }
        if slot + 1 < current.slot_count() {
            return ResetPhase::Clearing {
                pool,
                slot: slot + 1,
                address: 0,
            };
        }
        if pool + 1 < pools.len() {
            return ResetPhase::Clearing {
                pool: pool + 1,
                slot: 0,
                address: 0,
            };
        }
        self.finish()
    }

    fn finish(&mut self) -> ResetPhase {
        self.cycles_completed += 1;
        tracing::debug!(cycles = self.cycles_completed, "reset sequence done");
        ResetPhase::Done
    }
}
