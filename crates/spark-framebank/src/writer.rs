//! # 写口分配器（WriteAllocator）
//!
//! ## 核心意图（Why）
//! - 把生产者的字节流顺序写入某个槽位，写满即发布并切换到下一次传输；
//! - 在所有槽位都不可认领时拉低 ready，由生产者保持数据重试。
//!
//! ## 行为契约（What）
//! 1. 没有进行中的传输时，向路由器索取当前类型，在对应池里按下标优先级认领一个可写槽位；
//! 2. 每接收一个字节写到 `fill_count` 处并自增；
//! 3. 若正在写的槽位被读口抢走，放弃已写的部分数据，在同池另选槽位并从 0 重新计数；
//! 4. `fill_count == C` 时发布槽位、前移选择指针、翻转路由标签，下一字节开始新的传输。

use crate::{
    error::FrameBankError,
    pool::{self, Pool},
    router::{FrameType, FrameTypeRouter},
    slot::{SlotId, SlotState},
    status::{BusyReason, Completion, ReadyState, WriteOutcome},
};

/// 进行中的传输：帧类型在开始时捕获，槽位可能因被抢占而暂缺。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct ActiveTransfer {
    pool: FrameType,
    slot: Option<SlotId>,
}

/// 写口累计计数。
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WriterStats {
    /// 已接收的字节数。
    pub bytes_accepted: u64,
    /// 因背压被拒收的提交次数。
    pub rejected: u64,
    /// 被抢占而放弃的未完成传输数。
    pub abandoned: u64,
}

enum Target {
    Slot(FrameType, SlotId),
    Blocked(BusyReason),
}

/// 顺序写入并轮转槽位的分配器。
#[derive(Clone, Debug, Default)]
pub struct WriteAllocator {
    active: Option<ActiveTransfer>,
    backpressured: bool,
    stats: WriterStats,
}

impl WriteAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }

    /// 正在写入的池与槽位。
    pub fn active_slot(&self) -> Option<(FrameType, SlotId)> {
        self.active
            .and_then(|active| active.slot.map(|slot| (active.pool, slot)))
    }

    /// 不改变任何状态地计算 ready 信号。
    pub(crate) fn poll_ready(
        &self,
        pools: &[Pool],
        router: &FrameTypeRouter,
    ) -> Result<ReadyState, FrameBankError> {
        let frame_type = self
            .active
            .map_or_else(|| router.current_type(), |active| active.pool);
        let pool = pool::lookup(pools, frame_type)?;
        if let Some(slot) = self.active.and_then(|active| active.slot) {
            if pool.slot(slot)?.state() == SlotState::Filling {
                return Ok(ReadyState::Ready);
            }
        }
        Ok(match pool.select_writable(None) {
            Some(_) => ReadyState::Ready,
            None => ReadyState::Busy(no_writable_slot(pool)),
        })
    }

    /// 接收一个字节。
    pub(crate) fn accept(
        &mut self,
        pools: &mut [Pool],
        router: &mut FrameTypeRouter,
        byte: u8,
    ) -> Result<WriteOutcome, FrameBankError> {
        let (frame_type, slot_id) = match self.resolve_target(pools, router)? {
            Target::Slot(frame_type, slot_id) => (frame_type, slot_id),
            Target::Blocked(reason) => return Ok(self.reject(reason)),
        };

        let pool = pool::lookup_mut(pools, frame_type)?;
        let fill_count = pool.slot_mut(slot_id)?.push(byte);
        self.stats.bytes_accepted += 1;
        if self.backpressured {
            self.backpressured = false;
            tracing::debug!(pool = %frame_type, slot = %slot_id, "writer backpressure released");
        }

        if fill_count < pool.capacity() {
            self.active = Some(ActiveTransfer {
                pool: frame_type,
                slot: Some(slot_id),
            });
            return Ok(WriteOutcome::Accepted {
                pool: frame_type,
                slot: slot_id,
                fill_count,
            });
        }

        let generation = pool.complete(slot_id)?;
        router.on_transfer_complete(frame_type);
        self.active = None;
        tracing::debug!(
            pool = %frame_type,
            slot = %slot_id,
            generation,
            "transfer complete"
        );
        Ok(WriteOutcome::Completed(Completion {
            pool: frame_type,
            slot: slot_id,
            generation,
        }))
    }

    /// 找到本字节应写入的槽位，必要时认领新槽位。
    fn resolve_target(
        &mut self,
        pools: &mut [Pool],
        router: &FrameTypeRouter,
    ) -> Result<Target, FrameBankError> {
        let frame_type = self
            .active
            .map_or_else(|| router.current_type(), |active| active.pool);
        let pool = pool::lookup_mut(pools, frame_type)?;

        let stale = match self.active.and_then(|active| active.slot) {
            Some(slot) if pool.slot(slot)?.state() == SlotState::Filling => {
                return Ok(Target::Slot(frame_type, slot));
            }
            other => other,
        };

        if let Some(lost) = stale {
            self.stats.abandoned += 1;
            tracing::warn!(
                pool = %frame_type,
                slot = %lost,
                "slot claimed by a reader mid-transfer, partial data abandoned"
            );
            self.active = Some(ActiveTransfer {
                pool: frame_type,
                slot: None,
            });
        }

        match pool.select_writable(stale) {
            Some(slot) => {
                pool.slot_mut(slot)?.begin_fill()?;
                tracing::trace!(pool = %frame_type, slot = %slot, "slot selected for filling");
                Ok(Target::Slot(frame_type, slot))
            }
            None => Ok(Target::Blocked(no_writable_slot(pool))),
        }
    }

    fn reject(&mut self, reason: BusyReason) -> WriteOutcome {
        self.stats.rejected += 1;
        if !self.backpressured {
            self.backpressured = true;
            tracing::debug!(?reason, "writer backpressure asserted");
        }
        WriteOutcome::Rejected(reason)
    }

    /// 复位期间拒收。
    pub(crate) fn reject_resetting(&mut self) -> WriteOutcome {
        self.reject(BusyReason::Resetting)
    }

    /// 复位：丢弃进行中的传输，累计计数保留。
    pub(crate) fn reset(&mut self) {
        self.active = None;
        self.backpressured = false;
    }
}

fn no_writable_slot(pool: &Pool) -> BusyReason {
    let busy = pool.busy_count();
    BusyReason::NoWritableSlot {
        pool: pool.frame_type(),
        busy,
        held: pool.slot_count() - busy,
    }
}
