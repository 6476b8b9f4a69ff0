//! # 缓冲槽位（BufferSlot）
//!
//! ## 核心意图（Why）
//! - 一个槽位就是一块固定容量的存储体加上它的生命周期状态；
//! - 以带标签的 [`SlotState`] 取代“忙/已写”等独立布尔标志，消除可表示但非法的组合。
//!
//! ## 状态机约束（What）
//! - 合法跃迁：`Free → Filling → Complete`，`Filling → Filling`（重新开始），
//!   `Complete → Filling`（写口回收旧代），`Complete | Free → Busy`（会话绑定满槽），`Busy → Free`；
//! - 复位不走状态机，直接清回 `Free`；
//! - 槽位只被 [`Pool`](crate::pool::Pool) 持有，读写一律经由写口与读口组件，不对外暴露可变存储。

use core::fmt;

use crate::error::FrameBankError;

/// 槽位在池内的编号（0..N-1）。
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SlotId(usize);

impl SlotId {
    /// 以池内下标构造编号。
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// 池内下标。
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// 槽位生命周期状态。
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SlotState {
    /// 未被任何组件占用；可能仍保存着上一代完整数据。
    Free,
    /// 写口正在顺序写入。
    Filling,
    /// 已写满并发布，等待读取。
    Complete,
    /// 被随机读口会话独占。
    Busy,
}

impl SlotState {
    /// 判断状态是否允许跃迁至 `target`。
    ///
    /// - **执行 (How)**：匹配 `(self, target)` 元组，与模块文档中的状态图一一对应。
    pub fn can_transition_to(self, target: SlotState) -> bool {
        matches!(
            (self, target),
            (SlotState::Free, SlotState::Filling)
                | (SlotState::Filling, SlotState::Filling)
                | (SlotState::Filling, SlotState::Complete)
                | (SlotState::Complete, SlotState::Filling)
                | (SlotState::Complete, SlotState::Busy)
                | (SlotState::Free, SlotState::Busy)
                | (SlotState::Busy, SlotState::Free)
        )
    }
}

/// 一块固定容量的存储体及其状态。
#[derive(Clone, Debug)]
pub struct BufferSlot {
    id: SlotId,
    storage: Box<[u8]>,
    fill_count: usize,
    state: SlotState,
    generation: u64,
}

impl BufferSlot {
    /// 创建零初始化的槽位。
    pub(crate) fn new(id: SlotId, capacity: usize) -> Self {
        Self {
            id,
            storage: vec![0u8; capacity].into_boxed_slice(),
            fill_count: 0,
            state: SlotState::Free,
            generation: 0,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// 当前已写入的元素数（0..=C）。
    pub fn fill_count(&self) -> usize {
        self.fill_count
    }

    /// 最近一次完成时盖上的代号；0 表示从未完成。
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 槽位是否保存着一整代数据。
    ///
    /// `Filling` 状态下即使计数恰好为满也返回 `false`：写入过程中的数据不可被读口绑定。
    pub fn holds_full_generation(&self) -> bool {
        self.state != SlotState::Filling && self.fill_count == self.capacity()
    }

    /// 读取线性地址处的元素；越界返回 `None`。
    pub fn read(&self, address: usize) -> Option<u8> {
        self.storage.get(address).copied()
    }

    /// 只读视图，供快照导出使用。
    pub fn contents(&self) -> &[u8] {
        &self.storage
    }

    /// 按状态机执行跃迁。
    pub(crate) fn transition(&mut self, next: SlotState) -> Result<(), FrameBankError> {
        if !self.state.can_transition_to(next) {
            return Err(FrameBankError::InvalidSlotTransition {
                slot: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// 写口认领：进入 `Filling` 并把填充计数归零。
    pub(crate) fn begin_fill(&mut self) -> Result<(), FrameBankError> {
        self.transition(SlotState::Filling)?;
        self.fill_count = 0;
        Ok(())
    }

    /// 在 `fill_count` 处写入一个元素并推进计数，返回写入后的计数。
    ///
    /// 调用方保证槽位处于 `Filling`；已满时忽略写入。
    pub(crate) fn push(&mut self, byte: u8) -> usize {
        debug_assert_eq!(self.state, SlotState::Filling);
        if let Some(cell) = self.storage.get_mut(self.fill_count) {
            *cell = byte;
            self.fill_count += 1;
        }
        self.fill_count
    }

    /// 写满后发布：进入 `Complete` 并盖上代号。
    pub(crate) fn publish(&mut self, generation: u64) -> Result<(), FrameBankError> {
        self.transition(SlotState::Complete)?;
        self.generation = generation;
        Ok(())
    }

    /// 复位时清零单个地址。
    pub(crate) fn clear_address(&mut self, address: usize) {
        if let Some(cell) = self.storage.get_mut(address) {
            *cell = 0;
        }
    }

    /// 绕过状态机直接改写状态，仅供测试构造竞态场景。
    #[cfg(test)]
    pub(crate) fn force_state(&mut self, state: SlotState) {
        self.state = state;
    }

    /// 复位时丢弃全部状态（不经过状态机）。
    pub(crate) fn drop_state(&mut self) {
        self.state = SlotState::Free;
        self.fill_count = 0;
        self.generation = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_then_publish_follows_state_machine() {
        let mut slot = BufferSlot::new(SlotId::new(0), 3);
        slot.begin_fill().expect("Free → Filling 应合法");
        for byte in [7u8, 8, 9] {
            slot.push(byte);
        }
        assert!(!slot.holds_full_generation(), "写入中的槽位不能视为整代数据");
        slot.publish(1).expect("Filling → Complete 应合法");
        assert!(slot.holds_full_generation());
        assert_eq!(slot.contents(), &[7, 8, 9]);
        assert_eq!(slot.generation(), 1);
    }

    #[test]
    fn busy_cannot_be_refilled() {
        let mut slot = BufferSlot::new(SlotId::new(2), 1);
        slot.begin_fill().expect("认领");
        slot.push(1);
        slot.publish(1).expect("发布");
        slot.transition(SlotState::Busy).expect("Complete → Busy 应合法");
        let err = slot.begin_fill().expect_err("Busy 槽位不得被写口认领");
        assert_eq!(
            err,
            FrameBankError::InvalidSlotTransition {
                slot: SlotId::new(2),
                from: SlotState::Busy,
                to: SlotState::Filling,
            }
        );
    }

    #[test]
    fn filling_cannot_become_busy() {
        assert!(!SlotState::Filling.can_transition_to(SlotState::Busy));
        assert!(!SlotState::Busy.can_transition_to(SlotState::Complete));
        assert!(SlotState::Busy.can_transition_to(SlotState::Free));
    }

    #[test]
    fn drop_state_clears_bookkeeping_but_not_storage() {
        let mut slot = BufferSlot::new(SlotId::new(1), 2);
        slot.begin_fill().expect("认领");
        slot.push(5);
        slot.drop_state();
        assert_eq!(slot.state(), SlotState::Free);
        assert_eq!(slot.fill_count(), 0);
        assert_eq!(slot.read(0), Some(5), "存储清零由复位序列逐地址完成");
        slot.clear_address(0);
        assert_eq!(slot.read(0), Some(0));
        assert_eq!(slot.read(2), None);
    }
}
