//! # 槽位池（Pool）
//!
//! ## 核心意图（Why）
//! - 以同构数组 + 下标的方式管理 N 个等容量槽位，写口与读口对数组做泛型操作；
//! - 持有每池一份的“最近完成”选择指针，以及周期读口登记的显示保留槽位。
//!
//! ## 行为契约（What）
//! - 同一时刻至多一个槽位处于 `Filling`；
//! - 选择指针只会指向保存整代数据的槽位；
//! - 写口可认领的槽位：非 `Busy`、非选择指针目标、非周期读口保留，按下标从小到大优先。

use crate::{
    error::FrameBankError,
    router::FrameType,
    slot::{BufferSlot, SlotId, SlotState},
};

/// 二维图像布局，决定 `(row, col)` 到线性地址的映射。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Geometry {
    pub rows: usize,
    pub cols: usize,
}

impl Geometry {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// 槽位容量 `C = rows * cols`。
    pub const fn capacity(&self) -> usize {
        self.rows * self.cols
    }

    /// 行优先线性化；越界返回 `None`，不做回绕。
    pub fn linear(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }
}

/// 同容量、同负载类型的一组槽位。
#[derive(Clone, Debug)]
pub struct Pool {
    frame_type: FrameType,
    geometry: Geometry,
    slots: Vec<BufferSlot>,
    selection: Option<SlotId>,
    display_hold: Option<SlotId>,
    next_generation: u64,
}

impl Pool {
    /// 创建 `slots` 个零初始化槽位。
    pub(crate) fn new(frame_type: FrameType, slots: usize, geometry: Geometry) -> Self {
        let capacity = geometry.capacity();
        Self {
            frame_type,
            geometry,
            slots: (0..slots)
                .map(|index| BufferSlot::new(SlotId::new(index), capacity))
                .collect(),
            selection: None,
            display_hold: None,
            next_generation: 1,
        }
    }

    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn capacity(&self) -> usize {
        self.geometry.capacity()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[BufferSlot] {
        &self.slots
    }

    /// 按编号获取槽位。
    pub fn slot(&self, id: SlotId) -> Result<&BufferSlot, FrameBankError> {
        self.slots
            .get(id.index())
            .ok_or(FrameBankError::SlotOutOfRange {
                pool: self.frame_type,
                slot: id,
                slots: self.slots.len(),
            })
    }

    pub(crate) fn slot_mut(&mut self, id: SlotId) -> Result<&mut BufferSlot, FrameBankError> {
        let (pool, slots) = (self.frame_type, self.slots.len());
        self.slots
            .get_mut(id.index())
            .ok_or(FrameBankError::SlotOutOfRange {
                pool,
                slot: id,
                slots,
            })
    }

    /// 最近完成的槽位（选择指针）。
    pub fn selection(&self) -> Option<SlotId> {
        self.selection
    }

    /// 周期读口当前保留、写口不得认领的槽位。
    pub fn display_hold(&self) -> Option<SlotId> {
        self.display_hold
    }

    pub(crate) fn set_display_hold(&mut self, slot: Option<SlotId>) {
        self.display_hold = slot;
    }

    /// 将 `(row, col)` 转为线性地址，越界报错。
    pub fn linear_address(&self, row: usize, col: usize) -> Result<usize, FrameBankError> {
        self.geometry
            .linear(row, col)
            .ok_or(FrameBankError::AddressOutOfRange {
                pool: self.frame_type,
                row,
                col,
                rows: self.geometry.rows,
                cols: self.geometry.cols,
            })
    }

    /// 写口能否认领该槽位。
    pub fn is_writable(&self, id: SlotId) -> bool {
        let Some(slot) = self.slots.get(id.index()) else {
            return false;
        };
        slot.state() != SlotState::Busy
            && Some(id) != self.selection
            && Some(id) != self.display_hold
    }

    /// 按下标优先级挑选一个可写槽位，可额外排除一个编号。
    pub fn select_writable(&self, exclude: Option<SlotId>) -> Option<SlotId> {
        self.slots
            .iter()
            .map(BufferSlot::id)
            .filter(|id| Some(*id) != exclude)
            .find(|id| self.is_writable(*id))
    }

    /// 处于 `Busy` 的槽位数。
    pub fn busy_count(&self) -> usize {
        self.count_in(SlotState::Busy)
    }

    /// 处于指定状态的槽位数。
    pub fn count_in(&self, state: SlotState) -> usize {
        self.slots.iter().filter(|slot| slot.state() == state).count()
    }

    /// 写满后发布槽位并前移选择指针，返回盖上的代号。
    pub(crate) fn complete(&mut self, id: SlotId) -> Result<u64, FrameBankError> {
        let generation = self.next_generation;
        self.slot_mut(id)?.publish(generation)?;
        self.next_generation += 1;
        self.selection = Some(id);
        Ok(generation)
    }

    /// 复位：丢弃选择指针、显示保留与全部槽位状态。
    pub(crate) fn drop_state(&mut self) {
        self.selection = None;
        self.display_hold = None;
        self.next_generation = 1;
        for slot in &mut self.slots {
            slot.drop_state();
        }
    }

    /// 当前池的只读快照。
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            frame_type: self.frame_type,
            geometry: self.geometry,
            selection: self.selection,
            display_hold: self.display_hold,
            slots: self
                .slots
                .iter()
                .map(|slot| SlotSnapshot {
                    id: slot.id(),
                    state: slot.state(),
                    fill_count: slot.fill_count(),
                    generation: slot.generation(),
                })
                .collect(),
        }
    }
}

/// 按帧类型在池数组中查找。
pub(crate) fn lookup(pools: &[Pool], frame_type: FrameType) -> Result<&Pool, FrameBankError> {
    pools
        .get(frame_type.index())
        .ok_or(FrameBankError::PoolNotConfigured { pool: frame_type })
}

/// 按帧类型在池数组中查找（可变）。
pub(crate) fn lookup_mut(
    pools: &mut [Pool],
    frame_type: FrameType,
) -> Result<&mut Pool, FrameBankError> {
    pools
        .get_mut(frame_type.index())
        .ok_or(FrameBankError::PoolNotConfigured { pool: frame_type })
}

/// 单个槽位的状态快照。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SlotSnapshot {
    pub id: SlotId,
    pub state: SlotState,
    pub fill_count: usize,
    pub generation: u64,
}

/// 池状态快照，用于统计输出与性质测试。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolSnapshot {
    pub frame_type: FrameType,
    pub geometry: Geometry,
    pub selection: Option<SlotId>,
    pub display_hold: Option<SlotId>,
    pub slots: Vec<SlotSnapshot>,
}
