//! # 随机访问读口（RandomAccessReader）
//!
//! ## 核心意图（Why）
//! - 为下游计算流水线提供按 `(row, col)` 取单个元素的能力；
//! - 一次会话绑定一个槽位并把它标记为 `Busy`，读满 `C` 次后才释放，保证整帧读取的一致性。
//!
//! ## 握手契约（What）
//! - **请求/应答**：[`request`](RandomAccessReader::request) 在没有会话时绑定选择指针指向的满槽；
//!   尚无完成帧时返回 `Pending`（等待第一帧）；已有会话时直接返回该会话的应答；
//! - **取数触发/数据就绪**：[`fetch`](RandomAccessReader::fetch) 提交地址，经过 `fetch_latency`
//!   个时钟后 [`poll_data`](RandomAccessReader::poll_data) 才交付数据；
//! - 会话期间即使选择指针前移，绑定槽位也不变。

use core::task::Poll;

use crate::{
    error::FrameBankError,
    pool::Pool,
    router::FrameType,
    slot::{SlotId, SlotState},
};

use super::into_poll;

/// 一次读会话绑定的槽位与进度。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReadSession {
    pub slot: SlotId,
    pub generation: u64,
    pub addresses_seen: usize,
}

/// 会话请求的应答。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SessionAck {
    pub pool: FrameType,
    pub slot: SlotId,
    pub generation: u64,
    /// 关闭会话前还需交付的读取次数。
    pub remaining: usize,
}

/// 取数流水线的阶段。
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FetchStage {
    /// 没有待处理的取数。
    #[default]
    Idle,
    /// 地址已提交，还需 `remaining` 个时钟数据才有效。
    Settling { address: usize, remaining: u8 },
    /// 数据有效，等待交付。
    Ready { address: usize, byte: u8 },
}

/// 读口累计计数。
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReaderStats {
    pub sessions_opened: u64,
    pub sessions_closed: u64,
    pub reads_delivered: u64,
}

/// 按二维坐标读取最近完成帧的读口。
#[derive(Clone, Debug)]
pub struct RandomAccessReader {
    pool: FrameType,
    latency: u8,
    session: Option<ReadSession>,
    fetch: FetchStage,
    stats: ReaderStats,
}

impl RandomAccessReader {
    pub fn new(pool: FrameType, latency: u8) -> Self {
        Self {
            pool,
            latency,
            session: None,
            fetch: FetchStage::Idle,
            stats: ReaderStats::default(),
        }
    }

    pub fn session(&self) -> Option<&ReadSession> {
        self.session.as_ref()
    }

    pub fn fetch_stage(&self) -> FetchStage {
        self.fetch
    }

    pub fn latency(&self) -> u8 {
        self.latency
    }

    pub fn stats(&self) -> &ReaderStats {
        &self.stats
    }

    /// 请求/应答握手：打开（或确认已打开的）会话。
    pub fn request(&mut self, pool: &mut Pool) -> Poll<Result<SessionAck, FrameBankError>> {
        into_poll(self.try_open(pool))
    }

    /// 取数触发：提交一个坐标，数据在 `latency` 个时钟后就绪。
    pub fn fetch(&mut self, pool: &Pool, row: usize, col: usize) -> Result<(), FrameBankError> {
        let session = self
            .session
            .ok_or(FrameBankError::NoSession { pool: self.pool })?;
        if self.fetch != FetchStage::Idle {
            return Err(FrameBankError::FetchInFlight { pool: self.pool });
        }
        let address = pool.linear_address(row, col)?;
        self.fetch = if self.latency == 0 {
            FetchStage::Ready {
                address,
                byte: read_at(pool, session.slot, address)?,
            }
        } else {
            FetchStage::Settling {
                address,
                remaining: self.latency,
            }
        };
        Ok(())
    }

    /// 推进一个时钟：地址稳定计数减一，归零时从绑定槽位取出数据。
    pub fn tick(&mut self, pool: &Pool) -> Result<(), FrameBankError> {
        if let FetchStage::Settling { address, remaining } = self.fetch {
            if remaining > 1 {
                self.fetch = FetchStage::Settling {
                    address,
                    remaining: remaining - 1,
                };
            } else if let Some(session) = self.session {
                self.fetch = FetchStage::Ready {
                    address,
                    byte: read_at(pool, session.slot, address)?,
                };
            }
        }
        Ok(())
    }

    /// 数据就绪握手：交付已就绪的数据，并在读满 `C` 次后关闭会话。
    pub fn poll_data(&mut self, pool: &mut Pool) -> Poll<Result<u8, FrameBankError>> {
        match self.fetch {
            FetchStage::Idle => Poll::Ready(Err(FrameBankError::NoFetchPending { pool: self.pool })),
            FetchStage::Settling { .. } => Poll::Pending,
            FetchStage::Ready { byte, .. } => {
                self.fetch = FetchStage::Idle;
                Poll::Ready(self.deliver(pool).map(|()| byte))
            }
        }
    }

    /// 同步读取：把两段握手折叠为一次调用，不计取数延迟。
    pub fn read(
        &mut self,
        pool: &mut Pool,
        row: usize,
        col: usize,
    ) -> Poll<Result<u8, FrameBankError>> {
        into_poll(self.read_now(pool, row, col))
    }

    fn read_now(
        &mut self,
        pool: &mut Pool,
        row: usize,
        col: usize,
    ) -> Result<Option<u8>, FrameBankError> {
        if self.fetch != FetchStage::Idle {
            return Err(FrameBankError::FetchInFlight { pool: self.pool });
        }
        let address = pool.linear_address(row, col)?;
        let Some(ack) = self.try_open(pool)? else {
            return Ok(None);
        };
        let byte = read_at(pool, ack.slot, address)?;
        self.deliver(pool)?;
        Ok(Some(byte))
    }

    fn try_open(&mut self, pool: &mut Pool) -> Result<Option<SessionAck>, FrameBankError> {
        if let Some(session) = self.session {
            return Ok(Some(self.ack(pool, &session)));
        }
        let Some(id) = pool.selection() else {
            return Ok(None);
        };
        let slot = pool.slot_mut(id)?;
        if !slot.holds_full_generation() || slot.state() == SlotState::Busy {
            return Ok(None);
        }
        slot.transition(SlotState::Busy)?;
        let session = ReadSession {
            slot: id,
            generation: slot.generation(),
            addresses_seen: 0,
        };
        self.session = Some(session);
        self.stats.sessions_opened += 1;
        tracing::debug!(
            pool = %self.pool,
            slot = %id,
            generation = session.generation,
            "read session opened"
        );
        Ok(Some(self.ack(pool, &session)))
    }

    fn ack(&self, pool: &Pool, session: &ReadSession) -> SessionAck {
        SessionAck {
            pool: self.pool,
            slot: session.slot,
            generation: session.generation,
            remaining: pool.capacity() - session.addresses_seen,
        }
    }

    /// 记一次交付；读满容量后释放槽位。
    fn deliver(&mut self, pool: &mut Pool) -> Result<(), FrameBankError> {
        let Some(mut session) = self.session else {
            return Err(FrameBankError::NoSession { pool: self.pool });
        };
        session.addresses_seen += 1;
        self.stats.reads_delivered += 1;
        tracing::trace!(
            pool = %self.pool,
            slot = %session.slot,
            seen = session.addresses_seen,
            "read delivered"
        );
        if session.addresses_seen < pool.capacity() {
            self.session = Some(session);
            return Ok(());
        }
        pool.slot_mut(session.slot)?.transition(SlotState::Free)?;
        self.session = None;
        self.stats.sessions_closed += 1;
        tracing::debug!(
            pool = %self.pool,
            slot = %session.slot,
            generation = session.generation,
            "read session closed"
        );
        Ok(())
    }

    /// 复位：丢弃会话与在途取数，不触碰槽位（槽位状态由池统一清除）。
    pub(crate) fn reset(&mut self) {
        self.session = None;
        self.fetch = FetchStage::Idle;
    }
}

fn read_at(pool: &Pool, slot: SlotId, address: usize) -> Result<u8, FrameBankError> {
    pool.slot(slot)?
        .read(address)
        .ok_or(FrameBankError::ScanOutOfRange {
            pool: pool.frame_type(),
            address,
            capacity: pool.capacity(),
        })
}
