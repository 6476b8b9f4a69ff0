//! # FrameBank：单时钟域控制器
//!
//! ## 核心意图（Why）
//! - 把池、写口、两个读口、路由器与复位序列器装配成一个同步时钟域；
//! - 每个公开方法对应一次信号事件，[`FrameBank::tick`] 推进一个时钟。
//!
//! ## 行为契约（What）
//! - 写口与读口之间没有直接调用，只通过槽位状态、选择指针与显示保留协作；
//! - 完成事件在同一时钟对两个读口可见，因为两者都直接查询池的选择指针；
//! - 复位清零期间写口拒收（[`BusyReason::Resetting`]），会话请求保持 `Pending`，
//!   周期读口照常服务。
//!
//! ## 风险提示（Trade-offs）
//! - 帧类型交替不做内容校验，生产者打乱 A/B 节奏后路由会持续错位，只有 [`FrameBank::assert_reset`]
//!   能重新对齐。

use core::task::Poll;

use crate::{
    coe::{CoeImage, CoeRadix},
    config::FrameBankConfig,
    error::FrameBankError,
    pool::{self, Pool, PoolSnapshot},
    reader::{PeriodicReader, RandomAccessReader, SessionAck},
    reset::{ResetPhase, ResetSequencer},
    router::{FrameType, FrameTypeRouter},
    slot::SlotId,
    status::{BusyReason, ReadyState, WriteOutcome},
    writer::WriteAllocator,
};

/// 控制器运行统计。
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FrameBankStats {
    pub pools: Vec<PoolSnapshot>,
    pub bytes_accepted: u64,
    /// 按帧类型下标统计的完成传输数。
    pub transfers_completed: [u64; 2],
    pub rejected: u64,
    pub abandoned: u64,
    pub sessions_opened: u64,
    pub sessions_closed: u64,
    pub reads_delivered: u64,
    pub frame_boundaries: u64,
    pub reset_cycles: u64,
    pub ticks: u64,
}

impl FrameBankStats {
    /// 全部池的完成传输总数。
    pub fn total_transfers(&self) -> u64 {
        self.transfers_completed.iter().sum()
    }
}

/// 多槽位帧缓冲控制器。
#[derive(Clone, Debug)]
pub struct FrameBank {
    config: FrameBankConfig,
    pools: Vec<Pool>,
    writer: WriteAllocator,
    router: FrameTypeRouter,
    random: Vec<RandomAccessReader>,
    periodic: Vec<PeriodicReader>,
    reset: ResetSequencer,
    frame_boundaries: u64,
    ticks: u64,
}

impl FrameBank {
    /// 按配置构造控制器；存储以零初始化，复位序列器处于 `Idle`。
    pub fn new(config: FrameBankConfig) -> Result<Self, FrameBankError> {
        config.validate()?;
        let pools: Vec<Pool> = config
            .pools()
            .map(|(frame_type, shape)| Pool::new(frame_type, shape.slots, shape.geometry()))
            .collect();
        let random = pools
            .iter()
            .map(|pool| RandomAccessReader::new(pool.frame_type(), config.reader.fetch_latency))
            .collect();
        let periodic = pools
            .iter()
            .map(|pool| PeriodicReader::new(pool.frame_type()))
            .collect();
        tracing::debug!(
            pools = pools.len(),
            fetch_latency = config.reader.fetch_latency,
            "frame bank constructed"
        );
        Ok(Self {
            router: FrameTypeRouter::new(config.is_dual_pool()),
            config,
            pools,
            writer: WriteAllocator::new(),
            random,
            periodic,
            reset: ResetSequencer::new(),
            frame_boundaries: 0,
            ticks: 0,
        })
    }

    /// 从 TOML 文本构造。
    pub fn from_toml_str(text: &str) -> Result<Self, FrameBankError> {
        Self::new(FrameBankConfig::from_toml_str(text)?)
    }

    pub fn config(&self) -> &FrameBankConfig {
        &self.config
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn pool(&self, frame_type: FrameType) -> Result<&Pool, FrameBankError> {
        pool::lookup(&self.pools, frame_type)
    }

    pub fn writer(&self) -> &WriteAllocator {
        &self.writer
    }

    pub fn router(&self) -> &FrameTypeRouter {
        &self.router
    }

    pub fn random_reader(&self, frame_type: FrameType) -> Result<&RandomAccessReader, FrameBankError> {
        self.random
            .get(frame_type.index())
            .ok_or(FrameBankError::PoolNotConfigured { pool: frame_type })
    }

    pub fn periodic_reader(&self, frame_type: FrameType) -> Result<&PeriodicReader, FrameBankError> {
        self.periodic
            .get(frame_type.index())
            .ok_or(FrameBankError::PoolNotConfigured { pool: frame_type })
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    // ---- 时钟与复位 ----

    /// 推进一个时钟。
    ///
    /// 清零期间只推进复位序列器；否则推进每个随机读口的取数流水线。
    pub fn tick(&mut self) -> Result<(), FrameBankError> {
        self.ticks += 1;
        let clearing = self.reset.is_clearing();
        if self.reset.phase() != ResetPhase::Idle {
            self.reset.step(&mut self.pools);
        }
        if clearing {
            return Ok(());
        }
        for (reader, pool) in self.random.iter_mut().zip(&self.pools) {
            reader.tick(pool)?;
        }
        Ok(())
    }

    /// 复位输入：无条件丢弃全部在途状态并从池 A 槽位 0 地址 0 开始清零。
    pub fn assert_reset(&mut self) {
        self.writer.reset();
        self.router.reset();
        for pool in &mut self.pools {
            pool.drop_state();
        }
        for reader in &mut self.random {
            reader.reset();
        }
        for reader in &mut self.periodic {
            reader.reset();
        }
        self.reset.assert_reset();
        tracing::debug!(pools = self.pools.len(), "reset asserted");
    }

    pub fn reset_phase(&self) -> ResetPhase {
        self.reset.phase()
    }

    /// 连续推进时钟直到清零结束，返回消耗的时钟数。
    pub fn settle_reset(&mut self) -> u64 {
        let mut elapsed = 0;
        while self.reset.is_clearing() {
            self.ticks += 1;
            self.reset.step(&mut self.pools);
            elapsed += 1;
        }
        elapsed
    }

    // ---- 写口 ----

    /// 不改变状态地计算写口 ready 信号。
    pub fn poll_ready(&self) -> Result<ReadyState, FrameBankError> {
        if self.reset.is_clearing() {
            return Ok(ReadyState::Busy(BusyReason::Resetting));
        }
        self.writer.poll_ready(&self.pools, &self.router)
    }

    /// 生产者提交一个字节。背压以 [`WriteOutcome::Rejected`] 返回，不是错误。
    pub fn submit(&mut self, byte: u8) -> Result<WriteOutcome, FrameBankError> {
        if self.reset.is_clearing() {
            return Ok(self.writer.reject_resetting());
        }
        self.writer.accept(&mut self.pools, &mut self.router, byte)
    }

    // ---- 随机读口 ----

    /// 请求/应答握手。
    pub fn request_session(
        &mut self,
        frame_type: FrameType,
    ) -> Poll<Result<SessionAck, FrameBankError>> {
        let clearing = self.reset.is_clearing();
        match self.random_lane(frame_type) {
            Ok(_) if clearing => Poll::Pending,
            Ok((reader, pool)) => reader.request(pool),
            Err(err) => Poll::Ready(Err(err)),
        }
    }

    /// 取数触发。
    pub fn fetch(&mut self, frame_type: FrameType, row: usize, col: usize) -> Result<(), FrameBankError> {
        let (reader, pool) = self.random_lane(frame_type)?;
        reader.fetch(pool, row, col)
    }

    /// 数据就绪握手。
    pub fn poll_data(&mut self, frame_type: FrameType) -> Poll<Result<u8, FrameBankError>> {
        match self.random_lane(frame_type) {
            Ok((reader, pool)) => reader.poll_data(pool),
            Err(err) => Poll::Ready(Err(err)),
        }
    }

    /// 折叠后的同步读取：必要时打开会话，立即返回数据。
    pub fn read(
        &mut self,
        frame_type: FrameType,
        row: usize,
        col: usize,
    ) -> Poll<Result<u8, FrameBankError>> {
        let clearing = self.reset.is_clearing();
        let (reader, pool) = match self.random_lane(frame_type) {
            Ok(lane) => lane,
            Err(err) => return Poll::Ready(Err(err)),
        };
        if clearing {
            return match pool.linear_address(row, col) {
                Ok(_) => Poll::Pending,
                Err(err) => Poll::Ready(Err(err)),
            };
        }
        reader.read(pool, row, col)
    }

    fn random_lane(
        &mut self,
        frame_type: FrameType,
    ) -> Result<(&mut RandomAccessReader, &mut Pool), FrameBankError> {
        let pool = pool::lookup_mut(&mut self.pools, frame_type)?;
        let reader = self
            .random
            .get_mut(frame_type.index())
            .ok_or(FrameBankError::PoolNotConfigured { pool: frame_type })?;
        Ok((reader, pool))
    }

    // ---- 周期读口 ----

    /// 帧边界脉冲。
    pub fn frame_boundary(&mut self, frame_type: FrameType) -> Result<SlotId, FrameBankError> {
        let pool = pool::lookup_mut(&mut self.pools, frame_type)?;
        let reader = self
            .periodic
            .get_mut(frame_type.index())
            .ok_or(FrameBankError::PoolNotConfigured { pool: frame_type })?;
        self.frame_boundaries += 1;
        Ok(reader.frame_boundary(pool))
    }

    /// 扫描读取。
    pub fn scan(&self, frame_type: FrameType, address: usize) -> Result<u8, FrameBankError> {
        self.periodic_reader(frame_type)?
            .scan(self.pool(frame_type)?, address)
    }

    // ---- 观测 ----

    pub fn stats(&self) -> FrameBankStats {
        let writer = self.writer.stats();
        let mut stats = FrameBankStats {
            pools: self.pools.iter().map(Pool::snapshot).collect(),
            bytes_accepted: writer.bytes_accepted,
            transfers_completed: FrameType::ALL.map(|frame_type| self.router.routed(frame_type)),
            rejected: writer.rejected,
            abandoned: writer.abandoned,
            frame_boundaries: self.frame_boundaries,
            reset_cycles: self.reset.cycles_completed(),
            ticks: self.ticks,
            ..FrameBankStats::default()
        };
        for reader in &self.random {
            let counts = reader.stats();
            stats.sessions_opened += counts.sessions_opened;
            stats.sessions_closed += counts.sessions_closed;
            stats.reads_delivered += counts.reads_delivered;
        }
        stats
    }

    /// 把一个槽位的当前内容导出为十六进制 COE 文本。
    pub fn export_coe(&self, frame_type: FrameType, slot: SlotId) -> Result<String, FrameBankError> {
        let pool = self.pool(frame_type)?;
        let cell = pool.slot(slot)?;
        let geometry = pool.geometry();
        let header = [
            format!("pool {frame_type} {slot} generation {}", cell.generation()),
            format!("Resolution: {}x{}", geometry.cols, geometry.rows),
            format!("Total pixels: {}", geometry.capacity()),
        ];
        let header: Vec<&str> = header.iter().map(String::as_str).collect();
        Ok(CoeImage::from_bytes(CoeRadix::Hex, cell.contents()).render(&header))
    }
}
