//! `spark-framebank`：串行采集流的多缓冲分配、完成跟踪与双读口仲裁控制器。
//!
//! # 模块定位（Why）
//! - 一个字节生产者持续写入固定数量的等容量槽位，两个读口以不同节奏读取：
//!   随机读口按 `(row, col)` 逐元素读取整帧，周期读口在每个帧边界锁存一个槽位做无撕裂扫描；
//! - 控制器保证读口永远看不到写到一半的槽位，写口永远不会复用读口仍在消费的槽位。
//!
//! # 设计概要（How）
//! - [`slot`] 与 [`pool`] 以“同构数组 + 下标”管理槽位，状态是显式的 [`SlotState`] 枚举；
//! - [`writer`]、[`reader`]、[`router`]、[`reset`] 各自只持有自身的寄存器状态，
//!   由 [`bank::FrameBank`] 在同一时钟域内装配并驱动；
//! - 背压以 [`ReadyState`] 表达，尚无完成帧以 `Poll::Pending` 表达，只有调用方契约被破坏才返回
//!   [`FrameBankError`]。
//!
//! # 快速上手
//! ```
//! use core::task::Poll;
//! use spark_framebank::{FrameBank, FrameBankConfig, FrameType, PoolConfig};
//!
//! let mut bank = FrameBank::new(FrameBankConfig::single(PoolConfig::new(3, 3, 3)))?;
//! for byte in 0..9 {
//!     assert!(bank.submit(byte)?.is_accepted());
//! }
//! assert_eq!(bank.read(FrameType::A, 1, 2), Poll::Ready(Ok(5)));
//! # Ok::<(), spark_framebank::FrameBankError>(())
//! ```

extern crate alloc;

pub mod bank;
pub mod coe;
pub mod config;
pub mod error;
pub mod pool;
pub mod reader;
pub mod reset;
pub mod router;
pub mod shared;
pub mod slot;
pub mod status;
pub mod writer;

pub use bank::{FrameBank, FrameBankStats};
pub use coe::{CoeImage, CoeRadix};
pub use config::{FrameBankConfig, PoolConfig, ReaderConfig};
pub use error::FrameBankError;
pub use pool::{Geometry, Pool, PoolSnapshot, SlotSnapshot};
pub use reader::{FetchStage, PeriodicReader, RandomAccessReader, ReadSession, ReaderStats, SessionAck};
pub use reset::{ResetPhase, ResetSequencer};
pub use router::{FrameType, FrameTypeRouter};
pub use shared::SharedFrameBank;
pub use slot::{BufferSlot, SlotId, SlotState};
pub use status::{BusyReason, Completion, ReadyState, WriteOutcome};
pub use writer::{WriteAllocator, WriterStats};
