//! 读口组件：随机访问读口与周期扫描读口。
//!
//! 两个读口都只读取已完成的数据，彼此之间不互斥；与写口之间只通过槽位状态与选择指针协作，
//! 没有直接调用路径。

pub mod periodic;
pub mod random_access;

pub use periodic::PeriodicReader;
pub use random_access::{FetchStage, RandomAccessReader, ReadSession, ReaderStats, SessionAck};

use core::task::Poll;

/// 把“可能尚未就绪”的内部结果折叠为握手语义：`Ok(None)` 即 `Pending`。
pub(crate) fn into_poll<T, E>(result: Result<Option<T>, E>) -> Poll<Result<T, E>> {
    match result {
        Ok(Some(value)) => Poll::Ready(Ok(value)),
        Ok(None) => Poll::Pending,
        Err(err) => Poll::Ready(Err(err)),
    }
}
