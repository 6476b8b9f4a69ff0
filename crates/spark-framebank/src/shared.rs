use alloc::sync::Arc;

use spin::Mutex;

use crate::{
    bank::{FrameBank, FrameBankStats},
    config::FrameBankConfig,
    error::FrameBankError,
};

/// 跨线程共享的 [`FrameBank`] 句柄。
///
/// # 教案式说明
/// - **意图 (Why)**：生产者线程与消费者线程驱动同一个控制器，而控制器本身是单时钟域；
/// - **契约 (What)**：每次 [`with`](SharedFrameBank::with) 恰好持锁执行一个闭包，闭包内的调用序列
///   视为同一时钟内的信号事件；闭包之间的先后即时钟顺序；
/// - **风险 (Trade-offs)**：使用 `spin::Mutex`，闭包应短小，不得在持锁期间阻塞或再次加锁。
#[derive(Clone, Debug)]
pub struct SharedFrameBank {
    inner: Arc<Mutex<FrameBank>>,
}

impl SharedFrameBank {
    pub fn new(bank: FrameBank) -> Self {
        Self {
            inner: Arc::new(Mutex::new(bank)),
        }
    }

    pub fn from_config(config: FrameBankConfig) -> Result<Self, FrameBankError> {
        FrameBank::new(config).map(Self::new)
    }

    /// 持锁执行一次操作。
    pub fn with<R>(&self, op: impl FnOnce(&mut FrameBank) -> R) -> R {
        let mut bank = self.inner.lock();
        op(&mut bank)
    }

    pub fn stats(&self) -> FrameBankStats {
        self.inner.lock().stats()
    }
}

impl From<FrameBank> for SharedFrameBank {
    fn from(bank: FrameBank) -> Self {
        Self::new(bank)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::{config::PoolConfig, router::FrameType};

    #[test]
    fn producer_and_consumer_threads_share_one_bank() {
        let shared = SharedFrameBank::from_config(
            FrameBankConfig::single(PoolConfig::new(3, 2, 2)).with_fetch_latency(0),
        )
        .expect("配置合法");

        let producer = {
            let shared = shared.clone();
            thread::spawn(move || {
                let mut sent = 0u32;
                let mut attempts = 0u32;
                while sent < 12 && attempts < 1_000_000 {
                    attempts += 1;
                    let byte = (sent % 4) as u8;
                    if shared.with(|bank| bank.submit(byte)).expect("提交").is_accepted() {
                        sent += 1;
                    } else {
                        thread::yield_now();
                    }
                }
                sent
            })
        };

        let consumer = {
            let shared = shared.clone();
            thread::spawn(move || {
                let mut delivered = Vec::new();
                let mut attempts = 0u32;
                while delivered.len() < 4 && attempts < 1_000_000 {
                    attempts += 1;
                    let index = delivered.len();
                    match shared.with(|bank| bank.read(FrameType::A, index / 2, index % 2)) {
                        core::task::Poll::Ready(result) => delivered.push(result.expect("读取")),
                        core::task::Poll::Pending => thread::yield_now(),
                    }
                }
                delivered
            })
        };

        assert_eq!(producer.join().expect("生产者线程"), 12);
        assert_eq!(consumer.join().expect("消费者线程"), vec![0, 1, 2, 3]);
        let stats = shared.stats();
        assert_eq!(stats.transfers_completed[0], 3);
        assert_eq!(stats.sessions_closed, 1);
    }
}
