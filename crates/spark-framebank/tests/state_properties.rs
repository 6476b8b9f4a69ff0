//! 帧缓冲状态性质验证
//!
//! # 教案级注释概览
//!
//! - **核心目标 (Why)**：对任意合法或非法的调用序列，验证控制器始终满足六条性质：
//!   1. 互斥：同池至多一个 `Filling`，写口正在写的槽位既不是 `Busy`，也不是已生效的显示锁存；
//!   2. 完成单调：选择指针只指向保存整代数据的槽位；
//!   3. 会话隔离：会话期间绑定槽位与代号不变；
//!   4. 无撕裂：一个帧边界周期内扫描结果与周期开始时锁存槽位的内容逐字节相同；
//!   5. 轮转活性：读口会话结束并经过一次帧边界后，写口必然恢复就绪并能完成下一次传输；
//!   6. 复位完整：复位序列刚进入 `Done` 时所有地址读出为零。
//! - **设计手法 (How)**：`proptest` 生成事件序列直接驱动 `FrameBank`，`Observer` 记录会话与周期快照，
//!   每个事件之后对全部性质求值。
//!
//! # 合同与边界 (What)
//!
//! - 坐标随机生成，可能越界；越界等调用方错误是合法结果，但任何其它错误都视为违反性质；
//! - 事件只作用于池 A，双池交替由 `bank_contract` 覆盖。

use core::task::Poll;

use proptest::prelude::*;
use spark_framebank::{
    FetchStage, FrameBank, FrameBankConfig, FrameBankError, FrameType, PoolConfig, ResetPhase,
    SlotId, SlotState, WriteOutcome,
};

#[derive(Clone, Debug)]
enum Event {
    Submit(u8),
    Tick,
    Request,
    Fetch(usize, usize),
    PollData,
    Read(usize, usize),
    Boundary,
    Reset,
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![
        8 => any::<u8>().prop_map(Event::Submit),
        3 => Just(Event::Tick),
        2 => Just(Event::Request),
        2 => (0usize..4, 0usize..4).prop_map(|(row, col)| Event::Fetch(row, col)),
        2 => Just(Event::PollData),
        4 => (0usize..4, 0usize..4).prop_map(|(row, col)| Event::Read(row, col)),
        2 => Just(Event::Boundary),
        1 => Just(Event::Reset),
    ]
}

fn config() -> impl Strategy<Value = FrameBankConfig> {
    (2usize..=4, 1usize..=3, 1usize..=3, 0u8..=3).prop_map(|(slots, rows, cols, latency)| {
        FrameBankConfig::single(PoolConfig::new(slots, rows, cols)).with_fetch_latency(latency)
    })
}

#[derive(Debug, Default)]
struct Observer {
    session: Option<(SlotId, u64)>,
    period: Option<(SlotId, Vec<u8>)>,
    phase: ResetPhase,
}

fn allow_caller_error(result: Result<(), FrameBankError>) -> Result<(), TestCaseError> {
    match result {
        Err(err) if !err.is_caller_contract_violation() => {
            Err(TestCaseError::fail(format!("意外错误: {err}")))
        }
        _ => Ok(()),
    }
}

fn poll_result<T>(poll: Poll<Result<T, FrameBankError>>) -> Result<(), FrameBankError> {
    match poll {
        Poll::Ready(Err(err)) => Err(err),
        _ => Ok(()),
    }
}

fn apply(bank: &mut FrameBank, observer: &mut Observer, event: &Event) -> Result<(), TestCaseError> {
    let a = FrameType::A;
    match event {
        Event::Submit(byte) => allow_caller_error(bank.submit(*byte).map(|_| ()))?,
        Event::Tick => allow_caller_error(bank.tick())?,
        Event::Request => allow_caller_error(poll_result(bank.request_session(a)))?,
        Event::Fetch(row, col) => allow_caller_error(bank.fetch(a, *row, *col))?,
        Event::PollData => allow_caller_error(poll_result(bank.poll_data(a)))?,
        Event::Read(row, col) => allow_caller_error(poll_result(bank.read(a, *row, *col)))?,
        Event::Boundary => {
            let latched = bank.frame_boundary(a).map_err(|err| TestCaseError::fail(err.to_string()))?;
            let reader = bank.periodic_reader(a).map_err(|err| TestCaseError::fail(err.to_string()))?;
            observer.period = if reader.is_engaged() {
                let pool = bank.pool(a).map_err(|err| TestCaseError::fail(err.to_string()))?;
                Some((latched, pool.slots()[latched.index()].contents().to_vec()))
            } else {
                None
            };
        }
        Event::Reset => {
            bank.assert_reset();
            observer.period = None;
        }
    }
    Ok(())
}

fn check(bank: &FrameBank, observer: &mut Observer) -> Result<(), TestCaseError> {
    let a = FrameType::A;
    let pool = bank.pool(a).map_err(|err| TestCaseError::fail(err.to_string()))?;
    let periodic = bank.periodic_reader(a).map_err(|err| TestCaseError::fail(err.to_string()))?;
    let random = bank.random_reader(a).map_err(|err| TestCaseError::fail(err.to_string()))?;

    // P1
    prop_assert!(pool.count_in(SlotState::Filling) <= 1);
    if let Some((_, active)) = bank.writer().active_slot() {
        let slot = pool.slot(active).map_err(|err| TestCaseError::fail(err.to_string()))?;
        prop_assert_eq!(slot.state(), SlotState::Filling);
        if periodic.is_engaged() {
            prop_assert_ne!(active, periodic.latched_slot());
        }
    }

    // P2
    if let Some(selected) = pool.selection() {
        let slot = pool.slot(selected).map_err(|err| TestCaseError::fail(err.to_string()))?;
        prop_assert!(slot.holds_full_generation());
        prop_assert_eq!(slot.fill_count(), pool.capacity());
    }

    // P3
    match (observer.session, random.session()) {
        (None, Some(session)) => observer.session = Some((session.slot, session.generation)),
        (Some((slot, generation)), Some(session)) => {
            prop_assert_eq!(session.slot, slot);
            prop_assert_eq!(session.generation, generation);
            let bound = pool.slot(slot).map_err(|err| TestCaseError::fail(err.to_string()))?;
            prop_assert_eq!(bound.state(), SlotState::Busy);
            prop_assert_eq!(bound.generation(), generation);
        }
        (_, None) => observer.session = None,
    }

    // P4
    if let Some((latched, snapshot)) = &observer.period {
        prop_assert_eq!(periodic.latched_slot(), *latched);
        for (address, expected) in snapshot.iter().enumerate() {
            prop_assert_eq!(bank.scan(a, address), Ok(*expected));
        }
    }

    // P6：只在刚进入 Done 的那一拍检查，之后写口已恢复。
    let phase = bank.reset_phase();
    let entered_done = phase == ResetPhase::Done && observer.phase != ResetPhase::Done;
    observer.phase = phase;
    if entered_done {
        for slot in pool.slots() {
            prop_assert!(slot.contents().iter().all(|byte| *byte == 0));
        }
    }
    Ok(())
}

/// 让读口把当前会话读完。
fn drain_session(bank: &mut FrameBank) -> Result<(), TestCaseError> {
    let a = FrameType::A;
    for _ in 0..10_000 {
        let reader = bank.random_reader(a).map_err(|err| TestCaseError::fail(err.to_string()))?;
        if reader.session().is_none() {
            return Ok(());
        }
        if reader.fetch_stage() == FetchStage::Idle {
            allow_caller_error(poll_result(bank.read(a, 0, 0)))?;
        } else if bank.poll_data(a).is_pending() {
            allow_caller_error(bank.tick())?;
        }
    }
    Err(TestCaseError::fail("会话未能在预算内读完"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_invariants_hold_for_every_event(
        config in config(),
        events in prop::collection::vec(event(), 1..200),
    ) {
        let mut bank = FrameBank::new(config).expect("配置合法");
        let mut observer = Observer::default();
        for event in &events {
            apply(&mut bank, &mut observer, event)?;
            check(&bank, &mut observer)?;
        }
    }

    #[test]
    fn prop_writer_recovers_once_readers_finish(
        config in config(),
        events in prop::collection::vec(event(), 1..200),
    ) {
        let capacity = config.primary.geometry().capacity();
        let mut bank = FrameBank::new(config).expect("配置合法");
        let mut observer = Observer::default();
        for event in &events {
            apply(&mut bank, &mut observer, event)?;
        }

        bank.settle_reset();
        drain_session(&mut bank)?;
        bank.frame_boundary(FrameType::A).expect("脉冲");
        prop_assert!(bank.poll_ready().expect("就绪检查").is_ready());

        let mut completed = false;
        for byte in 0..capacity {
            let outcome = bank.submit(byte as u8).expect("提交");
            prop_assert!(outcome.is_accepted(), "第 {} 个字节被拒收: {:?}", byte, outcome);
            if matches!(outcome, WriteOutcome::Completed(_)) {
                completed = true;
                break;
            }
        }
        prop_assert!(completed, "写口应在 {} 个字节内完成一次传输", capacity);
    }

    #[test]
    fn prop_reset_clears_every_address(
        config in config(),
        events in prop::collection::vec(event(), 1..120),
    ) {
        let expected: usize = config.pools().map(|(_, pool)| pool.slots * pool.geometry().capacity()).sum();
        let mut bank = FrameBank::new(config).expect("配置合法");
        let mut observer = Observer::default();
        for event in &events {
            apply(&mut bank, &mut observer, event)?;
        }

        bank.assert_reset();
        prop_assert_eq!(bank.settle_reset(), expected as u64);
        prop_assert_eq!(bank.reset_phase(), ResetPhase::Done);
        for pool in bank.pools() {
            prop_assert_eq!(pool.selection(), None);
            for slot in pool.slots() {
                prop_assert!(slot.contents().iter().all(|byte| *byte == 0));
            }
        }
        for address in 0..bank.pool(FrameType::A).expect("池存在").capacity() {
            prop_assert_eq!(bank.scan(FrameType::A, address), Ok(0));
        }
    }
}
