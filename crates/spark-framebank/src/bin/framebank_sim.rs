//! 帧缓冲仿真器：按配置构造控制器，用 COE 图像（或递增序列）驱动写口，并排空每一帧的随机读会话。
//!
//! # 使用方法
//! ```bash
//! RUST_LOG=spark_framebank=debug cargo run --bin framebank_sim -- configs/mnist.toml \
//!     --input digit.coe --frames 6
//! ```
//! - `config.toml`：控制器配置，格式见 `spark_framebank::config`；
//! - `--input`：可选，COE 图像，字宽不得超过 8 位；缺省时使用 `0, 1, 2, …` 递增序列；
//! - `--frames`：可选，完成多少次传输后停止，缺省 4。
//!
//! 每经过池 A 容量个时钟向所有池发出一次帧边界脉冲，模拟周期读口的刷新节奏。

use std::env;
use std::fs;
use std::path::PathBuf;
use std::task::Poll;

use tracing_subscriber::EnvFilter;

use spark_framebank::{CoeImage, FrameBank, FrameBankError, FrameType, WriteOutcome};

const DEFAULT_FRAMES: u64 = 4;
/// 防止配置异常时无限空转。
const TICK_LIMIT: u64 = 10_000_000;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(error) = run() {
        eprintln!("帧缓冲仿真失败: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1);
    let config_path = args
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| usage("缺少配置文件路径"))?;

    let mut input_path = None;
    let mut frames = DEFAULT_FRAMES;
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--input" => {
                let value = args
                    .next()
                    .ok_or_else(|| usage("--input 之后必须提供文件路径"))?;
                input_path = Some(PathBuf::from(value));
            }
            "--frames" => {
                let value = args
                    .next()
                    .ok_or_else(|| usage("--frames 之后必须提供帧数"))?;
                frames = value
                    .parse()
                    .map_err(|error| usage(&format!("帧数 `{value}` 无效: {error}")))?;
            }
            unknown => return Err(usage(&format!("未知参数: {unknown}"))),
        }
    }

    let text = fs::read_to_string(&config_path)
        .map_err(|error| format!("读取配置 {} 失败: {error}", config_path.display()))?;
    let mut bank = FrameBank::from_toml_str(&text).map_err(|error| error.to_string())?;

    let source = match input_path {
        Some(path) => load_image(&path)?,
        None => ramp(bank.pool(FrameType::A).map_err(|e| e.to_string())?.capacity()),
    };
    if source.is_empty() {
        return Err("输入图像为空".to_owned());
    }

    bank.assert_reset();
    let cleared = bank.settle_reset();
    tracing::info!(ticks = cleared, "power-on reset complete");

    simulate(&mut bank, &source, frames).map_err(|error| error.to_string())?;
    report(&bank);
    Ok(())
}

fn simulate(bank: &mut FrameBank, source: &[u8], frames: u64) -> Result<(), FrameBankError> {
    let period = bank.pool(FrameType::A)?.capacity() as u64;
    let pools: Vec<FrameType> = bank.pools().iter().map(|pool| pool.frame_type()).collect();
    let mut bytes = source.iter().copied().cycle();
    let mut held = None;
    let mut completed = 0;
    let mut since_boundary = 0;

    while completed < frames && bank.ticks() < TICK_LIMIT {
        let Some(byte) = held.take().or_else(|| bytes.next()) else {
            break;
        };
        match bank.submit(byte)? {
            WriteOutcome::Rejected(reason) => {
                held = Some(byte);
                tracing::trace!(?reason, "producer holding byte");
            }
            WriteOutcome::Completed(done) => {
                completed += 1;
                let sum = drain_session(bank, done.pool)?;
                tracing::info!(
                    pool = %done.pool,
                    slot = %done.slot,
                    generation = done.generation,
                    checksum = sum,
                    "frame drained"
                );
            }
            WriteOutcome::Accepted { .. } => {}
        }

        bank.tick()?;
        since_boundary += 1;
        if since_boundary >= period {
            since_boundary = 0;
            for frame_type in &pools {
                bank.frame_boundary(*frame_type)?;
            }
        }
    }
    Ok(())
}

/// 走完一个完整会话，返回读到的字节和。
fn drain_session(bank: &mut FrameBank, frame_type: FrameType) -> Result<u64, FrameBankError> {
    loop {
        match bank.request_session(frame_type) {
            Poll::Ready(ack) => {
                ack?;
                break;
            }
            Poll::Pending => bank.tick()?,
        }
    }
    let geometry = bank.pool(frame_type)?.geometry();
    let mut sum = 0u64;
    for row in 0..geometry.rows {
        for col in 0..geometry.cols {
            bank.fetch(frame_type, row, col)?;
            let byte = loop {
                match bank.poll_data(frame_type) {
                    Poll::Ready(result) => break result?,
                    Poll::Pending => bank.tick()?,
                }
            };
            sum += u64::from(byte);
        }
    }
    Ok(sum)
}

fn load_image(path: &PathBuf) -> Result<Vec<u8>, String> {
    let text = fs::read_to_string(path)
        .map_err(|error| format!("读取图像 {} 失败: {error}", path.display()))?;
    let image = CoeImage::parse(&text).map_err(|error| error.to_string())?;
    image.to_bytes().map_err(|error| error.to_string())
}

fn ramp(len: usize) -> Vec<u8> {
    (0..len).map(|index| (index % 256) as u8).collect()
}

fn report(bank: &FrameBank) {
    let stats = bank.stats();
    for pool in &stats.pools {
        tracing::info!(
            pool = %pool.frame_type,
            selection = ?pool.selection.map(|slot| slot.index()),
            latch = ?pool.display_hold.map(|slot| slot.index()),
            generations = ?pool.slots.iter().map(|slot| slot.generation).collect::<Vec<_>>(),
            "pool state"
        );
    }
    tracing::info!(
        ticks = stats.ticks,
        bytes_accepted = stats.bytes_accepted,
        transfers = stats.total_transfers(),
        rejected = stats.rejected,
        abandoned = stats.abandoned,
        sessions_opened = stats.sessions_opened,
        sessions_closed = stats.sessions_closed,
        reads_delivered = stats.reads_delivered,
        frame_boundaries = stats.frame_boundaries,
        reset_cycles = stats.reset_cycles,
        "simulation finished"
    );
}

fn usage(detail: &str) -> String {
    format!("{detail}\n用法: framebank_sim <config.toml> [--input image.coe] [--frames N]")
}
