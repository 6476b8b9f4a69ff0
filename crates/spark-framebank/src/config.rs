//! # 配置（FrameBankConfig）
//!
//! ## 契约说明（What）
//! - 以 TOML 描述池的槽位数与图像尺寸，`secondary` 存在即启用双池交替；
//! - [`FrameBankConfig::validate`] 在构造 [`FrameBank`](crate::bank::FrameBank) 前拒绝不成立的组合：
//!   槽位数少于 2 时写口在第一帧完成后必然永久背压。
//!
//! ```toml
//! [primary]
//! slots = 3
//! rows = 28
//! cols = 28
//!
//! [reader]
//! fetch_latency = 2
//! ```

use serde::{Deserialize, Serialize};

use crate::{error::FrameBankError, pool::Geometry, router::FrameType};

/// 参考系统的槽位数。
pub const DEFAULT_SLOTS: usize = 3;
/// 参考系统的图像边长（28 × 28 灰度图）。
pub const DEFAULT_SIDE: usize = 28;
/// 参考系统的取数延迟（时钟数）。
pub const DEFAULT_FETCH_LATENCY: u8 = 2;
/// 允许配置的最大取数延迟。
pub const MAX_FETCH_LATENCY: u8 = 16;

/// 单个池的形状。
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    pub slots: usize,
    pub rows: usize,
    pub cols: usize,
}

impl PoolConfig {
    pub const fn new(slots: usize, rows: usize, cols: usize) -> Self {
        Self { slots, rows, cols }
    }

    pub const fn geometry(&self) -> Geometry {
        Geometry::new(self.rows, self.cols)
    }

    fn validate(&self, frame_type: FrameType) -> Result<(), FrameBankError> {
        if self.slots < 2 {
            return Err(FrameBankError::invalid_config(format!(
                "pool {frame_type}: slots must be at least 2, got {}",
                self.slots
            )));
        }
        if self.rows == 0 || self.cols == 0 {
            return Err(FrameBankError::invalid_config(format!(
                "pool {frame_type}: image must be at least 1x1, got {}x{}",
                self.rows, self.cols
            )));
        }
        let capacity = self.rows.checked_mul(self.cols).ok_or_else(|| {
            FrameBankError::invalid_config(format!(
                "pool {frame_type}: {}x{} overflows the address space",
                self.rows, self.cols
            ))
        })?;
        if capacity.checked_mul(self.slots).is_none() {
            return Err(FrameBankError::invalid_config(format!(
                "pool {frame_type}: {} slots of {capacity} elements overflow the address space",
                self.slots
            )));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SLOTS, DEFAULT_SIDE, DEFAULT_SIDE)
    }
}

/// 随机读口参数。
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// 取数触发到数据就绪之间的时钟数；0 表示同拍返回。
    pub fetch_latency: u8,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            fetch_latency: DEFAULT_FETCH_LATENCY,
        }
    }
}

/// 帧缓冲控制器的完整配置。
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FrameBankConfig {
    /// 池 A，必填。
    pub primary: PoolConfig,
    /// 池 B；存在即启用帧类型交替。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<PoolConfig>,
    #[serde(default)]
    pub reader: ReaderConfig,
}

impl FrameBankConfig {
    /// 单池配置。
    pub fn single(primary: PoolConfig) -> Self {
        Self {
            primary,
            secondary: None,
            reader: ReaderConfig::default(),
        }
    }

    /// 双池配置。
    pub fn dual(primary: PoolConfig, secondary: PoolConfig) -> Self {
        Self {
            primary,
            secondary: Some(secondary),
            reader: ReaderConfig::default(),
        }
    }

    /// 覆盖取数延迟。
    pub fn with_fetch_latency(mut self, fetch_latency: u8) -> Self {
        self.reader.fetch_latency = fetch_latency;
        self
    }

    /// 是否启用双池。
    pub fn is_dual_pool(&self) -> bool {
        self.secondary.is_some()
    }

    /// 按帧类型列出已配置的池。
    pub fn pools(&self) -> impl Iterator<Item = (FrameType, PoolConfig)> + '_ {
        core::iter::once((FrameType::A, self.primary))
            .chain(self.secondary.map(|pool| (FrameType::B, pool)))
    }

    /// 校验语义约束。
    pub fn validate(&self) -> Result<(), FrameBankError> {
        for (frame_type, pool) in self.pools() {
            pool.validate(frame_type)?;
        }
        if self.reader.fetch_latency > MAX_FETCH_LATENCY {
            return Err(FrameBankError::invalid_config(format!(
                "fetch_latency must not exceed {MAX_FETCH_LATENCY}, got {}",
                self.reader.fetch_latency
            )));
        }
        Ok(())
    }

    /// 解析并校验 TOML 文本。
    pub fn from_toml_str(text: &str) -> Result<Self, FrameBankError> {
        let config: Self = toml::from_str(text).map_err(|err| FrameBankError::ConfigParse {
            detail: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 渲染为 TOML 文本。
    pub fn to_toml_string(&self) -> Result<String, FrameBankError> {
        toml::to_string(self).map_err(|err| FrameBankError::ConfigParse {
            detail: err.to_string(),
        })
    }
}
