//! 流送配置
//!
//! 默认值与协议常量一致；TOML 中可以只覆盖部分字段。
//!
//! ```toml
//! # robin-streamer.toml
//! tick_interval_ms = 33
//! max_bytes_per_tick = 16500
//! audio_frames_lead = 14
//! robot_buffer_size = 32768
//! ```

use std::path::Path;

use serde::Deserialize;

use robin_protocol::constants::{
    ANIM_TIME_STEP_MS, AUDIO_FRAMES_LEAD, KEYFRAME_BUFFER_SIZE, MAX_BYTES_PER_TICK,
};

use crate::error::StreamerError;

/// 流送配置
///
/// 控制 tick 节奏与流控预算。
///
/// # Example
///
/// ```
/// use robin_streamer::StreamerConfig;
///
/// // 使用默认配置（33ms tick，协议默认预算）
/// let config = StreamerConfig::default();
///
/// // 自定义配置
/// let config = StreamerConfig {
///     tick_interval_ms: 16,
///     ..StreamerConfig::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    /// tick 周期（毫秒）
    pub tick_interval_ms: u64,
    /// 单 tick 字节预算
    pub max_bytes_per_tick: u32,
    /// 音频帧提前量（机器人缓冲区里最多保持的未播放帧数）
    pub audio_frames_lead: u32,
    /// 机器人侧关键帧缓冲区大小（字节）
    pub robot_buffer_size: u32,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: ANIM_TIME_STEP_MS as u64,
            max_bytes_per_tick: MAX_BYTES_PER_TICK,
            audio_frames_lead: AUDIO_FRAMES_LEAD,
            robot_buffer_size: KEYFRAME_BUFFER_SIZE,
        }
    }
}

impl StreamerConfig {
    /// 从 TOML 字符串解析（缺失字段取默认值）
    pub fn from_toml_str(toml_str: &str) -> Result<Self, StreamerError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// 从 TOML 文件加载
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, StreamerError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
