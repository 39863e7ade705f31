//! 流控
//!
//! 两个预算同时约束每个 tick 能流出的量：
//!
//! 1. **字节预算**：不超过单 tick 上限，也不超过机器人缓冲区的
//!    剩余空间（由已流出/已播放的累计计数之差推得）；
//! 2. **音频帧预算**：机器人缓冲区里未播放的音频帧不超过提前量，
//!    把端到端延迟约束在可感知阈值之下。
//!
//! 计数器是累计值且允许回绕，所有差值都用回绕减法。

use robin_protocol::{BufferStatus, EngineToRobot};

use crate::config::StreamerConfig;

/// 每 tick 重算的流控状态
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowControl {
    /// 已流出字节数（累计，回绕）
    bytes_streamed: u32,
    /// 已流出音频帧数（累计，回绕）
    audio_frames_streamed: u32,
    /// 机器人上报的已播放字节数
    bytes_played: u32,
    /// 机器人上报的已播放音频帧数
    audio_frames_played: u32,

    /// 本 tick 剩余字节预算
    bytes_allowance: u32,
    /// 本 tick 剩余音频帧预算
    audio_frames_allowance: u32,
}

impl FlowControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并一条机器人反馈
    pub fn note_feedback(&mut self, status: &BufferStatus) {
        self.bytes_played = status.bytes_played;
        self.audio_frames_played = status.audio_frames_played;
    }

    /// 机器人缓冲区中尚未播放的字节数
    pub fn bytes_in_flight(&self) -> u32 {
        self.bytes_streamed.wrapping_sub(self.bytes_played)
    }

    /// 机器人缓冲区中尚未播放的音频帧数
    pub fn audio_frames_in_flight(&self) -> u32 {
        self.audio_frames_streamed.wrapping_sub(self.audio_frames_played)
    }

    /// tick 开始时重算预算
    pub fn begin_tick(&mut self, config: &StreamerConfig) {
        let free_bytes = config.robot_buffer_size.saturating_sub(self.bytes_in_flight());
        self.bytes_allowance = config.max_bytes_per_tick.min(free_bytes);
        self.audio_frames_allowance = config
            .audio_frames_lead
            .saturating_sub(self.audio_frames_in_flight());
    }

    /// 本 tick 还能否发送这条消息
    pub fn can_send(&self, msg: &EngineToRobot) -> bool {
        if (msg.wire_size() as u32) > self.bytes_allowance {
            return false;
        }
        if msg.counts_as_audio_frame() && self.audio_frames_allowance == 0 {
            return false;
        }
        true
    }

    /// 记账：消息已发出
    pub fn note_sent(&mut self, msg: &EngineToRobot) {
        let size = msg.wire_size() as u32;
        self.bytes_streamed = self.bytes_streamed.wrapping_add(size);
        self.bytes_allowance = self.bytes_allowance.saturating_sub(size);
        if msg.counts_as_audio_frame() {
            self.audio_frames_streamed = self.audio_frames_streamed.wrapping_add(1);
            self.audio_frames_allowance = self.audio_frames_allowance.saturating_sub(1);
        }
    }

    pub fn bytes_streamed(&self) -> u32 {
        self.bytes_streamed
    }

    pub fn audio_frames_streamed(&self) -> u32 {
        self.audio_frames_streamed
    }
}
