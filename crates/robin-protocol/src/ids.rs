//! 消息 Tag 定义
//!
//! 每条链路消息的首字节是 Tag，标识载荷类型。引擎 → 机器人与
//! 机器人 → 引擎共用同一个编号空间，互不重叠。

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 链路消息 Tag
///
/// | 方向 | Tag | 含义 |
/// |------|-----|------|
/// | E→R  | 0x01 | 音频采样帧 |
/// | E→R  | 0x02 | 音频静音帧 |
/// | E→R  | 0x03 | 头部角度 |
/// | E→R  | 0x04 | 升降臂高度 |
/// | E→R  | 0x05 | 轮速/曲率 |
/// | E→R  | 0x06 | 背包灯颜色 |
/// | E→R  | 0x07 | 面部图像（RLE） |
/// | E→R  | 0x10 | 动画开始标记 |
/// | E→R  | 0x11 | 动画结束标记 |
/// | E→R  | 0x12 | 中止动画 |
/// | R→E  | 0x80 | 播放缓冲区状态 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum MessageTag {
    AudioSample = 0x01,
    AudioSilence = 0x02,
    HeadAngle = 0x03,
    LiftHeight = 0x04,
    BodyMotion = 0x05,
    BackpackLights = 0x06,
    FaceImage = 0x07,
    StartOfAnimation = 0x10,
    EndOfAnimation = 0x11,
    AbortAnimation = 0x12,
    BufferStatus = 0x80,
}

impl MessageTag {
    /// 该消息是否计入音频帧流控预算
    ///
    /// 动画结束标记也按一帧音频计数（机器人侧按音频节拍消费它）。
    pub fn counts_as_audio_frame(&self) -> bool {
        matches!(
            self,
            MessageTag::AudioSample | MessageTag::AudioSilence | MessageTag::EndOfAnimation
        )
    }
}
