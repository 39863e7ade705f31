//! 机器人 → 引擎反馈帧解析
//!
//! 机器人周期性上报播放缓冲区状态，流控层据此计算剩余空间。
//! 计数器是累计值且允许回绕，消费端必须使用回绕减法。

use crate::ProtocolError;
use crate::bytes_to_u32_be;
use crate::ids::MessageTag;

/// 播放缓冲区状态（0x80）
///
/// 载荷布局（大端）：
///
/// | 偏移 | 类型 | 含义 |
/// |------|------|------|
/// | 0    | u32  | 已播放字节数（累计，回绕） |
/// | 4    | u32  | 已播放音频帧数（累计，回绕） |
/// | 8    | u8   | 当前播放的动画 tag（0 = 未在播放） |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BufferStatus {
    /// 已播放字节数（累计，回绕）
    pub bytes_played: u32,
    /// 已播放音频帧数（累计，回绕）
    pub audio_frames_played: u32,
    /// 当前播放的动画 tag（0 = 未在播放）
    pub current_tag: u8,
}

/// 机器人 → 引擎消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotToEngine {
    BufferStatus(BufferStatus),
}

impl RobotToEngine {
    const BUFFER_STATUS_PAYLOAD: usize = 9;

    /// 从链路字节流解码
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let (&tag_byte, payload) = data.split_first().ok_or(ProtocolError::EmptyFrame)?;
        let tag =
            MessageTag::try_from(tag_byte).map_err(|_| ProtocolError::UnknownTag { tag: tag_byte })?;

        match tag {
            MessageTag::BufferStatus => {
                if payload.len() != Self::BUFFER_STATUS_PAYLOAD {
                    return Err(ProtocolError::InvalidLength {
                        expected: Self::BUFFER_STATUS_PAYLOAD,
                        actual: payload.len(),
                    });
                }
                Ok(RobotToEngine::BufferStatus(BufferStatus {
                    bytes_played: bytes_to_u32_be([payload[0], payload[1], payload[2], payload[3]]),
                    audio_frames_played: bytes_to_u32_be([
                        payload[4], payload[5], payload[6], payload[7],
                    ]),
                    current_tag: payload[8],
                }))
            },
            // 其余 Tag 都是引擎 → 机器人方向
            _ => Err(ProtocolError::UnknownTag { tag: tag_byte }),
        }
    }

    /// 编码为链路字节流（回环链路与测试使用）
    pub fn encode(&self) -> Vec<u8> {
        match self {
            RobotToEngine::BufferStatus(status) => {
                let mut buf = Vec::with_capacity(1 + Self::BUFFER_STATUS_PAYLOAD);
                buf.push(MessageTag::BufferStatus.into());
                buf.extend_from_slice(&status.bytes_played.to_be_bytes());
                buf.extend_from_slice(&status.audio_frames_played.to_be_bytes());
                buf.push(status.current_tag);
                buf
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_status_roundtrip() {
        let status = BufferStatus {
            bytes_played: 0xFFFF_FFF0, // 接近回绕
            audio_frames_played: 12_345,
            current_tag: 3,
        };
        let encoded = RobotToEngine::BufferStatus(status).encode();
        let decoded = RobotToEngine::decode(&encoded).unwrap();
        assert_eq!(decoded, RobotToEngine::BufferStatus(status));
    }

    #[test]
    fn test_decode_rejects_command_tags() {
        let result = RobotToEngine::decode(&[MessageTag::HeadAngle.into(), 0, 0, 0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_short_payload() {
        let result = RobotToEngine::decode(&[MessageTag::BufferStatus.into(), 1, 2]);
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidLength {
                expected: 9,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_wrapping_counter_math() {
        // 消费端用回绕减法计算在途量
        let streamed: u32 = 0x0000_0010;
        let played: u32 = 0xFFFF_FFF8; // 机器人先上报的旧值回绕了
        assert_eq!(streamed.wrapping_sub(played), 0x18);
    }
}
