//! 引擎 → 机器人命令帧构建
//!
//! 每条命令编码为 `[tag: u8][payload…]`，载荷为大端字节序。
//! 音频帧（采样或静音）是时钟载体：机器人每消费一帧，播放时间
//! 前进 [`crate::SAMPLE_LENGTH_MS`] 毫秒。其余命令都锚定在最近
//! 一个音频帧的时间点上。

use bytes::BufMut;

use crate::ProtocolError;
use crate::color::Rgb565;
use crate::constants::{AUDIO_SAMPLES_PER_FRAME, BACKPACK_LED_COUNT};
use crate::ids::MessageTag;

/// 引擎 → 机器人命令
///
/// # 设计目的
///
/// `EngineToRobot` 是动画层与链路层之间的中间抽象：
/// - **层次解耦**：动画层不依赖具体传输（UDP/回环）
/// - **流控契约**：[`wire_size`](Self::wire_size) 与编码字节数严格一致，
///   流控层直接按它扣减预算
/// - **类型安全**：编译期保证载荷字段齐全，避免裸字节拼接错误
#[derive(Debug, Clone, PartialEq)]
pub enum EngineToRobot {
    /// 一帧音频采样（单声道 i16，800 点 ≈ 33ms）
    ///
    /// 采样数组装箱存放，避免把 1.6KB 压进枚举本体。
    AudioSample { samples: Box<[i16; AUDIO_SAMPLES_PER_FRAME]> },

    /// 一帧静音
    ///
    /// 零载荷，但与采样帧一样推进机器人的播放时钟。
    AudioSilence,

    /// 头部角度目标（在 `duration_ms` 内到达）
    HeadAngle { angle_deg: i8, duration_ms: u16 },

    /// 升降臂高度目标
    LiftHeight { height_mm: u8, duration_ms: u16 },

    /// 轮速与转弯曲率
    ///
    /// `curvature_radius_mm == i16::MAX` 表示直行，`0` 表示原地转。
    BodyMotion {
        speed_mmps: i16,
        curvature_radius_mm: i16,
        duration_ms: u16,
    },

    /// 背包灯颜色（5 灯，每灯 RGB565）
    BackpackLights { colors: [Rgb565; BACKPACK_LED_COUNT] },

    /// 面部图像（RLE 压缩，见 [`crate::face_rle`]）
    FaceImage { rle: Vec<u8> },

    /// 动画开始标记（携带播放 tag）
    StartOfAnimation { tag: u8 },

    /// 动画结束标记
    ///
    /// 流控按一帧音频计数（机器人侧按音频节拍消费）。
    EndOfAnimation,

    /// 立即中止当前动画并清空机器人侧缓冲
    AbortAnimation,
}

impl EngineToRobot {
    /// 消息 Tag
    pub fn tag(&self) -> MessageTag {
        match self {
            EngineToRobot::AudioSample { .. } => MessageTag::AudioSample,
            EngineToRobot::AudioSilence => MessageTag::AudioSilence,
            EngineToRobot::HeadAngle { .. } => MessageTag::HeadAngle,
            EngineToRobot::LiftHeight { .. } => MessageTag::LiftHeight,
            EngineToRobot::BodyMotion { .. } => MessageTag::BodyMotion,
            EngineToRobot::BackpackLights { .. } => MessageTag::BackpackLights,
            EngineToRobot::FaceImage { .. } => MessageTag::FaceImage,
            EngineToRobot::StartOfAnimation { .. } => MessageTag::StartOfAnimation,
            EngineToRobot::EndOfAnimation => MessageTag::EndOfAnimation,
            EngineToRobot::AbortAnimation => MessageTag::AbortAnimation,
        }
    }

    /// 该消息是否计入音频帧流控预算
    pub fn counts_as_audio_frame(&self) -> bool {
        self.tag().counts_as_audio_frame()
    }

    /// 编码后的字节数（含 tag 字节）
    ///
    /// 必须与 [`encode`](Self::encode) 的输出长度严格一致。
    pub fn wire_size(&self) -> usize {
        1 + match self {
            EngineToRobot::AudioSample { .. } => 2 * AUDIO_SAMPLES_PER_FRAME,
            EngineToRobot::AudioSilence => 0,
            EngineToRobot::HeadAngle { .. } => 3,
            EngineToRobot::LiftHeight { .. } => 3,
            EngineToRobot::BodyMotion { .. } => 6,
            EngineToRobot::BackpackLights { .. } => 2 * BACKPACK_LED_COUNT,
            EngineToRobot::FaceImage { rle } => 2 + rle.len(),
            EngineToRobot::StartOfAnimation { .. } => 1,
            EngineToRobot::EndOfAnimation => 0,
            EngineToRobot::AbortAnimation => 0,
        }
    }

    /// 编码为链路字节流
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_size());
        buf.put_u8(self.tag().into());

        match self {
            EngineToRobot::AudioSample { samples } => {
                for &s in samples.iter() {
                    buf.put_i16(s);
                }
            },
            EngineToRobot::AudioSilence => {},
            EngineToRobot::HeadAngle {
                angle_deg,
                duration_ms,
            } => {
                buf.put_i8(*angle_deg);
                buf.put_u16(*duration_ms);
            },
            EngineToRobot::LiftHeight {
                height_mm,
                duration_ms,
            } => {
                buf.put_u8(*height_mm);
                buf.put_u16(*duration_ms);
            },
            EngineToRobot::BodyMotion {
                speed_mmps,
                curvature_radius_mm,
                duration_ms,
            } => {
                buf.put_i16(*speed_mmps);
                buf.put_i16(*curvature_radius_mm);
                buf.put_u16(*duration_ms);
            },
            EngineToRobot::BackpackLights { colors } => {
                for color in colors {
                    buf.put_u16(color.raw());
                }
            },
            EngineToRobot::FaceImage { rle } => {
                buf.put_u16(rle.len() as u16);
                buf.put_slice(rle);
            },
            EngineToRobot::StartOfAnimation { tag } => {
                buf.put_u8(*tag);
            },
            EngineToRobot::EndOfAnimation => {},
            EngineToRobot::AbortAnimation => {},
        }

        debug_assert_eq!(buf.len(), self.wire_size());
        buf
    }

    /// 从链路字节流解码
    ///
    /// # Errors
    ///
    /// - 空帧 → `EmptyFrame`
    /// - 未知 Tag → `UnknownTag`
    /// - 载荷长度与 Tag 不符 → `InvalidLength`
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let (&tag_byte, payload) = data.split_first().ok_or(ProtocolError::EmptyFrame)?;
        let tag =
            MessageTag::try_from(tag_byte).map_err(|_| ProtocolError::UnknownTag { tag: tag_byte })?;

        let expect_len = |expected: usize| -> Result<(), ProtocolError> {
            if payload.len() != expected {
                Err(ProtocolError::InvalidLength {
                    expected,
                    actual: payload.len(),
                })
            } else {
                Ok(())
            }
        };

        match tag {
            MessageTag::AudioSample => {
                expect_len(2 * AUDIO_SAMPLES_PER_FRAME)?;
                let mut samples = Box::new([0i16; AUDIO_SAMPLES_PER_FRAME]);
                for (i, chunk) in payload.chunks_exact(2).enumerate() {
                    samples[i] = i16::from_be_bytes([chunk[0], chunk[1]]);
                }
                Ok(EngineToRobot::AudioSample { samples })
            },
            MessageTag::AudioSilence => {
                expect_len(0)?;
                Ok(EngineToRobot::AudioSilence)
            },
            MessageTag::HeadAngle => {
                expect_len(3)?;
                Ok(EngineToRobot::HeadAngle {
                    angle_deg: payload[0] as i8,
                    duration_ms: u16::from_be_bytes([payload[1], payload[2]]),
                })
            },
            MessageTag::LiftHeight => {
                expect_len(3)?;
                Ok(EngineToRobot::LiftHeight {
                    height_mm: payload[0],
                    duration_ms: u16::from_be_bytes([payload[1], payload[2]]),
                })
            },
            MessageTag::BodyMotion => {
                expect_len(6)?;
                Ok(EngineToRobot::BodyMotion {
                    speed_mmps: i16::from_be_bytes([payload[0], payload[1]]),
                    curvature_radius_mm: i16::from_be_bytes([payload[2], payload[3]]),
                    duration_ms: u16::from_be_bytes([payload[4], payload[5]]),
                })
            },
            MessageTag::BackpackLights => {
                expect_len(2 * BACKPACK_LED_COUNT)?;
                let mut colors = [Rgb565::off(); BACKPACK_LED_COUNT];
                for (i, chunk) in payload.chunks_exact(2).enumerate() {
                    colors[i] = Rgb565::from(u16::from_be_bytes([chunk[0], chunk[1]]));
                }
                Ok(EngineToRobot::BackpackLights { colors })
            },
            MessageTag::FaceImage => {
                if payload.len() < 2 {
                    return Err(ProtocolError::InvalidLength {
                        expected: 2,
                        actual: payload.len(),
                    });
                }
                let rle_len = u16::from_be_bytes([payload[0], payload[1]]) as usize;
                expect_len(2 + rle_len)?;
                Ok(EngineToRobot::FaceImage {
                    rle: payload[2..].to_vec(),
                })
            },
            MessageTag::StartOfAnimation => {
                expect_len(1)?;
                Ok(EngineToRobot::StartOfAnimation { tag: payload[0] })
            },
            MessageTag::EndOfAnimation => {
                expect_len(0)?;
                Ok(EngineToRobot::EndOfAnimation)
            },
            MessageTag::AbortAnimation => {
                expect_len(0)?;
                Ok(EngineToRobot::AbortAnimation)
            },
            MessageTag::BufferStatus => Err(ProtocolError::UnknownTag { tag: tag_byte }),
        }
    }

    /// 构造一帧静音的便捷方法
    pub fn silence() -> Self {
        EngineToRobot::AudioSilence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_size_matches_encode() {
        let messages = vec![
            EngineToRobot::AudioSample {
                samples: Box::new([0x1234; AUDIO_SAMPLES_PER_FRAME]),
            },
            EngineToRobot::AudioSilence,
            EngineToRobot::HeadAngle {
                angle_deg: -20,
                duration_ms: 200,
            },
            EngineToRobot::LiftHeight {
                height_mm: 45,
                duration_ms: 150,
            },
            EngineToRobot::BodyMotion {
                speed_mmps: -80,
                curvature_radius_mm: i16::MAX,
                duration_ms: 500,
            },
            EngineToRobot::BackpackLights {
                colors: [Rgb565::from_rgb8(255, 0, 0); BACKPACK_LED_COUNT],
            },
            EngineToRobot::FaceImage {
                rle: vec![255, 0, 255, 0, 255, 0, 255, 0, 4, 0],
            },
            EngineToRobot::StartOfAnimation { tag: 7 },
            EngineToRobot::EndOfAnimation,
            EngineToRobot::AbortAnimation,
        ];

        for msg in messages {
            let encoded = msg.encode();
            assert_eq!(encoded.len(), msg.wire_size(), "size mismatch for {:?}", msg.tag());
            let decoded = EngineToRobot::decode(&encoded).unwrap();
            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn test_decode_empty_frame() {
        assert!(matches!(
            EngineToRobot::decode(&[]),
            Err(ProtocolError::EmptyFrame)
        ));
    }

    #[test]
    fn test_decode_unknown_tag() {
        assert!(matches!(
            EngineToRobot::decode(&[0x7F]),
            Err(ProtocolError::UnknownTag { tag: 0x7F })
        ));
    }

    #[test]
    fn test_decode_truncated_payload() {
        // HeadAngle 需要 3 字节载荷
        let result = EngineToRobot::decode(&[MessageTag::HeadAngle.into(), 10]);
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidLength {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_decode_rejects_feedback_tag() {
        // BufferStatus 是机器人 → 引擎方向，不能按命令解码
        let result = EngineToRobot::decode(&[MessageTag::BufferStatus.into()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_face_image_length_prefix() {
        let msg = EngineToRobot::FaceImage {
            rle: vec![1, 0xAA],
        };
        let encoded = msg.encode();
        assert_eq!(encoded[0], u8::from(MessageTag::FaceImage));
        assert_eq!(u16::from_be_bytes([encoded[1], encoded[2]]), 2);
    }

    #[test]
    fn test_silence_is_one_byte() {
        assert_eq!(EngineToRobot::silence().wire_size(), 1);
    }
}
