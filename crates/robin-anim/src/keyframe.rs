//! 关键帧类型定义
//!
//! 每种关键帧对应机器人的一条轨道。关键帧携带一个相对动画起点的
//! 触发时间 `triggerTime_ms`，流送端按时间推进依次取帧。
//!
//! JSON 中的字段名与动画制作工具导出的格式一致（camelCase + 单位
//! 后缀），因此这里大量使用 `serde(rename)`。
//!
//! 带 variability 的关键帧在**流送时**施加随机偏移：同一个关键帧
//! 每次播放的结果允许不同；variability 为 0 时不触碰 RNG，输出
//! 完全确定。

use rand::Rng;
use serde::Deserialize;

use robin_protocol::{EngineToRobot, Rgb565};

/// 关键帧公共契约
///
/// `is_time_to_play` 的比较基准是"动画开始以来经过的毫秒数"，
/// 与挂钟时间无关。
pub trait KeyFrame {
    /// 相对动画起点的触发时间（毫秒）
    fn trigger_time_ms(&self) -> u32;

    /// 在 `time_since_start_ms` 时刻是否应当流出本帧
    fn is_time_to_play(&self, time_since_start_ms: u32) -> bool {
        time_since_start_ms >= self.trigger_time_ms()
    }
}

macro_rules! impl_keyframe {
    ($ty:ty) => {
        impl KeyFrame for $ty {
            fn trigger_time_ms(&self) -> u32 {
                self.trigger_time_ms
            }
        }
    };
}

/// 头部角度关键帧
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HeadAngleKeyFrame {
    #[serde(rename = "triggerTime_ms")]
    pub trigger_time_ms: u32,
    #[serde(rename = "durationTime_ms")]
    pub duration_ms: u16,
    #[serde(rename = "angle_deg")]
    pub angle_deg: i8,
    #[serde(rename = "angleVariability_deg", default)]
    pub angle_variability_deg: u8,
}

impl_keyframe!(HeadAngleKeyFrame);

impl HeadAngleKeyFrame {
    /// 生成链路命令（流送时调用，施加随机偏移）
    pub fn stream_message(&self) -> EngineToRobot {
        let angle_deg = if self.angle_variability_deg > 0 {
            let var = self.angle_variability_deg as i16;
            let base = self.angle_deg as i16;
            let jittered = rand::thread_rng().gen_range(base - var..=base + var);
            jittered.clamp(i8::MIN as i16, i8::MAX as i16) as i8
        } else {
            self.angle_deg
        };
        EngineToRobot::HeadAngle {
            angle_deg,
            duration_ms: self.duration_ms,
        }
    }
}

/// 升降臂高度关键帧
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LiftHeightKeyFrame {
    #[serde(rename = "triggerTime_ms")]
    pub trigger_time_ms: u32,
    #[serde(rename = "durationTime_ms")]
    pub duration_ms: u16,
    #[serde(rename = "height_mm")]
    pub height_mm: u8,
    #[serde(rename = "heightVariability_mm", default)]
    pub height_variability_mm: u8,
}

impl_keyframe!(LiftHeightKeyFrame);

impl LiftHeightKeyFrame {
    pub fn stream_message(&self) -> EngineToRobot {
        let height_mm = if self.height_variability_mm > 0 {
            let var = self.height_variability_mm as i16;
            let base = self.height_mm as i16;
            let jittered = rand::thread_rng().gen_range(base - var..=base + var);
            jittered.clamp(0, u8::MAX as i16) as u8
        } else {
            self.height_mm
        };
        EngineToRobot::LiftHeight {
            height_mm,
            duration_ms: self.duration_ms,
        }
    }
}

/// 轮速曲率半径
///
/// JSON 既接受毫米数值，也接受命名值 `"STRAIGHT"`（直行）和
/// `"TURN_IN_PLACE"`（原地转）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurvatureRadius(pub i16);

impl CurvatureRadius {
    pub const STRAIGHT: CurvatureRadius = CurvatureRadius(i16::MAX);
    pub const TURN_IN_PLACE: CurvatureRadius = CurvatureRadius(0);
}

impl<'de> Deserialize<'de> for CurvatureRadius {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Named(String),
            Millimeters(i16),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Millimeters(mm) => Ok(CurvatureRadius(mm)),
            Raw::Named(name) => match name.as_str() {
                "STRAIGHT" => Ok(CurvatureRadius::STRAIGHT),
                "TURN_IN_PLACE" => Ok(CurvatureRadius::TURN_IN_PLACE),
                other => Err(serde::de::Error::custom(format!(
                    "unknown curvature radius '{other}'"
                ))),
            },
        }
    }
}

/// 车体运动关键帧（轮速 + 曲率）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BodyMotionKeyFrame {
    #[serde(rename = "triggerTime_ms")]
    pub trigger_time_ms: u32,
    #[serde(rename = "durationTime_ms")]
    pub duration_ms: u16,
    #[serde(rename = "speed")]
    pub speed_mmps: i16,
    #[serde(rename = "curvatureRadius_mm")]
    pub curvature_radius: CurvatureRadius,
}

impl_keyframe!(BodyMotionKeyFrame);

impl BodyMotionKeyFrame {
    pub fn stream_message(&self) -> EngineToRobot {
        EngineToRobot::BodyMotion {
            speed_mmps: self.speed_mmps,
            curvature_radius_mm: self.curvature_radius.0,
            duration_ms: self.duration_ms,
        }
    }
}

/// 背包灯关键帧
///
/// 颜色为 RGBA 浮点数组（alpha 在链路上被忽略，制作工具会导出它）。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BackpackLightsKeyFrame {
    #[serde(rename = "triggerTime_ms")]
    pub trigger_time_ms: u32,
    #[serde(rename = "durationTime_ms")]
    pub duration_ms: u16,
    #[serde(rename = "Left")]
    pub left: [f32; 4],
    #[serde(rename = "Front")]
    pub front: [f32; 4],
    #[serde(rename = "Middle")]
    pub middle: [f32; 4],
    #[serde(rename = "Back")]
    pub back: [f32; 4],
    #[serde(rename = "Right")]
    pub right: [f32; 4],
}

impl_keyframe!(BackpackLightsKeyFrame);

impl BackpackLightsKeyFrame {
    pub fn stream_message(&self) -> EngineToRobot {
        let pack = |c: [f32; 4]| Rgb565::from_rgb_f32(c[0], c[1], c[2]);
        EngineToRobot::BackpackLights {
            colors: [
                pack(self.left),
                pack(self.front),
                pack(self.middle),
                pack(self.back),
                pack(self.right),
            ],
        }
    }
}

/// 面部图像关键帧
///
/// `imageName` 在流送前通过 [`FaceImageMap`](crate::face::FaceImageMap)
/// 解析为位图；未注册的名字在加载校验时报错，而不是播到一半才失败。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FaceImageKeyFrame {
    #[serde(rename = "triggerTime_ms")]
    pub trigger_time_ms: u32,
    #[serde(rename = "imageName")]
    pub image_name: String,
}

impl_keyframe!(FaceImageKeyFrame);

/// 机器人音频关键帧
///
/// `probability` 在流送时掷一次骰子决定是否播放（probability = 1.0
/// 时不触碰 RNG）。音量在采样混合阶段施加。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RobotAudioKeyFrame {
    #[serde(rename = "triggerTime_ms")]
    pub trigger_time_ms: u32,
    #[serde(rename = "audioName")]
    pub audio_name: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_probability")]
    pub probability: f32,
}

fn default_volume() -> f32 {
    1.0
}

fn default_probability() -> f32 {
    1.0
}

impl_keyframe!(RobotAudioKeyFrame);

impl RobotAudioKeyFrame {
    /// 本次播放是否命中概率门
    pub fn roll_probability(&self) -> bool {
        if self.probability >= 1.0 {
            true
        } else if self.probability <= 0.0 {
            false
        } else {
            rand::thread_rng().r#gen::<f32>() < self.probability
        }
    }
}

/// 事件关键帧
///
/// 不发给机器人：触发时间到达时回调给宿主进程（行为层据此同步
/// 游戏逻辑、设备端音效等）。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventKeyFrame {
    #[serde(rename = "triggerTime_ms")]
    pub trigger_time_ms: u32,
    #[serde(rename = "event_id")]
    pub event_id: String,
}

impl_keyframe!(EventKeyFrame);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_angle_from_json() {
        let kf: HeadAngleKeyFrame = serde_json::from_str(
            r#"{"triggerTime_ms": 132, "durationTime_ms": 200, "angle_deg": -20, "angleVariability_deg": 0}"#,
        )
        .unwrap();
        assert_eq!(kf.trigger_time_ms, 132);
        assert_eq!(kf.angle_deg, -20);
        assert!(kf.is_time_to_play(132));
        assert!(!kf.is_time_to_play(131));
    }

    #[test]
    fn test_head_angle_variability_default() {
        let kf: HeadAngleKeyFrame = serde_json::from_str(
            r#"{"triggerTime_ms": 0, "durationTime_ms": 100, "angle_deg": 10}"#,
        )
        .unwrap();
        assert_eq!(kf.angle_variability_deg, 0);
    }

    #[test]
    fn test_head_angle_deterministic_without_variability() {
        let kf = HeadAngleKeyFrame {
            trigger_time_ms: 0,
            duration_ms: 100,
            angle_deg: 15,
            angle_variability_deg: 0,
        };
        for _ in 0..8 {
            match kf.stream_message() {
                EngineToRobot::HeadAngle { angle_deg, .. } => assert_eq!(angle_deg, 15),
                other => panic!("unexpected message: {:?}", other.tag()),
            }
        }
    }

    #[test]
    fn test_head_angle_variability_stays_in_range() {
        let kf = HeadAngleKeyFrame {
            trigger_time_ms: 0,
            duration_ms: 100,
            angle_deg: 20,
            angle_variability_deg: 5,
        };
        for _ in 0..64 {
            match kf.stream_message() {
                EngineToRobot::HeadAngle { angle_deg, .. } => {
                    assert!((15..=25).contains(&angle_deg), "angle {} out of range", angle_deg);
                },
                other => panic!("unexpected message: {:?}", other.tag()),
            }
        }
    }

    #[test]
    fn test_lift_height_variability_clamps_at_zero() {
        let kf = LiftHeightKeyFrame {
            trigger_time_ms: 0,
            duration_ms: 100,
            height_mm: 2,
            height_variability_mm: 10,
        };
        for _ in 0..64 {
            match kf.stream_message() {
                EngineToRobot::LiftHeight { height_mm, .. } => {
                    assert!(height_mm <= 12);
                },
                other => panic!("unexpected message: {:?}", other.tag()),
            }
        }
    }

    #[test]
    fn test_curvature_radius_named_values() {
        let straight: CurvatureRadius = serde_json::from_str(r#""STRAIGHT""#).unwrap();
        assert_eq!(straight, CurvatureRadius::STRAIGHT);

        let turn: CurvatureRadius = serde_json::from_str(r#""TURN_IN_PLACE""#).unwrap();
        assert_eq!(turn, CurvatureRadius::TURN_IN_PLACE);

        let numeric: CurvatureRadius = serde_json::from_str("150").unwrap();
        assert_eq!(numeric, CurvatureRadius(150));

        let bad: Result<CurvatureRadius, _> = serde_json::from_str(r#""WIGGLE""#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_body_motion_from_json() {
        let kf: BodyMotionKeyFrame = serde_json::from_str(
            r#"{"triggerTime_ms": 66, "durationTime_ms": 500, "speed": -40, "curvatureRadius_mm": "STRAIGHT"}"#,
        )
        .unwrap();
        match kf.stream_message() {
            EngineToRobot::BodyMotion {
                speed_mmps,
                curvature_radius_mm,
                duration_ms,
            } => {
                assert_eq!(speed_mmps, -40);
                assert_eq!(curvature_radius_mm, i16::MAX);
                assert_eq!(duration_ms, 500);
            },
            other => panic!("unexpected message: {:?}", other.tag()),
        }
    }

    #[test]
    fn test_backpack_lights_packs_colors() {
        let kf: BackpackLightsKeyFrame = serde_json::from_str(
            r#"{
                "triggerTime_ms": 0, "durationTime_ms": 330,
                "Left":   [1.0, 0.0, 0.0, 1.0],
                "Front":  [0.0, 1.0, 0.0, 1.0],
                "Middle": [0.0, 0.0, 1.0, 1.0],
                "Back":   [0.0, 0.0, 0.0, 1.0],
                "Right":  [1.0, 1.0, 1.0, 1.0]
            }"#,
        )
        .unwrap();
        match kf.stream_message() {
            EngineToRobot::BackpackLights { colors } => {
                assert_eq!(colors[0].raw(), 0xF800); // red
                assert_eq!(colors[1].raw(), 0x07E0); // green
                assert_eq!(colors[2].raw(), 0x001F); // blue
                assert_eq!(colors[3].raw(), 0x0000); // off
                assert_eq!(colors[4].raw(), 0xFFFF); // white
            },
            other => panic!("unexpected message: {:?}", other.tag()),
        }
    }

    #[test]
    fn test_audio_keyframe_defaults() {
        let kf: RobotAudioKeyFrame = serde_json::from_str(
            r#"{"triggerTime_ms": 0, "audioName": "chirp"}"#,
        )
        .unwrap();
        assert_eq!(kf.volume, 1.0);
        assert_eq!(kf.probability, 1.0);
        assert!(kf.roll_probability());
    }

    #[test]
    fn test_audio_probability_zero_never_plays() {
        let kf = RobotAudioKeyFrame {
            trigger_time_ms: 0,
            audio_name: "chirp".into(),
            volume: 1.0,
            probability: 0.0,
        };
        for _ in 0..16 {
            assert!(!kf.roll_probability());
        }
    }

    #[test]
    fn test_event_keyframe_from_json() {
        let kf: EventKeyFrame = serde_json::from_str(
            r#"{"triggerTime_ms": 990, "event_id": "tap_table"}"#,
        )
        .unwrap();
        assert_eq!(kf.event_id, "tap_table");
        assert_eq!(kf.trigger_time_ms(), 990);
    }

    #[test]
    fn test_missing_trigger_time_is_error() {
        let result: Result<HeadAngleKeyFrame, _> =
            serde_json::from_str(r#"{"durationTime_ms": 100, "angle_deg": 0}"#);
        assert!(result.is_err());
    }
}
