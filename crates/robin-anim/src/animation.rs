//! 多轨动画
//!
//! 一个动画片段（clip）由八条轨道组成，每条轨道承载一种关键帧。
//! JSON 片段格式与制作工具导出一致：帧对象数组，按 `"Name"` 字段
//! 路由到对应轨道：
//!
//! ```json
//! [
//!   {"Name": "HeadAngleKeyFrame", "triggerTime_ms": 0, "durationTime_ms": 200,
//!    "angle_deg": -20, "angleVariability_deg": 0},
//!   {"Name": "RobotAudioKeyFrame", "triggerTime_ms": 33, "audioName": "chirp"}
//! ]
//! ```

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::AnimError;
use crate::face::ProceduralFaceKeyFrame;
use crate::keyframe::{
    BackpackLightsKeyFrame, BodyMotionKeyFrame, EventKeyFrame, FaceImageKeyFrame,
    HeadAngleKeyFrame, KeyFrame, LiftHeightKeyFrame, RobotAudioKeyFrame,
};
use crate::track::Track;

/// 对所有轨道执行同一方法（等价于原生逐条展开）
macro_rules! all_tracks {
    ($self:ident, $method:ident, &&) => {
        $self.head.$method()
            && $self.lift.$method()
            && $self.body.$method()
            && $self.lights.$method()
            && $self.face_images.$method()
            && $self.faces.$method()
            && $self.audio.$method()
            && $self.events.$method()
    };
    ($self:ident, $method:ident, ||) => {
        $self.head.$method()
            || $self.lift.$method()
            || $self.body.$method()
            || $self.lights.$method()
            || $self.face_images.$method()
            || $self.faces.$method()
            || $self.audio.$method()
            || $self.events.$method()
    };
    ($self:ident, $method:ident) => {
        $self.head.$method();
        $self.lift.$method();
        $self.body.$method();
        $self.lights.$method();
        $self.face_images.$method();
        $self.faces.$method();
        $self.audio.$method();
        $self.events.$method();
    };
}

/// 一个动画片段
///
/// 轨道字段是公开的：流送端需要独立推进每条轨道的游标。
#[derive(Debug, Clone, Default)]
pub struct Animation {
    name: String,
    pub head: Track<HeadAngleKeyFrame>,
    pub lift: Track<LiftHeightKeyFrame>,
    pub body: Track<BodyMotionKeyFrame>,
    pub lights: Track<BackpackLightsKeyFrame>,
    pub face_images: Track<FaceImageKeyFrame>,
    pub faces: Track<ProceduralFaceKeyFrame>,
    pub audio: Track<RobotAudioKeyFrame>,
    pub events: Track<EventKeyFrame>,
}

impl Animation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 从 JSON 帧数组定义动画
    ///
    /// 路由规则见模块文档。未识别的 `"Name"` 与缺字段都是硬错误：
    /// 资产问题必须在加载期暴露。
    pub fn from_json_value(name: &str, frames: &Value) -> Result<Self, AnimError> {
        let frames = frames.as_array().ok_or_else(|| AnimError::MissingField {
            clip: name.to_string(),
            index: 0,
            field: "(array of keyframes)",
        })?;

        let mut anim = Animation::new(name);

        for (index, frame) in frames.iter().enumerate() {
            let frame_name = frame
                .get("Name")
                .and_then(Value::as_str)
                .ok_or_else(|| AnimError::MissingField {
                    clip: name.to_string(),
                    index,
                    field: "Name",
                })?;

            match frame_name {
                "HeadAngleKeyFrame" => {
                    let kf = parse_frame(name, index, frame)?;
                    anim.head.add_keyframe(kf, name, index)?;
                },
                "LiftHeightKeyFrame" => {
                    let kf = parse_frame(name, index, frame)?;
                    anim.lift.add_keyframe(kf, name, index)?;
                },
                "BodyMotionKeyFrame" => {
                    let kf = parse_frame(name, index, frame)?;
                    anim.body.add_keyframe(kf, name, index)?;
                },
                "BackpackLightsKeyFrame" => {
                    let kf = parse_frame(name, index, frame)?;
                    anim.lights.add_keyframe(kf, name, index)?;
                },
                "FaceImageKeyFrame" => {
                    let kf = parse_frame(name, index, frame)?;
                    anim.face_images.add_keyframe(kf, name, index)?;
                },
                "ProceduralFaceKeyFrame" => {
                    let kf = parse_frame(name, index, frame)?;
                    anim.faces.add_keyframe(kf, name, index)?;
                },
                "RobotAudioKeyFrame" => {
                    let kf = parse_frame(name, index, frame)?;
                    anim.audio.add_keyframe(kf, name, index)?;
                },
                "EventKeyFrame" => {
                    let kf = parse_frame(name, index, frame)?;
                    anim.events.add_keyframe(kf, name, index)?;
                },
                other => {
                    return Err(AnimError::UnknownKeyFrameName {
                        clip: name.to_string(),
                        index,
                        name: other.to_string(),
                    });
                },
            }
        }

        if anim.is_empty() {
            // 合法但可疑：空片段会在流送端立即结束
            warn!(clip = name, "Loaded animation with no keyframes");
        }

        Ok(anim)
    }

    /// 重置所有轨道游标（动画开始/重播前调用）
    pub fn init(&mut self) {
        all_tracks!(self, rewind);
    }

    /// 所有轨道都为空
    pub fn is_empty(&self) -> bool {
        all_tracks!(self, is_empty, &&)
    }

    /// 任意轨道还有帧未流出
    pub fn has_frames_left(&self) -> bool {
        all_tracks!(self, has_frames_left, ||)
    }

    /// 片段总时长（毫秒）
    ///
    /// 取各轨道末帧的 触发时间 + 持续时间 的最大值。不带持续时间的
    /// 帧按触发时间计。
    pub fn duration_ms(&self) -> u32 {
        let mut duration = 0u32;
        if let Some(kf) = self.head.last() {
            duration = duration.max(kf.trigger_time_ms + kf.duration_ms as u32);
        }
        if let Some(kf) = self.lift.last() {
            duration = duration.max(kf.trigger_time_ms + kf.duration_ms as u32);
        }
        if let Some(kf) = self.body.last() {
            duration = duration.max(kf.trigger_time_ms + kf.duration_ms as u32);
        }
        if let Some(kf) = self.lights.last() {
            duration = duration.max(kf.trigger_time_ms + kf.duration_ms as u32);
        }
        if let Some(kf) = self.face_images.last() {
            duration = duration.max(kf.trigger_time_ms());
        }
        if let Some(kf) = self.faces.last() {
            duration = duration.max(kf.trigger_time_ms());
        }
        if let Some(kf) = self.audio.last() {
            duration = duration.max(kf.trigger_time_ms());
        }
        if let Some(kf) = self.events.last() {
            duration = duration.max(kf.trigger_time_ms());
        }
        duration
    }

    /// 总关键帧数（诊断展示用）
    pub fn keyframe_count(&self) -> usize {
        self.head.len()
            + self.lift.len()
            + self.body.len()
            + self.lights.len()
            + self.face_images.len()
            + self.faces.len()
            + self.audio.len()
            + self.events.len()
    }
}

fn parse_frame<T: DeserializeOwned>(clip: &str, index: usize, frame: &Value) -> Result<T, AnimError> {
    serde_json::from_value(frame.clone()).map_err(|source| AnimError::KeyFrameParse {
        clip: clip.to_string(),
        index,
        source,
    })
}
