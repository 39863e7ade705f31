//! # Robin Anim - 动画数据层
//!
//! 本模块提供动画片段的数据表示与资产加载，包括：
//! - 八种关键帧类型与按触发时间排序的轨道
//! - 多轨 `Animation` 与制作工具 JSON 格式解析
//! - 名字 → ID 的 `AnimationContainer`
//! - 面部位图 / 程序化面部（插值 + 栅格化）
//! - 音频库（按帧切分的 PCM 片段）
//!
//! # 使用场景
//!
//! 本层只关心"动画是什么"，不关心"怎么流出去"。流送时序、流控与
//! 链路传输见 `robin-streamer`。

pub mod animation;
pub mod audio;
pub mod container;
mod error;
pub mod face;
pub mod keyframe;
pub mod track;

// 重新导出常用类型
pub use animation::Animation;
pub use audio::{AudioClip, AudioLibrary};
pub use container::{AnimationContainer, AnimationId};
pub use error::AnimError;
pub use face::{EyeParams, FaceBitmap, FaceImageMap, ProceduralFace, ProceduralFaceKeyFrame};
pub use keyframe::{
    BackpackLightsKeyFrame, BodyMotionKeyFrame, CurvatureRadius, EventKeyFrame, FaceImageKeyFrame,
    HeadAngleKeyFrame, KeyFrame, LiftHeightKeyFrame, RobotAudioKeyFrame,
};
pub use track::Track;
