//! 动画数据层错误类型定义

use thiserror::Error;

/// 动画数据层错误类型
#[derive(Error, Debug)]
pub enum AnimError {
    /// JSON 解析错误
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 文件读取错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 关键帧缺少必填字段
    #[error("Keyframe {index} of clip '{clip}' is missing field '{field}'")]
    MissingField {
        clip: String,
        index: usize,
        field: &'static str,
    },

    /// 未识别的关键帧类型名
    #[error("Keyframe {index} of clip '{clip}' has unrecognized name '{name}'")]
    UnknownKeyFrameName {
        clip: String,
        index: usize,
        name: String,
    },

    /// 关键帧字段解析失败
    #[error("Keyframe {index} of clip '{clip}' failed to parse: {source}")]
    KeyFrameParse {
        clip: String,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    /// 触发时间必须非递减
    #[error("Keyframe {index} of clip '{clip}' has trigger time {trigger_ms}ms before previous frame")]
    NonMonotonicTrigger {
        clip: String,
        index: usize,
        trigger_ms: u32,
    },

    /// 容器中不存在该动画
    #[error("Unknown animation '{0}'")]
    UnknownClip(String),

    /// 面部图像表中不存在该图像
    #[error("Unknown face image '{0}'")]
    UnknownImage(String),

    /// 音频库中不存在该音频
    #[error("Unknown audio clip '{0}'")]
    UnknownAudio(String),

    /// 面部图像数据格式错误
    #[error("Invalid face image '{name}': {reason}")]
    InvalidImage { name: String, reason: String },
}
