//! 流送层错误类型定义

use thiserror::Error;

use crate::link::LinkError;
use robin_anim::AnimError;

/// 流送层错误类型
#[derive(Error, Debug)]
pub enum StreamerError {
    /// 动画数据层错误（未知片段、资产解析失败等）
    #[error("Animation error: {0}")]
    Anim(#[from] AnimError),

    /// 机器人链路错误
    #[error("Robot link error: {0}")]
    Link(#[from] LinkError),

    /// 配置文件读取错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 配置解析错误
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// 控制通道已关闭（后台线程退出）
    #[error("Control channel closed")]
    ChannelClosed,
}
