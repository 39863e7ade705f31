//! # Robin Streamer - 动画流送层
//!
//! 本模块提供动画片段到机器人的有界速率流送，包括：
//! - 播放状态机（tag 分配、循环计数、空闲兜底、轨道锁定）
//! - 字节 / 音频帧双预算流控
//! - 机器人链路抽象（UDP / 进程内回环）
//! - 后台线程驱动（crossbeam 控制通道 + arc-swap 状态快照）
//!
//! # 使用场景
//!
//! 宿主进程（行为引擎）加载好 `robin-anim` 容器后交给本层：
//!
//! ```no_run
//! use robin_anim::AnimationContainer;
//! use robin_streamer::{AnimationStreamer, LoopbackLink, runner};
//!
//! let mut container = AnimationContainer::new();
//! container.load_dir("assets/animations").unwrap();
//!
//! let streamer = AnimationStreamer::new(container);
//! let handle = runner::spawn(streamer, LoopbackLink::new());
//! handle.set_idle(Some("anim_idle_breathe".to_string())).unwrap();
//! handle.play("anim_greeting_wave", 1, false).unwrap();
//! ```
//!
//! 不需要后台线程时也可以自己驱动：每个引擎 tick 调用一次
//! [`AnimationStreamer::update`]。

pub mod config;
mod error;
pub mod flow;
pub mod link;
pub mod metrics;
pub mod runner;
pub mod streamer;

// 重新导出常用类型
pub use config::StreamerConfig;
pub use error::StreamerError;
pub use flow::FlowControl;
pub use link::{LinkError, LoopbackLink, RobotLink, UdpLink};
pub use metrics::{MetricsSnapshot, StreamerMetrics};
pub use runner::{StreamerCommand, StreamerHandle, StreamerStatus};
pub use streamer::{
    AnimationStreamer, EventSink, IDLE_ANIMATION_TAG, NOT_ANIMATING_TAG, StreamEvent, Tag,
    TrackFlags,
};
