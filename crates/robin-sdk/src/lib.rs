//! # Robin SDK
//!
//! 动画流送 SDK 的统一入口，重新导出三层：
//!
//! - [`protocol`]：链路消息编解码与时序常量
//! - [`anim`]：动画片段、关键帧轨道与资产加载
//! - [`streamer`]：有界速率流送引擎与后台线程
//!
//! ## 快速开始
//!
//! ```no_run
//! use robin_sdk::prelude::*;
//!
//! robin_sdk::init_logging();
//!
//! let mut container = AnimationContainer::new();
//! container.load_dir("assets/animations").unwrap();
//!
//! let streamer = AnimationStreamer::new(container);
//! let handle = robin_sdk::streamer::runner::spawn(streamer, LoopbackLink::new());
//! handle.play("anim_greeting_wave", 1, false).unwrap();
//! ```

pub use robin_anim as anim;
pub use robin_protocol as protocol;
pub use robin_streamer as streamer;

/// 常用类型一站式导入
pub mod prelude {
    pub use robin_anim::{
        Animation, AnimationContainer, AnimationId, AudioClip, AudioLibrary, FaceImageMap,
    };
    pub use robin_protocol::{EngineToRobot, MessageTag, RobotToEngine};
    pub use robin_streamer::{
        AnimationStreamer, LoopbackLink, RobotLink, StreamEvent, StreamerConfig, StreamerHandle,
        TrackFlags, UdpLink,
    };
}

/// 初始化日志（环境变量过滤）
///
/// - `RUST_LOG` 控制过滤（默认 `info`）
/// - 同时桥接 `log` 门面的记录（依赖库可能还在用 `log`）
///
/// 重复调用是安全的：第二次起静默忽略。
pub fn init_logging() {
    init_logging_with_filter("info");
}

/// 初始化日志，指定默认过滤表达式
///
/// `RUST_LOG` 存在时覆盖 `default_filter`。
pub fn init_logging_with_filter(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    // log 门面桥接：失败说明已经初始化过
    let _ = tracing_log::LogTracer::init();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
