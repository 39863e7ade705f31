//! 后台流送线程
//!
//! 把 [`AnimationStreamer`] 放进一个专用线程，按配置的 tick 周期
//! 驱动 `update()`。宿主通过 [`StreamerHandle`] 下发控制命令
//! （crossbeam 通道），读取状态快照（arc-swap，无锁）。
//!
//! tick 节奏用 `spin_sleep` 维持：`thread::sleep` 的毫秒级误差对
//! 33ms 周期来说太粗。

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::{debug, error, info, trace, warn};

use crate::error::StreamerError;
use crate::link::RobotLink;
use crate::metrics::StreamerMetrics;
use crate::streamer::{AnimationStreamer, EventSink, StreamEvent, Tag, TrackFlags};

/// 控制命令
#[derive(Debug, Clone)]
pub enum StreamerCommand {
    /// 播放一个片段
    Play {
        name: String,
        num_loops: u32,
        interrupt_running: bool,
    },
    /// 中止当前播放
    Stop,
    /// 设置/清除空闲动画
    SetIdle(Option<String>),
    /// 锁定轨道
    LockTracks(TrackFlags),
    /// 解锁轨道
    UnlockTracks(TrackFlags),
    /// 退出后台线程
    Shutdown,
}

/// 状态快照（每 tick 发布一次）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamerStatus {
    /// 当前片段名（含空闲动画）
    pub playing: Option<String>,
    /// 当前播放 tag
    pub tag: Tag,
    /// 是否在播空闲动画
    pub is_idling: bool,
    /// 已完成的循环数
    pub loop_ctr: u32,
    /// 当前播放的流送时间（毫秒）
    pub streaming_time_ms: u32,
}

/// 后台线程句柄
///
/// 丢弃句柄不会停线程；要干净退出用 [`shutdown`](Self::shutdown)。
pub struct StreamerHandle {
    cmd_tx: Sender<StreamerCommand>,
    status: Arc<ArcSwap<StreamerStatus>>,
    metrics: Arc<StreamerMetrics>,
    event_sink: EventSink,
    join: Option<JoinHandle<()>>,
}

impl StreamerHandle {
    /// 播放一个片段（命令入队，tag 之后从 [`status`](Self::status) 读）
    pub fn play(
        &self,
        name: impl Into<String>,
        num_loops: u32,
        interrupt_running: bool,
    ) -> Result<(), StreamerError> {
        self.send(StreamerCommand::Play {
            name: name.into(),
            num_loops,
            interrupt_running,
        })
    }

    /// 中止当前播放
    pub fn stop(&self) -> Result<(), StreamerError> {
        self.send(StreamerCommand::Stop)
    }

    /// 设置/清除空闲动画
    pub fn set_idle(&self, name: Option<String>) -> Result<(), StreamerError> {
        self.send(StreamerCommand::SetIdle(name))
    }

    /// 锁定轨道
    pub fn lock_tracks(&self, tracks: TrackFlags) -> Result<(), StreamerError> {
        self.send(StreamerCommand::LockTracks(tracks))
    }

    /// 解锁轨道
    pub fn unlock_tracks(&self, tracks: TrackFlags) -> Result<(), StreamerError> {
        self.send(StreamerCommand::UnlockTracks(tracks))
    }

    fn send(&self, cmd: StreamerCommand) -> Result<(), StreamerError> {
        self.cmd_tx.send(cmd).map_err(|_| StreamerError::ChannelClosed)
    }

    /// 最近一次发布的状态快照
    pub fn status(&self) -> Arc<StreamerStatus> {
        self.status.load_full()
    }

    /// 指标计数器（与后台线程共享）
    pub fn metrics(&self) -> Arc<StreamerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// 替换事件回调（线程安全，随时可调）
    pub fn set_event_sink(&self, sink: impl FnMut(&StreamEvent) + Send + 'static) {
        *self.event_sink.lock() = Some(Box::new(sink));
    }

    /// 请求退出并等待线程结束
    pub fn shutdown(mut self) {
        // 线程可能已经因链路致命错误退出，发送失败照样 join
        let _ = self.cmd_tx.send(StreamerCommand::Shutdown);
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            error!("Streamer thread panicked");
        }
    }
}

/// 启动后台流送线程
pub fn spawn(
    streamer: AnimationStreamer,
    link: impl RobotLink + Send + 'static,
) -> StreamerHandle {
    let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
    let status = Arc::new(ArcSwap::from_pointee(StreamerStatus::default()));
    let metrics = streamer.metrics();
    let event_sink = streamer.event_sink();

    let status_clone = Arc::clone(&status);
    let join = std::thread::Builder::new()
        .name("robin-streamer".to_string())
        .spawn(move || run_loop(streamer, link, cmd_rx, status_clone))
        .expect("failed to spawn streamer thread");

    StreamerHandle {
        cmd_tx,
        status,
        metrics,
        event_sink,
        join: Some(join),
    }
}

/// 流送线程主循环
fn run_loop(
    mut streamer: AnimationStreamer,
    mut link: impl RobotLink,
    cmd_rx: Receiver<StreamerCommand>,
    status: Arc<ArcSwap<StreamerStatus>>,
) {
    // 设置线程优先级（可选 feature）
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => info!("Streamer thread priority set to MAX (realtime)"),
            Err(e) => warn!(
                "Failed to set streamer thread priority: {}. \
                On Linux, you may need CAP_SYS_NICE or rtkit.",
                e
            ),
        }
    }

    let tick = Duration::from_millis(streamer.config().tick_interval_ms);
    info!(tick_ms = tick.as_millis() as u64, "Streamer thread started");

    loop {
        let tick_start = Instant::now();

        // 1. 非阻塞地吃掉所有排队的控制命令
        let mut shutdown = false;
        loop {
            match cmd_rx.try_recv() {
                Ok(cmd) => {
                    if handle_command(&mut streamer, cmd) {
                        shutdown = true;
                        break;
                    }
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // 所有句柄都丢了，没人再能控制我们
                    debug!("Control channel disconnected, shutting down");
                    shutdown = true;
                    break;
                },
            }
        }
        if shutdown {
            break;
        }

        // 2. 推进一个 tick（链路错误不致命：下个 tick 重试）
        if let Err(e) = streamer.update(&mut link) {
            error!("Streamer tick failed: {}", e);
        }

        // 3. 发布状态快照
        status.store(Arc::new(StreamerStatus {
            playing: streamer.streaming_clip().map(String::from),
            tag: streamer.current_tag(),
            is_idling: streamer.is_idling(),
            loop_ctr: streamer.loop_count(),
            streaming_time_ms: streamer.streaming_time_ms(),
        }));

        // 4. 睡到下个 tick 边界
        let elapsed = tick_start.elapsed();
        if elapsed < tick {
            spin_sleep::sleep(tick - elapsed);
        } else {
            trace!(over_ms = (elapsed - tick).as_millis() as u64, "Tick overran");
        }
    }

    info!("Streamer thread exited");
}

/// 处理一条控制命令，返回是否要求退出
fn handle_command(streamer: &mut AnimationStreamer, cmd: StreamerCommand) -> bool {
    match cmd {
        StreamerCommand::Play {
            name,
            num_loops,
            interrupt_running,
        } => {
            if let Err(e) = streamer.play(&name, num_loops, interrupt_running) {
                warn!(clip = %name, "Play command failed: {}", e);
            }
        },
        StreamerCommand::Stop => streamer.stop(),
        StreamerCommand::SetIdle(name) => {
            if let Err(e) = streamer.set_idle(name.as_deref()) {
                warn!("SetIdle command failed: {}", e);
            }
        },
        StreamerCommand::LockTracks(tracks) => streamer.lock_tracks(tracks),
        StreamerCommand::UnlockTracks(tracks) => streamer.unlock_tracks(tracks),
        StreamerCommand::Shutdown => return true,
    }
    false
}
