//! 动画流送器
//!
//! 把一个动画片段的关键帧按时间推进、在流控预算内发往机器人。
//!
//! # 时钟模型
//!
//! 音频帧是时钟载体：内层缓冲循环每迭代一次，先放一帧音频（真实
//! 采样或静音），流送时间前进 [`SAMPLE_LENGTH_MS`] 毫秒，然后把
//! 所有到期的其他轨道关键帧与这帧音频同批发出。机器人按音频节拍
//! 消费，两端时钟自然对齐，不需要额外的同步协议。
//!
//! # 播放状态机
//!
//! - `play()` 开始一个片段，分配非保留 tag，循环 `num_loops` 次
//!   （0 = 无限循环）；
//! - 正在播放时再次 `play()`：`interrupt_running = false` 直接拒绝，
//!   `true` 则中止当前片段再开新的；
//! - 没有片段在播时退回空闲动画（tag 固定为 [`IDLE_ANIMATION_TAG`]），
//!   无限循环直至有新片段进来。

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, error, info, trace, warn};

use robin_anim::{
    Animation, AnimationContainer, AudioLibrary, FaceImageMap, KeyFrame, ProceduralFace,
    ProceduralFaceKeyFrame, Track,
};
use robin_protocol::EngineToRobot;
use robin_protocol::constants::SAMPLE_LENGTH_MS;

use crate::config::StreamerConfig;
use crate::error::StreamerError;
use crate::flow::FlowControl;
use crate::link::RobotLink;
use crate::metrics::StreamerMetrics;

/// 播放 tag
///
/// 机器人用它区分"现在在播哪一次播放"。
pub type Tag = u8;

/// 保留值：没有动画在播
pub const NOT_ANIMATING_TAG: Tag = 0;

/// 保留值：空闲动画
pub const IDLE_ANIMATION_TAG: Tag = 1;

/// 轨道位掩码
///
/// 被锁定的轨道照常推进游标但不产生链路消息：动画按原时长走完，
/// 只是对应的执行器保持不动（行为层借此保护正在被其他组件占用的
/// 自由度）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackFlags(u8);

impl TrackFlags {
    pub const NONE: TrackFlags = TrackFlags(0);
    pub const HEAD: TrackFlags = TrackFlags(1 << 0);
    pub const LIFT: TrackFlags = TrackFlags(1 << 1);
    pub const BODY: TrackFlags = TrackFlags(1 << 2);
    pub const LIGHTS: TrackFlags = TrackFlags(1 << 3);
    pub const FACE: TrackFlags = TrackFlags(1 << 4);
    pub const AUDIO: TrackFlags = TrackFlags(1 << 5);
    pub const EVENT: TrackFlags = TrackFlags(1 << 6);
    pub const ALL: TrackFlags = TrackFlags(0x7F);

    pub fn contains(self, other: TrackFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: TrackFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: TrackFlags) {
        self.0 &= !other.0;
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for TrackFlags {
    type Output = TrackFlags;

    fn bitor(self, rhs: TrackFlags) -> TrackFlags {
        TrackFlags(self.0 | rhs.0)
    }
}

/// 事件关键帧触发时回调给宿主的载荷
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    /// 所属片段名
    pub clip: String,
    /// 播放 tag
    pub tag: Tag,
    /// 事件 ID（资产里定义的字符串）
    pub event_id: String,
}

/// 事件回调插槽
///
/// 用 `Arc<Mutex<…>>` 包一层：后台线程持有流送器本体时，宿主仍可
/// 通过句柄随时替换回调。
pub type EventSink = Arc<Mutex<Option<Box<dyn FnMut(&StreamEvent) + Send>>>>;

/// 一次进行中的播放
///
/// 持有片段的克隆：游标推进不污染容器里的原始数据，循环重播只需
/// 重置克隆上的游标。
#[derive(Debug)]
struct ActivePlayback {
    anim: Animation,
    tag: Tag,
    /// 请求的循环次数（0 = 无限）
    num_loops: u32,
    loop_ctr: u32,
    is_idle: bool,
}

/// 音频片段流出进度
#[derive(Debug, Clone)]
struct AudioCursor {
    clip: String,
    frame_index: usize,
    volume: f32,
}

/// 动画流送器
///
/// 单线程状态机：每个 tick 调用一次 [`update`](Self::update)。
/// 后台线程驱动见 [`runner`](crate::runner)。
pub struct AnimationStreamer {
    container: AnimationContainer,
    audio_library: AudioLibrary,
    face_images: FaceImageMap,
    config: StreamerConfig,
    metrics: Arc<StreamerMetrics>,
    event_sink: EventSink,

    active: Option<ActivePlayback>,
    idle_clip: Option<String>,
    tag_ctr: Tag,
    locked_tracks: TrackFlags,

    send_buffer: VecDeque<EngineToRobot>,
    flow: FlowControl,
    streaming_time_ms: u32,
    start_of_animation_sent: bool,
    end_of_animation_sent: bool,
    audio_cursor: Option<AudioCursor>,
}

impl AnimationStreamer {
    /// 用已加载的容器创建流送器
    pub fn new(container: AnimationContainer) -> Self {
        Self {
            container,
            audio_library: AudioLibrary::new(),
            face_images: FaceImageMap::new(),
            config: StreamerConfig::default(),
            metrics: Arc::new(StreamerMetrics::new()),
            event_sink: Arc::new(Mutex::new(None)),
            active: None,
            idle_clip: None,
            tag_ctr: IDLE_ANIMATION_TAG,
            locked_tracks: TrackFlags::NONE,
            send_buffer: VecDeque::new(),
            flow: FlowControl::new(),
            streaming_time_ms: 0,
            start_of_animation_sent: false,
            end_of_animation_sent: false,
            audio_cursor: None,
        }
    }

    /// 挂上音频库（链式）
    pub fn with_audio_library(mut self, library: AudioLibrary) -> Self {
        self.audio_library = library;
        self
    }

    /// 挂上面部图像表（链式）
    pub fn with_face_images(mut self, images: FaceImageMap) -> Self {
        self.face_images = images;
        self
    }

    /// 使用自定义配置（链式）
    pub fn with_config(mut self, config: StreamerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn container(&self) -> &AnimationContainer {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut AnimationContainer {
        &mut self.container
    }

    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<StreamerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// 事件回调插槽（可克隆给其他线程持有）
    pub fn event_sink(&self) -> EventSink {
        Arc::clone(&self.event_sink)
    }

    /// 设置事件回调
    pub fn set_event_sink(&self, sink: impl FnMut(&StreamEvent) + Send + 'static) {
        *self.event_sink.lock() = Some(Box::new(sink));
    }

    // ==================== 播放控制 ====================

    /// 开始流送一个片段
    ///
    /// - `num_loops`：循环次数，0 表示无限循环
    /// - `interrupt_running`：正在播其他片段时是否允许打断
    ///
    /// 返回分配的播放 tag。被正在播放的片段拒绝时返回
    /// [`NOT_ANIMATING_TAG`]（不视为错误，与调用方的竞态是常态）。
    pub fn play(
        &mut self,
        name: &str,
        num_loops: u32,
        interrupt_running: bool,
    ) -> Result<Tag, StreamerError> {
        // 先校验，失败不得改动任何状态
        let anim = self.container.get(name)?.clone();

        match &self.active {
            Some(active) if !active.is_idle => {
                if !interrupt_running {
                    info!(
                        current = %active.anim.name(),
                        requested = name,
                        "Already streaming, will not interrupt"
                    );
                    return Ok(NOT_ANIMATING_TAG);
                }
                warn!(
                    interrupted = %active.anim.name(),
                    by = name,
                    "Animation is interrupting current playback"
                );
                self.abort_current();
            },
            Some(_) => {
                // 空闲动画让位不需要 abort：已入队的帧播完即止
                debug!("Idle animation yielding to '{}'", name);
                self.active = None;
            },
            None => {},
        }

        let tag = self.next_tag();
        info!(clip = name, loops = num_loops, tag, "Starting animation stream");

        let mut anim = anim;
        anim.init();
        self.begin_playback(ActivePlayback {
            anim,
            tag,
            num_loops,
            loop_ctr: 0,
            is_idle: false,
        });
        Ok(tag)
    }

    /// 中止当前播放（空闲动画会在下个 tick 恢复）
    pub fn stop(&mut self) {
        if let Some(active) = &self.active {
            info!(clip = %active.anim.name(), tag = active.tag, "Stopping animation stream");
            self.abort_current();
        }
    }

    /// 设置空闲动画
    ///
    /// `None` 关闭空闲兜底。更换空闲片段会强制重新初始化。
    pub fn set_idle(&mut self, name: Option<&str>) -> Result<(), StreamerError> {
        match name {
            Some(n) => {
                // 校验存在性，不存在时保持原状
                self.container.get(n)?;
                if self.idle_clip.as_deref() != Some(n) {
                    info!(clip = n, "Setting idle animation");
                    self.idle_clip = Some(n.to_string());
                    if self.active.as_ref().is_some_and(|a| a.is_idle) {
                        self.active = None;
                    }
                }
            },
            None => {
                if self.idle_clip.take().is_some() {
                    info!("Disabling idle animation");
                }
                if self.active.as_ref().is_some_and(|a| a.is_idle) {
                    self.abort_current();
                }
            },
        }
        Ok(())
    }

    pub fn idle_animation_name(&self) -> Option<&str> {
        self.idle_clip.as_deref()
    }

    /// 锁定若干轨道（见 [`TrackFlags`]）
    pub fn lock_tracks(&mut self, tracks: TrackFlags) {
        self.locked_tracks.insert(tracks);
        debug!("Tracks locked, mask = {:07b}", self.locked_tracks.bits());
    }

    /// 解锁若干轨道
    pub fn unlock_tracks(&mut self, tracks: TrackFlags) {
        self.locked_tracks.remove(tracks);
        debug!("Tracks unlocked, mask = {:07b}", self.locked_tracks.bits());
    }

    pub fn locked_tracks(&self) -> TrackFlags {
        self.locked_tracks
    }

    // ==================== 状态查询 ====================

    /// 正在流送非空闲片段
    pub fn is_streaming(&self) -> bool {
        self.active.as_ref().is_some_and(|a| !a.is_idle)
    }

    /// 正在流送空闲片段
    pub fn is_idling(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.is_idle)
    }

    /// 当前播放 tag（没在播返回 [`NOT_ANIMATING_TAG`]）
    pub fn current_tag(&self) -> Tag {
        self.active.as_ref().map_or(NOT_ANIMATING_TAG, |a| a.tag)
    }

    /// 当前片段名
    pub fn streaming_clip(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.anim.name())
    }

    /// 已完成的循环数
    pub fn loop_count(&self) -> u32 {
        self.active.as_ref().map_or(0, |a| a.loop_ctr)
    }

    /// 当前播放的流送时间（相对片段起点，毫秒）
    pub fn streaming_time_ms(&self) -> u32 {
        self.streaming_time_ms
    }

    // ==================== tick 主循环 ====================

    /// 推进一个引擎 tick
    ///
    /// 依次：合并机器人反馈 → 重算流控预算 → 补发上个 tick 欠下的
    /// 消息 → 播放状态机（循环/结束/空闲兜底）→ 流送当前片段。
    pub fn update(&mut self, link: &mut dyn RobotLink) -> Result<(), StreamerError> {
        self.metrics.ticks.fetch_add(1, Ordering::Relaxed);

        self.drain_feedback(link)?;
        self.flow.begin_tick(&self.config);

        // 上个 tick 预算用尽时欠下的消息优先出门
        self.flush(link)?;

        self.advance_playback_state();

        // 空闲兜底
        if self.active.is_none()
            && let Some(idle_name) = self.idle_clip.clone()
        {
            match self.container.get(&idle_name) {
                Ok(anim) => {
                    debug!(clip = %idle_name, "(Re-)initializing idle animation");
                    let mut anim = anim.clone();
                    anim.init();
                    self.begin_playback(ActivePlayback {
                        anim,
                        tag: IDLE_ANIMATION_TAG,
                        num_loops: 0,
                        loop_ctr: 0,
                        is_idle: true,
                    });
                },
                Err(e) => {
                    // 容器被热替换后空闲片段可能消失，降级为不播
                    warn!(clip = %idle_name, "Idle animation vanished from container: {}", e);
                    self.idle_clip = None;
                },
            }
        }

        if self.active.is_some() {
            self.update_stream(link)?;
        }

        Ok(())
    }

    /// 播放状态机：结束检测、循环计数、空闲重置
    fn advance_playback_state(&mut self) {
        let Some(active) = &self.active else { return };

        if active.is_idle {
            // 空闲片段被换掉 → 废弃重建；播完 → 无限重播
            let still_selected = self.idle_clip.as_deref() == Some(active.anim.name());
            if !still_selected {
                self.active = None;
            } else if self.is_playback_finished() {
                let mut pb = self.active.take().expect("checked above");
                pb.loop_ctr = pb.loop_ctr.wrapping_add(1);
                pb.anim.init();
                self.begin_playback(pb);
            }
            return;
        }

        if self.is_playback_finished() {
            let mut pb = self.active.take().expect("checked above");
            pb.loop_ctr += 1;
            self.metrics.loops_completed.fetch_add(1, Ordering::Relaxed);

            if pb.num_loops == 0 || pb.loop_ctr < pb.num_loops {
                debug!(
                    clip = %pb.anim.name(),
                    loop_ctr = pb.loop_ctr,
                    num_loops = pb.num_loops,
                    "Finished loop, restarting"
                );
                pb.anim.init();
                self.begin_playback(pb);
            } else {
                info!(clip = %pb.anim.name(), tag = pb.tag, "Finished streaming animation");
                self.metrics.playbacks_finished.fetch_add(1, Ordering::Relaxed);
                // pb 丢弃，下个分支落入空闲兜底
            }
        }
    }

    /// 当前播放是否已完整结束
    ///
    /// 结束 = 结束标记已发出 且 所有轨道流完 且 音频流完 且 发送
    /// 缓冲排空。
    fn is_playback_finished(&self) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        self.end_of_animation_sent
            && !active.anim.has_frames_left()
            && self.audio_cursor.is_none()
            && self.send_buffer.is_empty()
    }

    fn begin_playback(&mut self, pb: ActivePlayback) {
        // 理论上此时只可能残留 abort 消息；别的都是上一个播放漏掉的
        let stale = self
            .send_buffer
            .iter()
            .filter(|m| !matches!(m, EngineToRobot::AbortAnimation))
            .count();
        if stale > 0 {
            warn!(stale, "Send buffer not empty at stream init, dropping stale frames");
            self.send_buffer.retain(|m| matches!(m, EngineToRobot::AbortAnimation));
        }

        self.streaming_time_ms = 0;
        // 空片段不需要结束标记（也没有开始标记）
        self.end_of_animation_sent = pb.anim.is_empty();
        self.start_of_animation_sent = false;
        self.audio_cursor = None;
        self.active = Some(pb);
    }

    /// 中止当前播放：清掉没发出去的帧，排一条 abort 给机器人
    fn abort_current(&mut self) {
        if self.active.take().is_some() {
            self.send_buffer.clear();
            self.send_buffer.push_back(EngineToRobot::AbortAnimation);
            self.audio_cursor = None;
            self.start_of_animation_sent = false;
            self.end_of_animation_sent = false;
            self.metrics.aborts.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn next_tag(&mut self) -> Tag {
        // 跳过保留值；u8 回绕在长寿命进程里是常态
        loop {
            self.tag_ctr = self.tag_ctr.wrapping_add(1);
            if self.tag_ctr != NOT_ANIMATING_TAG && self.tag_ctr != IDLE_ANIMATION_TAG {
                return self.tag_ctr;
            }
        }
    }

    // ==================== 流送内核 ====================

    fn update_stream(&mut self, link: &mut dyn RobotLink) -> Result<(), StreamerError> {
        // 把播放体临时拿出来，让借用检查器放行对 self 其余字段的访问
        let Some(mut pb) = self.active.take() else {
            return Ok(());
        };
        let result = self.stream_playback(&mut pb, link);
        self.active = Some(pb);
        result
    }

    fn stream_playback(
        &mut self,
        pb: &mut ActivePlayback,
        link: &mut dyn RobotLink,
    ) -> Result<(), StreamerError> {
        // 内层缓冲循环：一次迭代 = 一帧音频时长。发送缓冲非空说明
        // 预算用尽，本 tick 到此为止。
        while self.send_buffer.is_empty()
            && (pb.anim.has_frames_left() || self.audio_cursor.is_some())
        {
            let t = self.streaming_time_ms;

            // 音频帧必须最先入队：它是时钟载体
            self.buffer_audio_frame(pb, t);

            // 开始标记紧跟第一帧音频之后，与机器人侧解析顺序一致
            if !self.start_of_animation_sent {
                trace!(tag = pb.tag, "Buffering start-of-animation");
                self.send_buffer.push_back(EngineToRobot::StartOfAnimation { tag: pb.tag });
                self.start_of_animation_sent = true;
                self.end_of_animation_sent = false;
            }

            self.buffer_due_keyframes(pb, t);

            self.metrics.note_send_buffer_depth(self.send_buffer.len());
            self.flush(link)?;

            self.streaming_time_ms += SAMPLE_LENGTH_MS;
        }

        // 所有内容流完之后补一个结束标记（它也占一帧音频预算）
        if !pb.anim.has_frames_left()
            && self.audio_cursor.is_none()
            && self.send_buffer.is_empty()
            && self.start_of_animation_sent
            && !self.end_of_animation_sent
        {
            let end = EngineToRobot::EndOfAnimation;
            if self.flow.can_send(&end) {
                trace!(
                    tag = pb.tag,
                    t = self.streaming_time_ms,
                    "Streaming end-of-animation"
                );
                self.send_message(link, &end)?;
                self.end_of_animation_sent = true;
                self.start_of_animation_sent = false;
            }
            // 预算不够就等下个 tick 再发
        }

        Ok(())
    }

    /// 入队一帧音频（真实采样或静音）
    fn buffer_audio_frame(&mut self, pb: &mut ActivePlayback, t: u32) {
        // 到期的音频关键帧开启一个新的采样游标
        if self.audio_cursor.is_none()
            && pb.anim.audio.current().is_some_and(|kf| kf.is_time_to_play(t))
        {
            let kf = pb.anim.audio.current().expect("checked above").clone();
            pb.anim.audio.advance();

            if self.locked_tracks.contains(TrackFlags::AUDIO) {
                trace!(clip = %kf.audio_name, "Audio track locked, skipping clip");
            } else if !kf.roll_probability() {
                debug!(clip = %kf.audio_name, probability = kf.probability, "Audio keyframe lost probability roll");
            } else if self.audio_library.contains(&kf.audio_name) {
                self.audio_cursor = Some(AudioCursor {
                    clip: kf.audio_name,
                    frame_index: 0,
                    volume: kf.volume,
                });
            } else {
                warn!(clip = %kf.audio_name, "Unknown audio clip, streaming silence instead");
            }
        }

        // 游标有料放采样帧，否则放静音帧
        let frame = match &mut self.audio_cursor {
            Some(cursor) => {
                let frame = self
                    .audio_library
                    .get(&cursor.clip)
                    .ok()
                    .and_then(|clip| clip.frame(cursor.frame_index, cursor.volume));
                if frame.is_some() {
                    cursor.frame_index += 1;
                }
                frame
            },
            None => None,
        };

        let msg = match frame {
            Some(samples) => EngineToRobot::AudioSample { samples },
            None => {
                self.audio_cursor = None;
                EngineToRobot::AudioSilence
            },
        };
        self.send_buffer.push_back(msg);
    }

    /// 入队所有到期的非音频关键帧
    ///
    /// 锁定的轨道照常消费游标，只是不产生消息。
    fn buffer_due_keyframes(&mut self, pb: &mut ActivePlayback, t: u32) {
        let locked = self.locked_tracks;
        let mut batch: SmallVec<[EngineToRobot; 6]> = SmallVec::new();

        if let Some(kf) = pb.anim.head.take_if_due(t)
            && !locked.contains(TrackFlags::HEAD)
        {
            trace!(t, "Streaming HeadAngle keyframe");
            batch.push(kf.stream_message());
        }

        if let Some(kf) = pb.anim.lift.take_if_due(t)
            && !locked.contains(TrackFlags::LIFT)
        {
            trace!(t, "Streaming LiftHeight keyframe");
            batch.push(kf.stream_message());
        }

        if let Some(kf) = pb.anim.body.take_if_due(t)
            && !locked.contains(TrackFlags::BODY)
        {
            trace!(t, "Streaming BodyMotion keyframe");
            batch.push(kf.stream_message());
        }

        if let Some(kf) = pb.anim.lights.take_if_due(t)
            && !locked.contains(TrackFlags::LIGHTS)
        {
            trace!(t, "Streaming BackpackLights keyframe");
            batch.push(kf.stream_message());
        }

        if let Some(kf) = pb.anim.face_images.take_if_due(t)
            && !locked.contains(TrackFlags::FACE)
        {
            match self.face_images.get(&kf.image_name) {
                Ok(bitmap) => {
                    trace!(t, image = %kf.image_name, "Streaming FaceImage keyframe");
                    batch.push(EngineToRobot::FaceImage { rle: bitmap.to_rle() });
                },
                Err(_) => {
                    warn!(image = %kf.image_name, "Unknown face image, skipping keyframe");
                },
            }
        }

        if let Some(face) = Self::due_procedural_face(&mut pb.anim.faces, t)
            && !locked.contains(TrackFlags::FACE)
        {
            batch.push(EngineToRobot::FaceImage {
                rle: face.draw().to_rle(),
            });
        }

        let clip_name = pb.anim.name().to_string();
        if let Some(kf) = pb.anim.events.take_if_due(t)
            && !locked.contains(TrackFlags::EVENT)
        {
            let event = StreamEvent {
                clip: clip_name,
                tag: pb.tag,
                event_id: kf.event_id.clone(),
            };
            debug!(event = %event.event_id, t, "Emitting animation event");
            self.metrics.events_emitted.fetch_add(1, Ordering::Relaxed);
            if let Some(sink) = self.event_sink.lock().as_mut() {
                sink(&event);
            }
        }

        for msg in batch {
            self.send_buffer.push_back(msg);
        }
    }

    /// 程序化面部：向下一帧插值，返回本 tick 应显示的面部
    ///
    /// 游标推进规则沿用制作工具约定：下一帧将在一个采样周期内到期
    /// 时才切换到它，保证插值覆盖整个区间而不会提前跳变。
    fn due_procedural_face(
        track: &mut Track<ProceduralFaceKeyFrame>,
        t: u32,
    ) -> Option<ProceduralFace> {
        let current = *track.current()?;
        if !current.is_time_to_play(t) {
            return None;
        }

        match track.peek_next().copied() {
            Some(next) if next.is_time_to_play(t) => {
                // 两帧同时到期说明资产时间轴有问题
                warn!(
                    current_ms = current.trigger_time_ms,
                    next_ms = next.trigger_time_ms,
                    t,
                    "Procedural face frames too close together"
                );
                track.advance();
                None
            },
            Some(next) => {
                let face = current.interpolated_face(&next, t);
                if next.is_time_to_play(t + SAMPLE_LENGTH_MS) {
                    track.advance();
                }
                Some(face)
            },
            None => {
                // 没有可插值的后继帧：原样输出并前进
                track.advance();
                Some(current.face)
            },
        }
    }

    // ==================== 发送路径 ====================

    /// 合并机器人反馈
    fn drain_feedback(&mut self, link: &mut dyn RobotLink) -> Result<(), StreamerError> {
        while let Some(msg) = link.try_receive()? {
            match msg {
                robin_protocol::RobotToEngine::BufferStatus(status) => {
                    trace!(
                        bytes_played = status.bytes_played,
                        frames_played = status.audio_frames_played,
                        robot_tag = status.current_tag,
                        "Buffer status feedback"
                    );
                    self.flow.note_feedback(&status);
                },
            }
        }
        Ok(())
    }

    /// 在预算内尽量清空发送缓冲
    ///
    /// 消息不跨 tick 拆分：front 发不动就整体等下个 tick。
    fn flush(&mut self, link: &mut dyn RobotLink) -> Result<(), StreamerError> {
        while let Some(msg) = self.send_buffer.front() {
            if !self.flow.can_send(msg) {
                trace!(
                    pending = self.send_buffer.len(),
                    "Flow budget exhausted, deferring to next tick"
                );
                return Ok(());
            }
            let msg = self.send_buffer.pop_front().expect("front checked above");
            self.send_message(link, &msg)?;
        }
        Ok(())
    }

    fn send_message(
        &mut self,
        link: &mut dyn RobotLink,
        msg: &EngineToRobot,
    ) -> Result<(), StreamerError> {
        if let Err(e) = link.send(msg) {
            self.metrics.link_errors.fetch_add(1, Ordering::Relaxed);
            error!("Failed to send animation frame: {}", e);
            return Err(e.into());
        }

        self.flow.note_sent(msg);
        self.metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.metrics.bytes_sent.fetch_add(msg.wire_size() as u64, Ordering::Relaxed);
        match msg {
            EngineToRobot::AudioSample { .. } => {
                self.metrics.audio_frames_sent.fetch_add(1, Ordering::Relaxed);
            },
            EngineToRobot::AudioSilence => {
                self.metrics.silence_frames_sent.fetch_add(1, Ordering::Relaxed);
            },
            _ => {},
        }
        Ok(())
    }
}
