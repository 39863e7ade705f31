//! 流送性能指标
//!
//! 无锁计数器，后台线程写、任意线程读。快照一次性读出，避免
//! 调用方拼出撕裂的统计。

use std::sync::atomic::{AtomicU64, Ordering};

/// 流送指标（原子计数器）
#[derive(Debug, Default)]
pub struct StreamerMetrics {
    /// update() 调用次数
    pub ticks: AtomicU64,
    /// 已发送消息总数
    pub messages_sent: AtomicU64,
    /// 已发送字节总数
    pub bytes_sent: AtomicU64,
    /// 已发送真实音频帧数
    pub audio_frames_sent: AtomicU64,
    /// 已发送静音帧数
    pub silence_frames_sent: AtomicU64,
    /// 完成的动画循环次数
    pub loops_completed: AtomicU64,
    /// 完整播放完成的动画次数
    pub playbacks_finished: AtomicU64,
    /// 中止次数
    pub aborts: AtomicU64,
    /// 发送缓冲区高水位（条数）
    pub send_buffer_high_water: AtomicU64,
    /// 事件关键帧回调次数
    pub events_emitted: AtomicU64,
    /// 链路发送失败次数
    pub link_errors: AtomicU64,
}

/// 指标快照（普通结构体）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub messages_sent: u64,
    pub bytes_sent: u64,
    pub audio_frames_sent: u64,
    pub silence_frames_sent: u64,
    pub loops_completed: u64,
    pub playbacks_finished: u64,
    pub aborts: u64,
    pub send_buffer_high_water: u64,
    pub events_emitted: u64,
    pub link_errors: u64,
}

impl StreamerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录发送缓冲区深度，保留高水位
    pub fn note_send_buffer_depth(&self, depth: usize) {
        self.send_buffer_high_water.fetch_max(depth as u64, Ordering::Relaxed);
    }

    /// 读取一致性要求不高的快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            audio_frames_sent: self.audio_frames_sent.load(Ordering::Relaxed),
            silence_frames_sent: self.silence_frames_sent.load(Ordering::Relaxed),
            loops_completed: self.loops_completed.load(Ordering::Relaxed),
            playbacks_finished: self.playbacks_finished.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
            send_buffer_high_water: self.send_buffer_high_water.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            link_errors: self.link_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reads_counters() {
        let metrics = StreamerMetrics::new();
        metrics.ticks.fetch_add(3, Ordering::Relaxed);
        metrics.bytes_sent.fetch_add(100, Ordering::Relaxed);

        let snap = metrics.snapshot();
        assert_eq!(snap.ticks, 3);
        assert_eq!(snap.bytes_sent, 100);
        assert_eq!(snap.aborts, 0);
    }

    #[test]
    fn test_high_water_keeps_max() {
        let metrics = StreamerMetrics::new();
        metrics.note_send_buffer_depth(5);
        metrics.note_send_buffer_depth(12);
        metrics.note_send_buffer_depth(3);
        assert_eq!(metrics.snapshot().send_buffer_high_water, 12);
    }
}
