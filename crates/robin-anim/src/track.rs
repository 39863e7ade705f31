//! 关键帧轨道
//!
//! `Track<K>` 是一条按触发时间排序的关键帧列表加一个播放游标。
//! 流送端反复问三个问题：当前帧是什么、到时间了没有、走到下一帧。

use crate::error::AnimError;
use crate::keyframe::KeyFrame;

/// 单条关键帧轨道
///
/// 游标语义：`current()` 返回尚未流出的下一帧；`advance()` 在帧
/// 流出后调用；`rewind()` 在动画（重新）开始时调用。
#[derive(Debug, Clone)]
pub struct Track<K: KeyFrame> {
    frames: Vec<K>,
    cursor: usize,
}

impl<K: KeyFrame> Default for Track<K> {
    fn default() -> Self {
        Self {
            frames: Vec::new(),
            cursor: 0,
        }
    }
}

impl<K: KeyFrame> Track<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个关键帧
    ///
    /// 触发时间必须相对上一帧非递减，乱序的资产在加载时即失败。
    pub fn add_keyframe(&mut self, frame: K, clip: &str, index: usize) -> Result<(), AnimError> {
        if let Some(last) = self.frames.last()
            && frame.trigger_time_ms() < last.trigger_time_ms()
        {
            return Err(AnimError::NonMonotonicTrigger {
                clip: clip.to_string(),
                index,
                trigger_ms: frame.trigger_time_ms(),
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    /// 当前待流出的帧
    pub fn current(&self) -> Option<&K> {
        self.frames.get(self.cursor)
    }

    /// 当前帧之后的一帧（插值用）
    pub fn peek_next(&self) -> Option<&K> {
        self.frames.get(self.cursor + 1)
    }

    /// 游标前进一帧
    pub fn advance(&mut self) {
        if self.cursor < self.frames.len() {
            self.cursor += 1;
        }
    }

    /// 游标回到起点（动画重播）
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// 还有帧没流出
    pub fn has_frames_left(&self) -> bool {
        self.cursor < self.frames.len()
    }

    /// 轨道为空（从未有帧）
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// 末帧（计算动画时长用）
    pub fn last(&self) -> Option<&K> {
        self.frames.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.frames.iter()
    }

    /// 若当前帧到了触发时间则取出并前进游标
    ///
    /// 这是流送循环的主要入口：一次调用最多消费一帧。
    pub fn take_if_due(&mut self, time_since_start_ms: u32) -> Option<&K> {
        if self
            .current()
            .is_some_and(|f| f.is_time_to_play(time_since_start_ms))
        {
            let idx = self.cursor;
            self.cursor += 1;
            self.frames.get(idx)
        } else {
            None
        }
    }
}
