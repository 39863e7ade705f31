//! 机器人音频库
//!
//! 音频关键帧按名字引用单声道 PCM 片段（i16 @ 24kHz）。流送端不
//! 关心整段音频，只按帧取：每帧恰好 [`AUDIO_SAMPLES_PER_FRAME`]
//! 个采样点，末帧不足时补零。

use std::collections::HashMap;

use smallvec::SmallVec;

use robin_protocol::constants::AUDIO_SAMPLES_PER_FRAME;

use crate::error::AnimError;

/// 一段单声道 PCM 音频
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    samples: Vec<i16>,
}

impl AudioClip {
    pub fn from_samples(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    /// 从小端 i16 原始字节构造（`.pcm` 资产文件格式）
    ///
    /// 末尾的奇数字节被丢弃。
    pub fn from_pcm_le_bytes(bytes: &[u8]) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self { samples }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// 整段音频占用的帧数（末帧补零）
    pub fn frame_count(&self) -> usize {
        self.samples.len().div_ceil(AUDIO_SAMPLES_PER_FRAME)
    }

    /// 取第 `index` 帧，施加音量系数
    ///
    /// 越过末帧返回 `None`；末帧不足一帧的部分补零。
    pub fn frame(&self, index: usize, volume: f32) -> Option<Box<[i16; AUDIO_SAMPLES_PER_FRAME]>> {
        let start = index.checked_mul(AUDIO_SAMPLES_PER_FRAME)?;
        if start >= self.samples.len() {
            return None;
        }
        let volume = volume.clamp(0.0, 1.0);
        let mut frame = Box::new([0i16; AUDIO_SAMPLES_PER_FRAME]);
        let end = (start + AUDIO_SAMPLES_PER_FRAME).min(self.samples.len());
        for (dst, &src) in frame.iter_mut().zip(&self.samples[start..end]) {
            *dst = (src as f32 * volume) as i16;
        }
        Some(frame)
    }
}

/// 命名音频库
#[derive(Debug, Default)]
pub struct AudioLibrary {
    clips: HashMap<String, AudioClip>,
}

impl AudioLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, clip: AudioClip) {
        self.clips.insert(name.into(), clip);
    }

    pub fn get(&self, name: &str) -> Result<&AudioClip, AnimError> {
        self.clips
            .get(name)
            .ok_or_else(|| AnimError::UnknownAudio(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// 已注册的片段名（排序后返回，便于展示）
    pub fn names(&self) -> SmallVec<[&str; 16]> {
        let mut names: SmallVec<[&str; 16]> = self.clips.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_chunking() {
        // 两帧半的采样
        let clip = AudioClip::from_samples(vec![100i16; AUDIO_SAMPLES_PER_FRAME * 2 + 10]);
        assert_eq!(clip.frame_count(), 3);

        let full = clip.frame(0, 1.0).unwrap();
        assert!(full.iter().all(|&s| s == 100));

        // 末帧补零
        let tail = clip.frame(2, 1.0).unwrap();
        assert!(tail[..10].iter().all(|&s| s == 100));
        assert!(tail[10..].iter().all(|&s| s == 0));

        assert!(clip.frame(3, 1.0).is_none());
    }

    #[test]
    fn test_volume_scaling() {
        let clip = AudioClip::from_samples(vec![1000i16; AUDIO_SAMPLES_PER_FRAME]);
        let half = clip.frame(0, 0.5).unwrap();
        assert_eq!(half[0], 500);

        // 音量超出 [0,1] 被钳制
        let loud = clip.frame(0, 2.0).unwrap();
        assert_eq!(loud[0], 1000);
    }

    #[test]
    fn test_empty_clip_has_no_frames() {
        let clip = AudioClip::from_samples(Vec::new());
        assert_eq!(clip.frame_count(), 0);
        assert!(clip.frame(0, 1.0).is_none());
    }

    #[test]
    fn test_from_pcm_le_bytes() {
        let clip = AudioClip::from_pcm_le_bytes(&[0x01, 0x00, 0xFF, 0xFF, 0x7B]);
        assert_eq!(clip.sample_count(), 2); // 奇数尾字节丢弃
        let frame = clip.frame(0, 1.0).unwrap();
        assert_eq!(frame[0], 1);
        assert_eq!(frame[1], -1);
    }

    #[test]
    fn test_library_lookup() {
        let mut library = AudioLibrary::new();
        library.insert("chirp", AudioClip::from_samples(vec![0; 16]));
        assert!(library.get("chirp").is_ok());
        assert!(matches!(
            library.get("boom"),
            Err(AnimError::UnknownAudio(_))
        ));
        assert_eq!(library.names().as_slice(), ["chirp"]);
    }
}
