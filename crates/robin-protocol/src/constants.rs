//! 协议时序与缓冲区常量
//!
//! 动画引擎与机器人共享的时间基准都定义在这里。音频帧是链路的
//! "时钟载体"：机器人每播放一帧音频（真实采样或静音帧），播放
//! 时间前进 [`SAMPLE_LENGTH_MS`] 毫秒，其余轨道的关键帧都对齐
//! 到这个节拍上。

/// 引擎 tick 周期（毫秒）
///
/// 流送循环以这个周期调用一次 `update()`。
pub const ANIM_TIME_STEP_MS: u32 = 33;

/// 单个音频帧覆盖的播放时长（毫秒）
///
/// 与 [`ANIM_TIME_STEP_MS`] 相同：每 tick 恰好消耗一帧音频的时长。
pub const SAMPLE_LENGTH_MS: u32 = 33;

/// 机器人音频采样率（Hz，单声道 i16）
pub const AUDIO_SAMPLE_RATE: u32 = 24_000;

/// 每个音频帧的采样点数
///
/// 800 点 @ 24kHz ≈ 33.3ms，与 [`SAMPLE_LENGTH_MS`] 对齐。
pub const AUDIO_SAMPLES_PER_FRAME: usize = 800;

/// 机器人侧关键帧缓冲区大小（字节）
///
/// 流控用它估算机器人还能接收多少字节：
/// `free = KEYFRAME_BUFFER_SIZE - (streamed - played)`。
pub const KEYFRAME_BUFFER_SIZE: u32 = 32 * 1024;

/// 单个 tick 允许流出的最大字节数
///
/// 可靠传输层每 2ms 最多吃下 1000 字节，折算到一个 tick 的预算。
pub const MAX_BYTES_PER_TICK: u32 = (1000 / 2) * ANIM_TIME_STEP_MS;

/// 音频帧提前量（帧数）
///
/// 大致为 (2 × 单程延迟 200ms + 一个 tick) / 音频帧时长，向上取整。
/// 机器人缓冲区里最多保持这么多帧尚未播放的音频，避免欠载又不
/// 积压过深的延迟。
pub const AUDIO_FRAMES_LEAD: u32 = (2 * 200 + ANIM_TIME_STEP_MS).div_ceil(SAMPLE_LENGTH_MS);

/// 面部屏幕宽度（像素）
pub const FACE_DISPLAY_WIDTH: usize = 128;

/// 面部屏幕高度（像素）
pub const FACE_DISPLAY_HEIGHT: usize = 64;

/// 面部帧原始大小（字节，1 bpp 按行打包）
pub const FACE_FRAME_BYTES: usize = FACE_DISPLAY_WIDTH * FACE_DISPLAY_HEIGHT / 8;

/// 背包 LED 数量（left, front, middle, back, right）
pub const BACKPACK_LED_COUNT: usize = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_frame_matches_sample_length() {
        // 800 点 @ 24kHz = 33.33ms，必须覆盖一个完整的采样节拍
        let frame_ms = AUDIO_SAMPLES_PER_FRAME as f64 * 1000.0 / AUDIO_SAMPLE_RATE as f64;
        assert!(frame_ms >= SAMPLE_LENGTH_MS as f64);
        assert!(frame_ms < SAMPLE_LENGTH_MS as f64 + 1.0);
    }

    #[test]
    fn test_audio_frames_lead() {
        // (2*200 + 33) / 33 = 13.12... → 14
        assert_eq!(AUDIO_FRAMES_LEAD, 14);
    }

    #[test]
    fn test_face_frame_bytes() {
        assert_eq!(FACE_FRAME_BYTES, 1024);
    }
}
