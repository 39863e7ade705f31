//! 面部图像 RLE 编解码
//!
//! 面部帧为 128×64 的 1 bpp 图像，按行打包为 1024 字节后做字节级
//! 行程编码：输出流是 `(count, value)` 字节对，`count >= 1`。
//! 眼睛图像大面积为 0x00，典型压缩后在 100 字节量级。
//!
//! 最坏情况（相邻字节全部不同）输出为 2 × [`FACE_FRAME_BYTES`]，
//! 仍远小于单 tick 的字节预算，因此不会卡死流控。

use crate::ProtocolError;
use crate::constants::FACE_FRAME_BYTES;

/// 压缩一帧面部图像
pub fn compress(raw: &[u8; FACE_FRAME_BYTES]) -> Vec<u8> {
    let mut out = Vec::with_capacity(128);
    let mut iter = raw.iter();
    let mut run_value = *iter.next().unwrap(); // FACE_FRAME_BYTES > 0
    let mut run_len: u8 = 1;

    for &byte in iter {
        if byte == run_value && run_len < u8::MAX {
            run_len += 1;
        } else {
            out.push(run_len);
            out.push(run_value);
            run_value = byte;
            run_len = 1;
        }
    }
    out.push(run_len);
    out.push(run_value);
    out
}

/// 解压一帧面部图像
///
/// # Errors
///
/// - 输入长度不是字节对 → `InvalidLength`
/// - 行程总和不等于一帧大小 → `RleOverrun` / `InvalidLength`
pub fn decompress(rle: &[u8]) -> Result<[u8; FACE_FRAME_BYTES], ProtocolError> {
    if rle.is_empty() || rle.len() % 2 != 0 {
        return Err(ProtocolError::InvalidLength {
            expected: rle.len() + 1,
            actual: rle.len(),
        });
    }

    let mut out = [0u8; FACE_FRAME_BYTES];
    let mut pos = 0usize;
    for pair in rle.chunks_exact(2) {
        let count = pair[0] as usize;
        let value = pair[1];
        if count == 0 {
            return Err(ProtocolError::InvalidValue {
                field: "rle_count",
                value: 0,
            });
        }
        if pos + count > FACE_FRAME_BYTES {
            return Err(ProtocolError::RleOverrun {
                limit: FACE_FRAME_BYTES,
            });
        }
        out[pos..pos + count].fill(value);
        pos += count;
    }

    if pos != FACE_FRAME_BYTES {
        return Err(ProtocolError::InvalidLength {
            expected: FACE_FRAME_BYTES,
            actual: pos,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_blank_frame_compresses_small() {
        let raw = [0u8; FACE_FRAME_BYTES];
        let rle = compress(&raw);
        // 1024 个零 → ceil(1024/255) = 5 个行程对
        assert_eq!(rle.len(), 10);
        assert_eq!(decompress(&rle).unwrap(), raw);
    }

    #[test]
    fn test_single_pixel() {
        let mut raw = [0u8; FACE_FRAME_BYTES];
        raw[17] = 0x80;
        let rle = compress(&raw);
        assert_eq!(decompress(&rle).unwrap(), raw);
    }

    #[test]
    fn test_decompress_rejects_odd_length() {
        assert!(decompress(&[1, 0, 3]).is_err());
    }

    #[test]
    fn test_decompress_rejects_zero_count() {
        let rle = [0u8, 0xAA, 255, 0, 255, 0, 255, 0, 255, 0, 4, 0];
        assert!(matches!(
            decompress(&rle),
            Err(ProtocolError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_decompress_rejects_overrun() {
        // 六个 255 长度的行程 = 1530 字节 > 1024
        let rle = [255u8, 1].repeat(6);
        assert!(matches!(
            decompress(&rle),
            Err(ProtocolError::RleOverrun { .. })
        ));
    }

    #[test]
    fn test_decompress_rejects_short_output() {
        let rle = [16u8, 0xFF];
        assert!(matches!(
            decompress(&rle),
            Err(ProtocolError::InvalidLength { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_compress_roundtrip(bytes in proptest::collection::vec(any::<u8>(), FACE_FRAME_BYTES)) {
            let mut raw = [0u8; FACE_FRAME_BYTES];
            raw.copy_from_slice(&bytes);
            let rle = compress(&raw);
            prop_assert_eq!(decompress(&rle).unwrap(), raw);
            // 最坏情况也不会超过 2x
            prop_assert!(rle.len() <= 2 * FACE_FRAME_BYTES);
        }
    }
}
