//! 面部图像与程序化面部
//!
//! 机器人面部是 128×64 的 1 bpp 屏幕。两种来源：
//!
//! - **位图面部**：制作工具导出的命名图像（[`FaceImageMap`]），
//!   关键帧按名字引用；
//! - **程序化面部**：参数化的双眼描述（[`ProceduralFace`]），
//!   流送时在相邻关键帧之间做线性插值后栅格化。

use std::collections::HashMap;

use serde::Deserialize;

use robin_protocol::constants::{FACE_DISPLAY_HEIGHT, FACE_DISPLAY_WIDTH, FACE_FRAME_BYTES};
use robin_protocol::face_rle;

use crate::error::AnimError;
use crate::keyframe::KeyFrame;

/// 每行字节数（128 像素 / 8）
const ROW_BYTES: usize = FACE_DISPLAY_WIDTH / 8;

/// 一帧 1 bpp 面部位图（按行打包，MSB 在左）
#[derive(Clone, PartialEq, Eq)]
pub struct FaceBitmap {
    data: Box<[u8; FACE_FRAME_BYTES]>,
}

impl Default for FaceBitmap {
    fn default() -> Self {
        Self::blank()
    }
}

impl std::fmt::Debug for FaceBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 全量像素 dump 没有可读性，只打印点亮像素数
        let lit: usize = self.data.iter().map(|b| b.count_ones() as usize).sum();
        write!(f, "FaceBitmap({} px lit)", lit)
    }
}

impl FaceBitmap {
    /// 全黑帧
    pub fn blank() -> Self {
        Self {
            data: Box::new([0u8; FACE_FRAME_BYTES]),
        }
    }

    pub fn from_raw(data: [u8; FACE_FRAME_BYTES]) -> Self {
        Self {
            data: Box::new(data),
        }
    }

    pub fn raw(&self) -> &[u8; FACE_FRAME_BYTES] {
        &self.data
    }

    /// 点亮/熄灭一个像素（越界坐标忽略）
    pub fn set_pixel(&mut self, x: i32, y: i32, on: bool) {
        if x < 0 || y < 0 || x >= FACE_DISPLAY_WIDTH as i32 || y >= FACE_DISPLAY_HEIGHT as i32 {
            return;
        }
        let idx = y as usize * ROW_BYTES + x as usize / 8;
        let mask = 0x80u8 >> (x as usize % 8);
        if on {
            self.data[idx] |= mask;
        } else {
            self.data[idx] &= !mask;
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        let idx = y * ROW_BYTES + x / 8;
        self.data[idx] & (0x80 >> (x % 8)) != 0
    }

    /// RLE 压缩（链路格式）
    pub fn to_rle(&self) -> Vec<u8> {
        face_rle::compress(&self.data)
    }

    /// 从十六进制行解析（制作工具导出格式：64 行，每行 32 个十六进制字符）
    pub fn from_hex_rows(name: &str, rows: &[String]) -> Result<Self, AnimError> {
        if rows.len() != FACE_DISPLAY_HEIGHT {
            return Err(AnimError::InvalidImage {
                name: name.to_string(),
                reason: format!("expected {} rows, got {}", FACE_DISPLAY_HEIGHT, rows.len()),
            });
        }
        let mut data = [0u8; FACE_FRAME_BYTES];
        for (y, row) in rows.iter().enumerate() {
            if !row.is_ascii() || row.len() != ROW_BYTES * 2 {
                return Err(AnimError::InvalidImage {
                    name: name.to_string(),
                    reason: format!("row {} must be {} ascii hex chars", y, ROW_BYTES * 2),
                });
            }
            for (i, pair) in row.as_bytes().chunks_exact(2).enumerate() {
                let hex = std::str::from_utf8(pair).expect("ascii checked above");
                data[y * ROW_BYTES + i] =
                    u8::from_str_radix(hex, 16).map_err(|_| AnimError::InvalidImage {
                        name: name.to_string(),
                        reason: format!("row {} contains non-hex data", y),
                    })?;
            }
        }
        Ok(Self::from_raw(data))
    }
}

/// 命名面部图像表
#[derive(Debug, Default)]
pub struct FaceImageMap {
    images: HashMap<String, FaceBitmap>,
}

impl FaceImageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bitmap: FaceBitmap) {
        self.images.insert(name.into(), bitmap);
    }

    pub fn get(&self, name: &str) -> Result<&FaceBitmap, AnimError> {
        self.images
            .get(name)
            .ok_or_else(|| AnimError::UnknownImage(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.images.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// 从 JSON 加载：`{ "<imageName>": ["<hex row>", … 64 行] }`
    pub fn load_json_str(&mut self, json: &str) -> Result<usize, AnimError> {
        let root: HashMap<String, Vec<String>> = serde_json::from_str(json)?;
        let mut loaded = 0;
        for (name, rows) in root {
            let bitmap = FaceBitmap::from_hex_rows(&name, &rows)?;
            self.images.insert(name, bitmap);
            loaded += 1;
        }
        Ok(loaded)
    }
}

/// 单眼参数
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EyeParams {
    #[serde(rename = "centerX")]
    pub center_x: f32,
    #[serde(rename = "centerY")]
    pub center_y: f32,
    #[serde(rename = "scaleX", default = "default_scale")]
    pub scale_x: f32,
    #[serde(rename = "scaleY", default = "default_scale")]
    pub scale_y: f32,
}

fn default_scale() -> f32 {
    1.0
}

impl EyeParams {
    fn lerp(&self, other: &EyeParams, t: f32) -> EyeParams {
        EyeParams {
            center_x: lerp(self.center_x, other.center_x, t),
            center_y: lerp(self.center_y, other.center_y, t),
            scale_x: lerp(self.scale_x, other.scale_x, t),
            scale_y: lerp(self.scale_y, other.scale_y, t),
        }
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// 眼睛的名义半宽/半高（像素，scale = 1.0 时）
const NOMINAL_EYE_HALF_WIDTH: f32 = 10.0;
const NOMINAL_EYE_HALF_HEIGHT: f32 = 14.0;

/// 程序化面部参数
///
/// 所有坐标以屏幕像素为单位，原点在左上角。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ProceduralFace {
    /// 整脸旋转角（度，绕屏幕中心）
    #[serde(rename = "faceAngle_deg", default)]
    pub face_angle_deg: f32,
    /// 整脸平移
    #[serde(rename = "faceCenterX", default)]
    pub face_center_x: f32,
    #[serde(rename = "faceCenterY", default)]
    pub face_center_y: f32,
    /// 整脸缩放
    #[serde(rename = "faceScaleX", default = "default_scale")]
    pub face_scale_x: f32,
    #[serde(rename = "faceScaleY", default = "default_scale")]
    pub face_scale_y: f32,
    #[serde(rename = "leftEye")]
    pub left_eye: EyeParams,
    #[serde(rename = "rightEye")]
    pub right_eye: EyeParams,
}

impl Default for ProceduralFace {
    fn default() -> Self {
        // 两眼平视
        Self {
            face_angle_deg: 0.0,
            face_center_x: 0.0,
            face_center_y: 0.0,
            face_scale_x: 1.0,
            face_scale_y: 1.0,
            left_eye: EyeParams {
                center_x: 40.0,
                center_y: 32.0,
                scale_x: 1.0,
                scale_y: 1.0,
            },
            right_eye: EyeParams {
                center_x: 88.0,
                center_y: 32.0,
                scale_x: 1.0,
                scale_y: 1.0,
            },
        }
    }
}

impl ProceduralFace {
    /// 向 `other` 做线性插值，`t ∈ [0, 1]`
    pub fn interpolate(&self, other: &ProceduralFace, t: f32) -> ProceduralFace {
        let t = t.clamp(0.0, 1.0);
        ProceduralFace {
            face_angle_deg: lerp(self.face_angle_deg, other.face_angle_deg, t),
            face_center_x: lerp(self.face_center_x, other.face_center_x, t),
            face_center_y: lerp(self.face_center_y, other.face_center_y, t),
            face_scale_x: lerp(self.face_scale_x, other.face_scale_x, t),
            face_scale_y: lerp(self.face_scale_y, other.face_scale_y, t),
            left_eye: self.left_eye.lerp(&other.left_eye, t),
            right_eye: self.right_eye.lerp(&other.right_eye, t),
        }
    }

    /// 栅格化为面部位图
    ///
    /// 每只眼画成实心椭圆。眼心坐标先施加整脸缩放/平移，再绕屏幕
    /// 中心旋转 `face_angle_deg`；眼本体不随脸旋转（小角度下视觉
    /// 差异可忽略）。
    pub fn draw(&self) -> FaceBitmap {
        let mut bitmap = FaceBitmap::blank();
        let cx = FACE_DISPLAY_WIDTH as f32 / 2.0;
        let cy = FACE_DISPLAY_HEIGHT as f32 / 2.0;
        let (sin_a, cos_a) = self.face_angle_deg.to_radians().sin_cos();

        for eye in [&self.left_eye, &self.right_eye] {
            // 整脸变换
            let ex = (eye.center_x - cx) * self.face_scale_x + self.face_center_x;
            let ey = (eye.center_y - cy) * self.face_scale_y + self.face_center_y;
            // 绕屏幕中心旋转
            let rx_pos = cx + ex * cos_a - ey * sin_a;
            let ry_pos = cy + ex * sin_a + ey * cos_a;

            let half_w = NOMINAL_EYE_HALF_WIDTH * eye.scale_x * self.face_scale_x;
            let half_h = NOMINAL_EYE_HALF_HEIGHT * eye.scale_y * self.face_scale_y;
            if half_w <= 0.0 || half_h <= 0.0 {
                continue; // 闭眼
            }

            let x0 = (rx_pos - half_w).floor() as i32;
            let x1 = (rx_pos + half_w).ceil() as i32;
            let y0 = (ry_pos - half_h).floor() as i32;
            let y1 = (ry_pos + half_h).ceil() as i32;
            for y in y0..=y1 {
                for x in x0..=x1 {
                    let dx = (x as f32 + 0.5 - rx_pos) / half_w;
                    let dy = (y as f32 + 0.5 - ry_pos) / half_h;
                    if dx * dx + dy * dy <= 1.0 {
                        bitmap.set_pixel(x, y, true);
                    }
                }
            }
        }
        bitmap
    }
}

/// 程序化面部关键帧
///
/// 相邻两帧之间按流送时间做线性插值，因此每个 tick 都可能产生一帧
/// 新的面部图像，而不是只在关键帧处跳变。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ProceduralFaceKeyFrame {
    #[serde(rename = "triggerTime_ms")]
    pub trigger_time_ms: u32,
    #[serde(flatten)]
    pub face: ProceduralFace,
}

impl KeyFrame for ProceduralFaceKeyFrame {
    fn trigger_time_ms(&self) -> u32 {
        self.trigger_time_ms
    }
}

impl ProceduralFaceKeyFrame {
    /// 在当前帧与 `next` 之间插值出 `time_since_start_ms` 时刻的面部
    ///
    /// 时间在当前帧之前取当前帧本身，超过 `next` 的触发时间取 `next`。
    pub fn interpolated_face(
        &self,
        next: &ProceduralFaceKeyFrame,
        time_since_start_ms: u32,
    ) -> ProceduralFace {
        let span = next.trigger_time_ms.saturating_sub(self.trigger_time_ms);
        if span == 0 {
            return next.face;
        }
        let elapsed = time_since_start_ms.saturating_sub(self.trigger_time_ms);
        let t = elapsed as f32 / span as f32;
        self.face.interpolate(&next.face, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitmap_set_pixel() {
        let mut bitmap = FaceBitmap::blank();
        bitmap.set_pixel(0, 0, true);
        bitmap.set_pixel(127, 63, true);
        assert!(bitmap.pixel(0, 0));
        assert!(bitmap.pixel(127, 63));
        assert!(!bitmap.pixel(64, 32));

        bitmap.set_pixel(0, 0, false);
        assert!(!bitmap.pixel(0, 0));
    }

    #[test]
    fn test_bitmap_out_of_bounds_ignored() {
        let mut bitmap = FaceBitmap::blank();
        bitmap.set_pixel(-1, 0, true);
        bitmap.set_pixel(128, 0, true);
        bitmap.set_pixel(0, 64, true);
        assert_eq!(bitmap, FaceBitmap::blank());
    }

    #[test]
    fn test_bitmap_rle_roundtrip() {
        let mut bitmap = FaceBitmap::blank();
        for x in 20..40 {
            bitmap.set_pixel(x, 30, true);
        }
        let rle = bitmap.to_rle();
        let restored = face_rle::decompress(&rle).unwrap();
        assert_eq!(&restored, bitmap.raw());
    }

    #[test]
    fn test_from_hex_rows() {
        let mut rows = vec!["0".repeat(32); 64];
        rows[0] = format!("80{}", "0".repeat(30)); // 左上角一个像素
        let bitmap = FaceBitmap::from_hex_rows("test", &rows).unwrap();
        assert!(bitmap.pixel(0, 0));
        assert!(!bitmap.pixel(1, 0));
    }

    #[test]
    fn test_from_hex_rows_wrong_row_count() {
        let rows = vec!["0".repeat(32); 10];
        assert!(matches!(
            FaceBitmap::from_hex_rows("short", &rows),
            Err(AnimError::InvalidImage { .. })
        ));
    }

    #[test]
    fn test_from_hex_rows_bad_hex() {
        let mut rows = vec!["0".repeat(32); 64];
        rows[5] = format!("ZZ{}", "0".repeat(30));
        assert!(matches!(
            FaceBitmap::from_hex_rows("bad", &rows),
            Err(AnimError::InvalidImage { .. })
        ));
    }

    #[test]
    fn test_image_map_lookup() {
        let mut map = FaceImageMap::new();
        map.insert("eyes_open", FaceBitmap::blank());
        assert!(map.get("eyes_open").is_ok());
        assert!(matches!(
            map.get("eyes_closed"),
            Err(AnimError::UnknownImage(_))
        ));
    }

    #[test]
    fn test_procedural_face_draw_lights_pixels() {
        let face = ProceduralFace::default();
        let bitmap = face.draw();
        // 两眼中心必然点亮
        assert!(bitmap.pixel(40, 32));
        assert!(bitmap.pixel(88, 32));
        // 屏幕四角不亮
        assert!(!bitmap.pixel(0, 0));
        assert!(!bitmap.pixel(127, 63));
    }

    #[test]
    fn test_procedural_face_zero_scale_is_closed_eye() {
        let mut face = ProceduralFace::default();
        face.left_eye.scale_x = 0.0;
        face.left_eye.scale_y = 0.0;
        let bitmap = face.draw();
        assert!(!bitmap.pixel(40, 32));
        assert!(bitmap.pixel(88, 32));
    }

    #[test]
    fn test_interpolation_endpoints() {
        let a = ProceduralFace::default();
        let mut b = ProceduralFace::default();
        b.face_center_x = 10.0;
        b.left_eye.center_y = 40.0;

        let at_start = a.interpolate(&b, 0.0);
        assert_eq!(at_start, a);

        let at_end = a.interpolate(&b, 1.0);
        assert_eq!(at_end, b);

        let mid = a.interpolate(&b, 0.5);
        assert!((mid.face_center_x - 5.0).abs() < 1e-6);
        assert!((mid.left_eye.center_y - 36.0).abs() < 1e-6);
    }

    #[test]
    fn test_keyframe_interpolation_by_time() {
        let first = ProceduralFaceKeyFrame {
            trigger_time_ms: 100,
            face: ProceduralFace::default(),
        };
        let mut target = ProceduralFace::default();
        target.face_center_x = 20.0;
        let second = ProceduralFaceKeyFrame {
            trigger_time_ms: 300,
            face: target,
        };

        let mid = first.interpolated_face(&second, 200);
        assert!((mid.face_center_x - 10.0).abs() < 1e-6);

        // 时间越过 next 时钳制在终点
        let past = first.interpolated_face(&second, 500);
        assert!((past.face_center_x - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_keyframe_json_with_flattened_face() {
        let kf: ProceduralFaceKeyFrame = serde_json::from_str(
            r#"{
                "triggerTime_ms": 66,
                "faceAngle_deg": 5.0,
                "leftEye":  {"centerX": 38.0, "centerY": 30.0},
                "rightEye": {"centerX": 90.0, "centerY": 30.0, "scaleX": 1.2, "scaleY": 0.8}
            }"#,
        )
        .unwrap();
        assert_eq!(kf.trigger_time_ms, 66);
        assert!((kf.face.face_angle_deg - 5.0).abs() < 1e-6);
        assert!((kf.face.face_scale_x - 1.0).abs() < 1e-6); // default
        assert!((kf.face.right_eye.scale_x - 1.2).abs() < 1e-6);
    }
}
