//! 背包灯颜色打包
//!
//! 背包 LED 颜色在链路上以 RGB565 传输（每灯 2 字节，大端）。
//! 对于**单个 u16 内的位域**，协议明确 Bit 0-4 为蓝色分量，
//! bilge 默认使用 LSB first 位序，与协议要求一致。

use bilge::prelude::*;

/// RGB565 颜色（Bit 0-4 蓝，Bit 5-10 绿，Bit 11-15 红）
#[bitsize(16)]
#[derive(FromBits, DebugBits, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb565 {
    pub b: u5,
    pub g: u6,
    pub r: u5,
}

impl Rgb565 {
    /// 从 8-bit RGB 分量构造（截断低位）
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(u5::new(b >> 3), u6::new(g >> 2), u5::new(r >> 3))
    }

    /// 从 [0.0, 1.0] 浮点 RGB 构造（动画 JSON 中的颜色表示）
    ///
    /// 超出范围的分量按边界截断。
    pub fn from_rgb_f32(r: f32, g: f32, b: f32) -> Self {
        let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::from_rgb8(to_u8(r), to_u8(g), to_u8(b))
    }

    /// 原始 16-bit 值（用于链路编码）
    pub fn raw(&self) -> u16 {
        self.value
    }

    /// 展开回 8-bit RGB 分量（高位复制填充低位）
    pub fn to_rgb8(&self) -> (u8, u8, u8) {
        let r5 = u8::from(self.r());
        let g6 = u8::from(self.g());
        let b5 = u8::from(self.b());
        (
            (r5 << 3) | (r5 >> 2),
            (g6 << 2) | (g6 >> 4),
            (b5 << 3) | (b5 >> 2),
        )
    }

    /// 全灭
    pub fn off() -> Self {
        Self::from(0u16)
    }
}
