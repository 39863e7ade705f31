//! # Robin Protocol
//!
//! 动画链路消息协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: 消息 Tag 常量定义
//! - `constants`: 时序与缓冲区常量定义
//! - `commands`: 引擎 → 机器人命令帧构建
//! - `feedback`: 机器人 → 引擎反馈帧解析
//! - `color`: 背包灯 RGB565 颜色打包
//! - `face_rle`: 面部图像 RLE 压缩编解码
//!
//! ## 字节序
//!
//! 协议载荷使用高位在前（大端字节序）。
//! 本模块提供了字节序转换工具函数。
//!
//! ## 流控约定
//!
//! 每条命令帧的 [`commands::EngineToRobot::wire_size`] 必须与编码后的
//! 字节数严格一致：流控层按它扣减每个 tick 的字节预算。

pub mod color;
pub mod commands;
pub mod constants;
pub mod face_rle;
pub mod feedback;
pub mod ids;

// 重新导出常用类型
pub use color::*;
pub use commands::*;
pub use constants::*;
pub use feedback::*;
pub use ids::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unknown message tag: 0x{tag:02X}")]
    UnknownTag { tag: u8 },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: &'static str, value: i64 },

    #[error("RLE data would exceed {limit} bytes of output")]
    RleOverrun { limit: usize },

    #[error("Empty frame")]
    EmptyFrame,
}

/// 字节序转换工具函数
///
/// 协议载荷使用高位在前（大端字节序），
/// 这些函数用于在协议层进行字节序转换。
///
/// 大端字节序转 i16
pub fn bytes_to_i16_be(bytes: [u8; 2]) -> i16 {
    i16::from_be_bytes(bytes)
}

/// 大端字节序转 u16
pub fn bytes_to_u16_be(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

/// 大端字节序转 u32
pub fn bytes_to_u32_be(bytes: [u8; 4]) -> u32 {
    u32::from_be_bytes(bytes)
}

/// i16 转大端字节序
pub fn i16_to_bytes_be(value: i16) -> [u8; 2] {
    value.to_be_bytes()
}

/// u16 转大端字节序
pub fn u16_to_bytes_be(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

/// u32 转大端字节序
pub fn u32_to_bytes_be(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_i16_be() {
        let bytes = [0x12, 0x34];
        let value = bytes_to_i16_be(bytes);
        assert_eq!(value, 0x1234);
    }

    #[test]
    fn test_bytes_to_i16_be_negative() {
        let bytes = [0xFF, 0xFF];
        let value = bytes_to_i16_be(bytes);
        assert_eq!(value, -1);
    }

    #[test]
    fn test_bytes_to_u32_be() {
        let bytes = [0x12, 0x34, 0x56, 0x78];
        let value = bytes_to_u32_be(bytes);
        assert_eq!(value, 0x12345678);
    }

    #[test]
    fn test_roundtrip_i16() {
        let original = -12_345;
        let bytes = i16_to_bytes_be(original);
        let decoded = bytes_to_i16_be(bytes);
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_roundtrip_u32() {
        let original = 0xDEAD_BEEF;
        let bytes = u32_to_bytes_be(original);
        let decoded = bytes_to_u32_be(bytes);
        assert_eq!(original, decoded);
    }
}
