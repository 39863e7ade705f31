//! 机器人链路抽象
//!
//! 流送端通过 [`RobotLink`] 与机器人通信，不关心底层传输。
//! 提供两个实现：
//!
//! - [`UdpLink`]：每条消息一个数据报，生产链路；
//! - [`LoopbackLink`]：进程内机器人模型，测试与 CLI 调试用。

use std::collections::VecDeque;
use std::net::{ToSocketAddrs, UdpSocket};

use thiserror::Error;
use tracing::trace;

use robin_protocol::{BufferStatus, EngineToRobot, ProtocolError, RobotToEngine};

/// 链路层统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Link disconnected")]
    Disconnected,
}

/// 机器人链路
///
/// `send` 发送一条引擎 → 机器人命令；`try_receive` 非阻塞地取一条
/// 机器人 → 引擎反馈，没有则返回 `None`。
pub trait RobotLink {
    fn send(&mut self, msg: &EngineToRobot) -> Result<(), LinkError>;
    fn try_receive(&mut self) -> Result<Option<RobotToEngine>, LinkError>;
}

/// UDP 链路（每条消息一个数据报）
pub struct UdpLink {
    socket: UdpSocket,
}

impl UdpLink {
    /// 连接到机器人地址（如 `"192.168.40.2:5551"`）
    ///
    /// 本地端口由系统分配；socket 置为非阻塞以配合 `try_receive`。
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, LinkError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(addr)?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr, LinkError> {
        Ok(self.socket.local_addr()?)
    }
}

impl RobotLink for UdpLink {
    fn send(&mut self, msg: &EngineToRobot) -> Result<(), LinkError> {
        let encoded = msg.encode();
        self.socket.send(&encoded)?;
        trace!(tag = ?msg.tag(), bytes = encoded.len(), "UDP frame sent");
        Ok(())
    }

    fn try_receive(&mut self) -> Result<Option<RobotToEngine>, LinkError> {
        let mut buf = [0u8; 64];
        match self.socket.recv(&mut buf) {
            Ok(len) => Ok(Some(RobotToEngine::decode(&buf[..len])?)),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(LinkError::Io(e)),
        }
    }
}

/// 进程内机器人模型
///
/// 模拟机器人侧的播放缓冲区记账：
/// - 默认即收即播（`bytes_played` 紧跟收到的字节数）；
/// - `set_hold(true)` 冻结播放，用于验证流控会在预算耗尽时停手；
/// - `AbortAnimation` 清空"缓冲区"（played 追平 streamed）。
///
/// `try_receive` 只在状态相对上次上报发生变化时返回一条
/// [`BufferStatus`]，模拟真实机器人按需上报的行为。
pub struct LoopbackLink {
    bytes_received: u32,
    audio_frames_received: u32,
    bytes_played: u32,
    audio_frames_played: u32,
    current_tag: u8,
    hold: bool,
    capture: bool,
    captured: VecDeque<EngineToRobot>,
    last_reported: Option<BufferStatus>,
}

impl Default for LoopbackLink {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackLink {
    pub fn new() -> Self {
        Self {
            bytes_received: 0,
            audio_frames_received: 0,
            bytes_played: 0,
            audio_frames_played: 0,
            current_tag: 0,
            hold: false,
            capture: false,
            captured: VecDeque::new(),
            last_reported: None,
        }
    }

    /// 记录所有收到的消息（测试断言用）
    pub fn with_capture() -> Self {
        Self {
            capture: true,
            ..Self::new()
        }
    }

    /// 冻结/恢复模拟播放
    pub fn set_hold(&mut self, hold: bool) {
        self.hold = hold;
        if !hold {
            // 恢复时立即追平
            self.bytes_played = self.bytes_received;
            self.audio_frames_played = self.audio_frames_received;
        }
    }

    /// 取走已捕获的消息
    pub fn take_captured(&mut self) -> Vec<EngineToRobot> {
        self.captured.drain(..).collect()
    }

    /// 机器人当前正在播放的 tag
    pub fn current_tag(&self) -> u8 {
        self.current_tag
    }

    pub fn bytes_received(&self) -> u32 {
        self.bytes_received
    }

    pub fn audio_frames_received(&self) -> u32 {
        self.audio_frames_received
    }

    fn status(&self) -> BufferStatus {
        BufferStatus {
            bytes_played: self.bytes_played,
            audio_frames_played: self.audio_frames_played,
            current_tag: self.current_tag,
        }
    }
}

impl RobotLink for LoopbackLink {
    fn send(&mut self, msg: &EngineToRobot) -> Result<(), LinkError> {
        // 与真实链路同路径：编码一遍再记账
        let size = msg.encode().len() as u32;
        self.bytes_received = self.bytes_received.wrapping_add(size);
        if msg.counts_as_audio_frame() {
            self.audio_frames_received = self.audio_frames_received.wrapping_add(1);
        }

        match msg {
            EngineToRobot::StartOfAnimation { tag } => self.current_tag = *tag,
            EngineToRobot::EndOfAnimation => self.current_tag = 0,
            EngineToRobot::AbortAnimation => {
                self.current_tag = 0;
                // 缓冲区清空：尚未播放的内容直接丢弃
                self.bytes_played = self.bytes_received;
                self.audio_frames_played = self.audio_frames_received;
            },
            _ => {},
        }

        if !self.hold {
            self.bytes_played = self.bytes_received;
            self.audio_frames_played = self.audio_frames_received;
        }

        if self.capture {
            self.captured.push_back(msg.clone());
        }
        Ok(())
    }

    fn try_receive(&mut self) -> Result<Option<RobotToEngine>, LinkError> {
        let status = self.status();
        if self.last_reported == Some(status) {
            return Ok(None);
        }
        self.last_reported = Some(status);
        Ok(Some(RobotToEngine::BufferStatus(status)))
    }
}
