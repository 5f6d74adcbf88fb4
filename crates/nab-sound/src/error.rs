//! 音频层错误类型定义

use thiserror::Error;

/// 音频层错误类型
///
/// 所有负载都是字符串，错误可以 `Clone` 并跨线程通过完成信号传递。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SoundError {
    /// 不支持的采样宽度（字节）
    #[error("Unsupported sample width: {0} bytes")]
    UnsupportedSampleWidth(u16),

    /// 不支持的音频格式（浮点 WAV、未知编码等）
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// 不支持的文件类型（按扩展名）
    #[error("Unsupported sound file: {0}")]
    UnsupportedFile(String),

    /// 打开 / 读取文件失败
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// 解码失败
    #[error("Decode error: {0}")]
    Decode(String),

    /// PCM 设备错误（打开、配置、读写）
    #[error("PCM device {device} error: {message}")]
    Device { device: String, message: String },

    /// 当前硬件版本没有录音设备
    #[error("No capture device on this hardware")]
    NoCaptureDevice,

    /// 未找到支持的声卡
    #[error("Sound card not found (are drivers missing?)")]
    CardNotFound,

    /// 启动自检失败
    #[error("Unable to configure sound card for {0}")]
    SelfTest(String),

    /// 后台线程异常退出
    #[error("Audio worker error: {0}")]
    Worker(String),
}

impl SoundError {
    /// 是否为致命错误（配置层面，重试无意义）
    ///
    /// 致命：不支持的采样宽度 / 格式、找不到声卡、自检失败。
    /// 其它错误只结束当前会话。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SoundError::UnsupportedSampleWidth(_)
                | SoundError::UnsupportedFormat(_)
                | SoundError::CardNotFound
                | SoundError::SelfTest(_)
        )
    }

    pub(crate) fn io(path: impl std::fmt::Display, e: impl std::fmt::Display) -> Self {
        SoundError::Io {
            path: path.to_string(),
            message: e.to_string(),
        }
    }

    pub(crate) fn device(device: &str, e: impl std::fmt::Display) -> Self {
        SoundError::Device {
            device: device.to_string(),
            message: e.to_string(),
        }
    }
}
