//! 顶层错误类型定义

use nab_ears::EarsError;
use nab_gpio::GpioError;
use nab_sound::SoundError;
use std::path::PathBuf;
use thiserror::Error;

/// 顶层错误类型
#[derive(Error, Debug)]
pub enum CoreError {
    /// GPIO 错误
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),

    /// 耳朵控制错误
    #[error("Ears error: {0}")]
    Ears(#[from] EarsError),

    /// 音频错误
    #[error("Sound error: {0}")]
    Sound(#[from] SoundError),

    /// 配置文件解析失败
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// 配置序列化失败
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// 读取配置文件失败
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    /// 是否为致命错误（启动阶段失败或配置错误）
    pub fn is_fatal(&self) -> bool {
        match self {
            CoreError::Gpio(e) => e.is_fatal(),
            CoreError::Ears(e) => e.is_fatal(),
            CoreError::Sound(e) => e.is_fatal(),
            CoreError::ConfigParse(_) | CoreError::ConfigSerialize(_) | CoreError::Io { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nab_gpio::Ear;

    #[test]
    fn test_error_display() {
        let err: CoreError = SoundError::SelfTest("playback".into()).into();
        assert_eq!(
            format!("{}", err),
            "Sound error: Unable to configure sound card for playback"
        );
        assert!(err.is_fatal());

        let err: CoreError = EarsError::PositionUnknown(Ear::Left).into();
        assert_eq!(
            format!("{}", err),
            "Ears error: Position of the left ear is unknown"
        );
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_fatal_classification_follows_source() {
        let err: CoreError = GpioError::Unavailable("no /dev/gpiomem".into()).into();
        assert!(err.is_fatal());

        let err: CoreError = SoundError::Device {
            device: "default".into(),
            message: "xrun".into(),
        }
        .into();
        assert!(!err.is_fatal());

        let err: CoreError = EarsError::Gpio(GpioError::Released).into();
        assert!(!err.is_fatal());
    }
}
