//! 耳朵控制层错误类型定义

use nab_gpio::{Ear, GpioError};
use std::time::Duration;
use thiserror::Error;

/// 耳朵控制层错误类型
#[derive(Error, Debug)]
pub enum EarsError {
    /// GPIO 错误
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),

    /// 运动线程已退出（任务通道关闭或结果未送达）
    #[error("Motion worker closed")]
    WorkerClosed,

    /// 运动线程启动失败
    #[error("Failed to spawn motion worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// 归零超时（仅在配置了 `homing_timeout` 时出现）
    #[error("Homing did not find the missing hole within {0:?}")]
    HomingTimeout(Duration),

    /// 运动结束后位置仍未知
    #[error("Position of the {0} ear is unknown")]
    PositionUnknown(Ear),

    /// 配置无效
    #[error("Invalid ears configuration: {0}")]
    InvalidConfig(String),
}

impl EarsError {
    /// 是否为启动阶段的致命错误
    pub fn is_fatal(&self) -> bool {
        match self {
            EarsError::Gpio(e) => e.is_fatal(),
            EarsError::Spawn(_) | EarsError::InvalidConfig(_) => true,
            _ => false,
        }
    }
}
