//! # nab-core
//!
//! 兔子耳朵与音频引擎的异步门面。
//!
//! - [`Ears`]: 耳朵操作按到达顺序串行化，在运动线程上执行，结果以 future 返回
//! - [`AudioEngine`]: 单一播放 / 录音会话，切换时先停止并等待旧会话
//! - [`NabConfig`]: TOML 配置
//! - [`NabCore`]: 硬件初始化与关闭
//!
//! ## 模拟运行
//!
//! ```no_run
//! # async fn demo() -> Result<(), nab_core::CoreError> {
//! use nab_core::{NabConfig, NabCore};
//! use nab_gpio::mock::MockBoard;
//! use nab_sound::mock::MockPcmBackend;
//! use std::sync::Arc;
//!
//! let (board, _handle) = MockBoard::new();
//! let core = NabCore::initialize(&NabConfig::default(), board, Arc::new(MockPcmBackend::new()))?;
//! core.audio().play("/usr/share/nabd/sounds/boot.mp3").await?;
//! core.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod ears;
mod error;
mod hardware;
mod sound;

pub use config::{EarsSettings, NabConfig, SoundSettings};
pub use ears::Ears;
pub use error::CoreError;
pub use hardware::NabCore;
pub use sound::{AudioEngine, SessionKind, SessionOutcome};

// 重新导出下层常用类型
pub use nab_ears::{Ear, EarEvent, EarEvents, EarsState, MotorState, Rotation};
pub use nab_sound::{FrameConsumer, HardwareModel, SoundProfile};
