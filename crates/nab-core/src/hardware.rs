//! 硬件生命周期
//!
//! [`NabCore::initialize`] 依次执行声卡自检、GPIO 配置（使能引脚拉高、
//! 注册编码器中断）并启动运动线程；任何一步失败都是致命错误。
//! [`NabCore::shutdown`] 停止音频会话、停止电机并释放引脚。未调用时由
//! `EarsDriver` 和 [`AudioEngine`] 的 drop 兜底（电机停止、运行标志清除）。

use crate::config::NabConfig;
use crate::ears::Ears;
use crate::sound::AudioEngine;
use crate::CoreError;
use nab_ears::EarsBuilder;
use nab_gpio::GpioBoard;
use nab_sound::{HardwareModel, PcmBackend};
use std::sync::Arc;
use tracing::info;

/// 耳朵 + 音频引擎
pub struct NabCore {
    model: HardwareModel,
    ears: Ears,
    audio: AudioEngine,
}

impl NabCore {
    /// 初始化硬件
    ///
    /// # 错误
    /// - 声卡自检失败
    /// - GPIO 不可用或边沿检测注册失败
    /// - 配置无效
    pub fn initialize<B: GpioBoard>(
        config: &NabConfig,
        board: B,
        backend: Arc<dyn PcmBackend>,
    ) -> Result<Self, CoreError> {
        let audio = AudioEngine::with_self_test(backend, config.sound_profile())?;
        let driver = EarsBuilder::new().config(config.ears_config()).build(board)?;
        info!("nabcore initialized (hardware model {})", config.hardware_model);
        Ok(Self {
            model: config.hardware_model,
            ears: Ears::new(driver),
            audio,
        })
    }

    /// 使用树莓派 GPIO 和 ALSA 初始化
    #[cfg(all(feature = "rpi", feature = "alsa", target_os = "linux"))]
    pub fn initialize_hardware(config: &NabConfig) -> Result<Self, CoreError> {
        let board = nab_gpio::RpiBoard::new(config.pin_layout())?;
        Self::initialize(config, board, Arc::new(nab_sound::AlsaBackend::new()))
    }

    pub fn model(&self) -> HardwareModel {
        self.model
    }

    pub fn ears(&self) -> &Ears {
        &self.ears
    }

    pub fn audio(&self) -> &AudioEngine {
        &self.audio
    }

    /// 停止音频会话并等待设备释放，然后停止电机、释放 GPIO（幂等）
    pub async fn shutdown(&self) {
        self.audio.stop_playing().await;
        self.audio.stop_recording().await;
        self.ears.shutdown();
        info!("nabcore shut down");
    }
}
