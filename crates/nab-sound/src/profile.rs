//! 硬件版本与声卡配置
//!
//! - 2018：HiFiBerry DAC，只有播放
//! - 2019（tag / tagtag）：Seeed 2-mic voice card，播放和录音

use crate::SoundError;
use crate::backend::PcmBackend;
use crate::format::{PcmParams, SampleFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info};

pub const MODEL_2018_CARD_NAME: &str = "sndrpihifiberry";
pub const MODEL_2019_CARD_NAME: &str = "seeed2micvoicec";

/// 硬件版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HardwareModel {
    #[serde(rename = "2018")]
    Model2018,
    #[serde(rename = "2019_tag")]
    Model2019Tag,
    #[default]
    #[serde(rename = "2019_tagtag")]
    Model2019TagTag,
}

impl HardwareModel {
    /// 该版本使用的声卡 ID
    pub const fn card_name(self) -> &'static str {
        match self {
            HardwareModel::Model2018 => MODEL_2018_CARD_NAME,
            HardwareModel::Model2019Tag | HardwareModel::Model2019TagTag => MODEL_2019_CARD_NAME,
        }
    }
}

impl fmt::Display for HardwareModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HardwareModel::Model2018 => "2018",
            HardwareModel::Model2019Tag => "2019_tag",
            HardwareModel::Model2019TagTag => "2019_tagtag",
        };
        f.write_str(name)
    }
}

/// 播放 / 录音设备
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundProfile {
    pub playback_device: String,
    /// `None`：该版本没有录音设备
    pub record_device: Option<String>,
}

impl SoundProfile {
    /// 按硬件版本选择设备（使用 plughw 以获得软件单声道 / 重采样）
    pub fn for_model(model: HardwareModel) -> Self {
        let device = format!("plughw:CARD={}", model.card_name());
        match model {
            HardwareModel::Model2018 => Self {
                playback_device: device,
                record_device: None,
            },
            HardwareModel::Model2019Tag | HardwareModel::Model2019TagTag => Self {
                playback_device: device.clone(),
                record_device: Some(device),
            },
        }
    }

    /// 在系统声卡中查找支持的声卡
    ///
    /// 两块 2019 版本使用同一声卡，检测结果统一为 `Model2019TagTag`。
    pub fn detect(backend: &dyn PcmBackend) -> Result<(HardwareModel, Self), SoundError> {
        let cards = backend.card_names()?;
        let model = cards
            .iter()
            .find_map(|card| match card.as_str() {
                MODEL_2018_CARD_NAME => Some(HardwareModel::Model2018),
                MODEL_2019_CARD_NAME => Some(HardwareModel::Model2019TagTag),
                _ => None,
            })
            .ok_or(SoundError::CardNotFound)?;
        info!("Sound card detected: {} ({})", model.card_name(), model);
        Ok((model, Self::for_model(model)))
    }

    /// 启动自检
    ///
    /// 播放：S16LE 立体声 / 单声道 44.1 kHz，单声道 22.05 kHz；
    /// 录音（如有）：S16LE 单声道 16 kHz。任何一项失败都是致命错误。
    pub fn self_test(&self, backend: &dyn PcmBackend) -> Result<(), SoundError> {
        for (channels, rate) in [(2, 44_100), (1, 44_100), (1, 22_050)] {
            let params = PcmParams {
                channels,
                rate,
                format: SampleFormat::S16LE,
                period_frames: (rate / 10) as usize,
            };
            if let Err(e) = backend.open_playback(&self.playback_device, &params) {
                error!("Playback self-test failed ({} Hz x{}): {}", rate, channels, e);
                return Err(SoundError::SelfTest("playback".into()));
            }
        }

        if let Some(record_device) = &self.record_device
            && let Err(e) = backend.open_capture(record_device, &PcmParams::capture())
        {
            error!("Capture self-test failed: {}", e);
            return Err(SoundError::SelfTest("recording".into()));
        }

        info!(
            "Sound self-test passed (playback {}, record {})",
            self.playback_device,
            self.record_device.as_deref().unwrap_or("none")
        );
        Ok(())
    }
}
