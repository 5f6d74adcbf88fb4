//! TOML 配置
//!
//! ```toml
//! hardware_model = "2019_tagtag"
//!
//! [ears]
//! steps = 17
//! missing_hole_threshold_ms = 400
//! poll_interval_ms = 300
//! homing_timeout_ms = 0
//!
//! [sound]
//! playback_device = "plughw:CARD=seeed2micvoicec"
//! ```
//!
//! 所有字段都有默认值，空文件即默认配置。

use crate::CoreError;
use nab_ears::EarsConfig;
use nab_gpio::PinLayout;
use nab_sound::{HardwareModel, SoundProfile};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// 完整配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NabConfig {
    pub hardware_model: HardwareModel,
    pub ears: EarsSettings,
    pub sound: SoundSettings,
}

/// `[ears]` 段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EarsSettings {
    pub steps: i32,
    pub missing_hole_threshold_ms: u64,
    pub poll_interval_ms: u64,
    /// 0 = 不限时
    pub homing_timeout_ms: u64,
    pub event_capacity: usize,
    pub encoder_pins: [u8; 2],
    pub motor_pins: [[u8; 2]; 2],
    pub enable_pins: [u8; 2],
}

impl Default for EarsSettings {
    fn default() -> Self {
        let ears = EarsConfig::default();
        let pins = PinLayout::default();
        Self {
            steps: ears.steps,
            missing_hole_threshold_ms: ears.missing_hole_threshold.as_millis() as u64,
            poll_interval_ms: ears.poll_interval.as_millis() as u64,
            homing_timeout_ms: 0,
            event_capacity: ears.event_capacity,
            encoder_pins: pins.encoder_pins,
            motor_pins: pins.motor_pins,
            enable_pins: pins.enable_pins,
        }
    }
}

/// `[sound]` 段（设备名覆盖）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SoundSettings {
    pub playback_device: Option<String>,
    /// `"null"` 表示没有录音设备
    pub record_device: Option<String>,
}

impl NabConfig {
    /// 从文件加载并校验
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }

    /// 序列化为 TOML 文本
    pub fn to_toml_string(&self) -> Result<String, CoreError> {
        Ok(toml::to_string(self)?)
    }

    /// 耳朵控制配置
    pub fn ears_config(&self) -> EarsConfig {
        let ears = &self.ears;
        let homing_timeout =
            (ears.homing_timeout_ms > 0).then(|| Duration::from_millis(ears.homing_timeout_ms));
        EarsConfig {
            steps: ears.steps,
            missing_hole_threshold: Duration::from_millis(ears.missing_hole_threshold_ms),
            poll_interval: Duration::from_millis(ears.poll_interval_ms),
            homing_timeout,
            event_capacity: ears.event_capacity,
        }
    }

    pub fn pin_layout(&self) -> PinLayout {
        PinLayout {
            encoder_pins: self.ears.encoder_pins,
            motor_pins: self.ears.motor_pins,
            enable_pins: self.ears.enable_pins,
        }
    }

    /// 声卡设备（硬件版本默认值 + `[sound]` 覆盖）
    pub fn sound_profile(&self) -> SoundProfile {
        let mut profile = SoundProfile::for_model(self.hardware_model);
        if let Some(device) = &self.sound.playback_device {
            profile.playback_device = device.clone();
        }
        match self.sound.record_device.as_deref() {
            Some("null") => profile.record_device = None,
            Some(device) => profile.record_device = Some(device.to_string()),
            None => {},
        }
        profile
    }
}

impl FromStr for NabConfig {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: NabConfig = toml::from_str(s)?;
        config.ears_config().validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config: NabConfig = "".parse().unwrap();
        assert_eq!(config, NabConfig::default());
        assert_eq!(config.hardware_model, HardwareModel::Model2019TagTag);

        let ears = config.ears_config();
        assert_eq!(ears.steps, 17);
        assert_eq!(ears.missing_hole_threshold, Duration::from_millis(400));
        assert_eq!(ears.poll_interval, Duration::from_millis(300));
        assert_eq!(ears.homing_timeout, None);
        assert_eq!(config.pin_layout(), PinLayout::default());
    }

    #[test]
    fn test_parse_full_config() {
        let config: NabConfig = r#"
            hardware_model = "2018"

            [ears]
            steps = 16
            missing_hole_threshold_ms = 500
            poll_interval_ms = 250
            homing_timeout_ms = 20000
            encoder_pins = [4, 17]

            [sound]
            playback_device = "hw:0"
        "#
        .parse()
        .unwrap();

        assert_eq!(config.hardware_model, HardwareModel::Model2018);
        let ears = config.ears_config();
        assert_eq!(ears.steps, 16);
        assert_eq!(ears.missing_hole_threshold, Duration::from_millis(500));
        assert_eq!(ears.homing_timeout, Some(Duration::from_secs(20)));
        assert_eq!(config.pin_layout().encoder_pins, [4, 17]);
        assert_eq!(config.pin_layout().motor_pins, [[12, 11], [10, 9]]);

        let profile = config.sound_profile();
        assert_eq!(profile.playback_device, "hw:0");
        assert_eq!(profile.record_device, None);
    }

    #[test]
    fn test_record_device_override() {
        let config: NabConfig = "[sound]\nrecord_device = \"null\"\n".parse().unwrap();
        assert_eq!(config.sound_profile().record_device, None);
        assert_eq!(
            config.sound_profile().playback_device,
            "plughw:CARD=seeed2micvoicec"
        );

        let config: NabConfig = "[sound]\nrecord_device = \"default\"\n".parse().unwrap();
        assert_eq!(config.sound_profile().record_device.as_deref(), Some("default"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = "hardware_model = \"2020\"".parse::<NabConfig>().unwrap_err();
        assert!(matches!(err, CoreError::ConfigParse(_)));

        let err = "[ears]\nsteps = 1\n".parse::<NabConfig>().unwrap_err();
        assert!(matches!(err, CoreError::Ears(_)));
        assert!(err.is_fatal());

        let err = "[ears]\nstep = 17\n".parse::<NabConfig>().unwrap_err();
        assert!(matches!(err, CoreError::ConfigParse(_)));
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nabcore.toml");
        let mut config = NabConfig::default();
        config.ears.steps = 20;
        config.sound.record_device = Some("null".into());
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        assert_eq!(NabConfig::load(&path).unwrap(), config);

        let err = NabConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }
}
