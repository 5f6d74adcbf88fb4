//! 声卡检测与自检

use anyhow::{Context, Result};
use nab_core::{NabConfig, SoundProfile};
use nab_sound::PcmBackend;

/// 检测声卡并按配置执行启动自检
pub fn execute(config: &NabConfig, backend: &dyn PcmBackend) -> Result<()> {
    match SoundProfile::detect(backend) {
        Ok((model, _)) if model.card_name() == config.hardware_model.card_name() => {
            println!("✅ 检测到声卡: {} ({})", model.card_name(), model);
        },
        Ok((model, _)) => {
            println!(
                "⚠️  检测到 {} 版本声卡，但配置为 {}",
                model, config.hardware_model
            );
        },
        Err(e) => println!("⚠️  {}", e),
    }

    let profile = config.sound_profile();
    println!("   播放设备: {}", profile.playback_device);
    println!(
        "   录音设备: {}",
        profile.record_device.as_deref().unwrap_or("无")
    );
    profile.self_test(backend).context("声卡自检失败")?;
    println!("✅ 自检通过");
    Ok(())
}

#[cfg(all(test, feature = "simulate"))]
mod tests {
    use super::*;
    use nab_sound::mock::MockPcmBackend;

    #[test]
    fn test_selftest_against_mock() {
        let config = NabConfig::default();
        execute(&config, &MockPcmBackend::new()).unwrap();

        let failing = MockPcmBackend::new().reject(1, 22_050);
        assert!(execute(&config, &failing).is_err());
    }
}
