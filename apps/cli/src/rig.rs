//! 硬件装配
//!
//! 每个命令独立执行：
//! 1. 读取配置
//! 2. 初始化硬件（真实或模拟）
//! 3. 执行操作
//! 4. 关闭硬件

use anyhow::{Context, Result};
use nab_core::{NabConfig, NabCore};

/// 已初始化的硬件
///
/// 模拟模式下同时持有耳朵模拟器，drop 时停止模拟线程。
pub struct Rig {
    pub core: NabCore,
    #[cfg(feature = "simulate")]
    _simulator: Option<nab_gpio::mock::EarSimulator>,
}

impl Rig {
    pub fn open(config: &NabConfig, simulate: bool) -> Result<Self> {
        if simulate {
            return Self::simulated(config);
        }
        Self::hardware(config)
    }

    #[cfg(feature = "hardware")]
    fn hardware(config: &NabConfig) -> Result<Self> {
        let core = NabCore::initialize_hardware(config).context("硬件初始化失败")?;
        Ok(Self {
            core,
            #[cfg(feature = "simulate")]
            _simulator: None,
        })
    }

    #[cfg(not(feature = "hardware"))]
    fn hardware(_config: &NabConfig) -> Result<Self> {
        anyhow::bail!("nab-cli 未启用 `hardware` feature，请使用 --simulate")
    }

    #[cfg(feature = "simulate")]
    fn simulated(config: &NabConfig) -> Result<Self> {
        use nab_gpio::mock::{EarSimulator, MockBoard};
        use nab_sound::mock::MockPcmBackend;
        use std::sync::Arc;
        use std::time::Duration;

        let ears = config.ears_config();
        let steps = u32::try_from(ears.steps).context("steps 必须为正数")?;
        // 孔间隔取阈值的 5/8：经过缺孔时约为阈值的 5/4
        let step_interval = ears.missing_hole_threshold * 5 / 8;
        // 一个周期（1/10 秒）的写入耗时，模拟实时播放
        let backend = MockPcmBackend::new().with_write_delay(Duration::from_millis(100));

        let (board, handle) = MockBoard::new();
        let core = NabCore::initialize(config, board, Arc::new(backend))
            .context("模拟硬件初始化失败")?;
        let simulator = EarSimulator::start(handle, steps, step_interval, [3, steps / 2]);
        tracing::info!("Simulated ears: {} holes, {:?} per hole", steps, step_interval);
        Ok(Self {
            core,
            _simulator: Some(simulator),
        })
    }

    #[cfg(not(feature = "simulate"))]
    fn simulated(_config: &NabConfig) -> Result<Self> {
        anyhow::bail!("nab-cli 未启用 `simulate` feature")
    }

    /// 停止音频会话和电机，释放 GPIO
    pub async fn close(self) {
        self.core.shutdown().await;
    }
}

/// 只打开 PCM 后端（声卡检测 / 自检用，不触碰 GPIO）
pub fn pcm_backend(simulate: bool) -> Result<std::sync::Arc<dyn nab_sound::PcmBackend>> {
    if simulate {
        #[cfg(feature = "simulate")]
        return Ok(std::sync::Arc::new(nab_sound::mock::MockPcmBackend::new()));
        #[cfg(not(feature = "simulate"))]
        anyhow::bail!("nab-cli 未启用 `simulate` feature");
    }
    #[cfg(feature = "hardware")]
    return Ok(std::sync::Arc::new(nab_sound::AlsaBackend::new()));
    #[cfg(not(feature = "hardware"))]
    anyhow::bail!("nab-cli 未启用 `hardware` feature，请使用 --simulate");
}
