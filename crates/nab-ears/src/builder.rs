//! Builder 模式实现
//!
//! 把 GPIO 板卡拆分、控制器、编码器桥和运动线程组装成 [`EarsDriver`]。

use crate::bridge::EncoderEventBridge;
use crate::config::EarsConfig;
use crate::controller::{EarAxisController, EarEvents};
use crate::error::EarsError;
use crate::worker::MotionWorker;
use nab_gpio::{EncoderBank, GpioBoard};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// EarsDriver Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use nab_ears::{EarsBuilder, EarsConfig};
/// use nab_gpio::mock::MockBoard;
///
/// let (board, _handle) = MockBoard::new();
/// let driver = EarsBuilder::new()
///     .config(EarsConfig::default().with_steps(17))
///     .build(board)
///     .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct EarsBuilder {
    config: EarsConfig,
}

impl EarsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置控制配置（可选，默认 [`EarsConfig::default`]）
    pub fn config(mut self, config: EarsConfig) -> Self {
        self.config = config;
        self
    }

    /// 配置引脚、注册编码器回调并启动运动线程
    ///
    /// # 错误
    /// - GPIO 初始化或边沿检测失败（致命）
    /// - 配置无效
    pub fn build<B: GpioBoard>(self, board: B) -> Result<EarsDriver, EarsError> {
        self.config.validate()?;
        let (mut encoders, motors) = board.split()?;
        let (controller, events) = EarAxisController::new(Box::new(motors), self.config)?;
        let controller = Arc::new(controller);

        EncoderEventBridge::attach(controller.clone(), &mut encoders)?;
        let worker = MotionWorker::spawn(controller.clone())?;

        info!(
            "Ears driver ready ({} steps per turn)",
            controller.config().steps
        );
        Ok(EarsDriver {
            controller,
            worker,
            encoders: Mutex::new(Box::new(encoders)),
            events: Mutex::new(Some(events)),
            shut_down: AtomicBool::new(false),
        })
    }
}

/// 组装完成的耳朵驱动
///
/// drop 时停止电机、注销编码器回调、释放引脚并等待运动线程退出。
pub struct EarsDriver {
    controller: Arc<EarAxisController>,
    worker: MotionWorker,
    encoders: Mutex<Box<dyn EncoderBank>>,
    events: Mutex<Option<EarEvents>>,
    shut_down: AtomicBool,
}

impl EarsDriver {
    pub fn controller(&self) -> &Arc<EarAxisController> {
        &self.controller
    }

    pub fn worker(&self) -> &MotionWorker {
        &self.worker
    }

    /// 取走移动事件接收端（只能取一次）
    pub fn take_events(&self) -> Option<EarEvents> {
        self.events.lock().take()
    }

    /// 停止电机并释放 GPIO（幂等）
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        self.encoders.lock().release();
        self.controller.shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl Drop for EarsDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
