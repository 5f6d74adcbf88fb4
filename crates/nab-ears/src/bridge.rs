//! 编码器事件桥
//!
//! 在中断线程中处理每个上升沿：加锁、更新位置、按需通知。不做任何阻塞操作。

use crate::controller::EarAxisController;
use crate::error::EarsError;
use crate::state::EarEvent;
use nab_gpio::{Ear, EncoderBank};
use std::sync::Arc;
use tracing::trace;

/// 编码器事件桥
#[derive(Clone)]
pub struct EncoderEventBridge {
    controller: Arc<EarAxisController>,
}

impl EncoderEventBridge {
    /// 为两只耳朵注册上升沿回调
    ///
    /// # 错误
    /// - `EarsError::Gpio(GpioError::EdgeDetection)`: 边沿检测不可用（致命）
    pub fn attach(
        controller: Arc<EarAxisController>,
        encoders: &mut dyn EncoderBank,
    ) -> Result<Self, EarsError> {
        let bridge = Self { controller };
        for ear in Ear::ALL {
            let handler = bridge.clone();
            encoders.on_rising_edge(ear, Box::new(move || handler.on_rising_edge(ear)))?;
        }
        Ok(bridge)
    }

    /// 处理一个上升沿
    ///
    /// - 电机停止（耳朵被手动拨动）：位置置为未知，发送 `EarEvent::Moved`
    /// - 否则位置按方向推进一格（模 `steps`）：
    ///   - 正在归零：通知归零循环
    ///   - 到达目标：停止电机并通知
    ///   - 与目标同余但未到达：目标归一化一圈
    pub fn on_rising_edge(&self, ear: Ear) {
        let controller = &self.controller;
        let steps = controller.config.steps;
        let mut guard = controller.axes.lock();
        let i = ear.index();

        let increment = guard.axes[i].direction.increment();
        if increment == 0 {
            guard.axes[i].position = None;
            drop(guard);
            trace!("{} ear moved by hand", ear);
            controller.emit(EarEvent::Moved(ear));
            return;
        }

        let position = (guard.axes[i].position.unwrap_or(0) + increment).rem_euclid(steps);
        guard.axes[i].position = Some(position);
        trace!("{} ear edge, position {}", ear, position);

        match guard.axes[i].target {
            None => {
                controller.cv.notify_all();
            },
            Some(target) if position == target => {
                guard.stop_motor(ear);
                controller.cv.notify_all();
            },
            Some(target) if position == target.rem_euclid(steps) => {
                if target >= steps {
                    guard.axes[i].target = Some(target - steps);
                } else if target < 0 {
                    guard.axes[i].target = Some(target + steps);
                }
            },
            Some(_) => {},
        }
    }
}
