//! # nab-ears
//!
//! 两轴耳朵闭环定位：
//!
//! - [`EarAxisController`]: 两轴状态、归零（缺孔检测）与寻位（带整圈的模运算目标）
//! - [`EncoderEventBridge`]: 编码器上升沿处理（中断线程）
//! - [`MotionWorker`]: 串行执行运动序列的专用线程
//! - [`EarsBuilder`] / [`EarsDriver`]: 从 GPIO 板卡组装完整驱动
//!
//! 编码盘每圈 `steps` 个孔加一个缺孔。归零时正转，通过相邻上升沿的间隔
//! 超过阈值（或长时间无上升沿）识别缺孔，从而确定绝对位置。

mod bridge;
mod builder;
mod config;
mod controller;
mod error;
mod state;
mod worker;

pub use bridge::EncoderEventBridge;
pub use builder::{EarsBuilder, EarsDriver};
pub use config::EarsConfig;
pub use controller::{EarAxisController, EarEvents};
pub use error::EarsError;
pub use state::{EarAxis, EarEvent, EarsState, MotorState, Rotation};
pub use worker::MotionWorker;

// 重新导出 GPIO 层常用类型
pub use nab_gpio::{Ear, MotorDrive};
