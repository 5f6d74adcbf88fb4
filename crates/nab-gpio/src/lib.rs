//! # nab-gpio
//!
//! 耳朵电机与光电编码器的 GPIO 硬件抽象层。
//!
//! 每只耳朵对应：
//! - 1 个编码器输入引脚（上升沿触发中断）
//! - 2 个电机方向输出引脚（H 桥，同一时刻最多一个为高电平，全低 = 停止）
//! - 1 个电机使能输出引脚（进程生命周期内保持高电平）
//!
//! 板卡通过 [`GpioBoard::split`] 拆分为 [`EncoderBank`]（中断回调注册）和
//! [`MotorBank`]（电机输出），分别交给编码器桥和电机控制器持有。

use std::fmt;
use thiserror::Error;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(all(feature = "rpi", target_os = "linux"))]
pub mod rpi;

#[cfg(all(feature = "rpi", target_os = "linux"))]
pub use rpi::{RpiBoard, RpiEncoders, RpiMotors};

/// 耳朵标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ear {
    Left = 0,
    Right = 1,
}

impl Ear {
    /// 两只耳朵（按索引顺序）
    pub const ALL: [Ear; 2] = [Ear::Left, Ear::Right];

    /// 数组索引（Left = 0, Right = 1）
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// 从索引转换，越界返回 `None`
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Ear::Left),
            1 => Some(Ear::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Ear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ear::Left => write!(f, "left"),
            Ear::Right => write!(f, "right"),
        }
    }
}

/// 电机驱动状态
///
/// 同时作为耳朵的"当前方向"：编码器每个上升沿按 [`increment`](Self::increment)
/// 推进位置。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotorDrive {
    /// 停止（两个方向引脚均为低电平）
    #[default]
    Off,
    /// 正转
    Forward,
    /// 反转
    Backward,
}

impl MotorDrive {
    /// 编码器单步增量：正转 +1，反转 -1，停止 0
    #[inline]
    pub const fn increment(self) -> i32 {
        match self {
            MotorDrive::Off => 0,
            MotorDrive::Forward => 1,
            MotorDrive::Backward => -1,
        }
    }

    /// H 桥两个方向引脚的电平 `[pin0, pin1]`
    #[inline]
    pub const fn levels(self) -> [bool; 2] {
        match self {
            MotorDrive::Off => [false, false],
            MotorDrive::Forward => [true, false],
            MotorDrive::Backward => [false, true],
        }
    }

    pub const fn is_running(self) -> bool {
        !matches!(self, MotorDrive::Off)
    }
}

/// 引脚布局（BCM 编号）
///
/// 随硬件版本变化，在初始化时固定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinLayout {
    /// 编码器输入引脚 `[left, right]`
    pub encoder_pins: [u8; 2],
    /// 电机方向引脚 `[[left_a, left_b], [right_a, right_b]]`
    pub motor_pins: [[u8; 2]; 2],
    /// 电机使能引脚 `[left, right]`
    pub enable_pins: [u8; 2],
}

impl Default for PinLayout {
    fn default() -> Self {
        Self {
            encoder_pins: [24, 23],
            motor_pins: [[12, 11], [10, 9]],
            enable_pins: [5, 6],
        }
    }
}

/// 编码器上升沿回调
///
/// 在中断/事件线程中执行，实现必须只做加锁、更新、通知，不能阻塞。
pub type EdgeCallback = Box<dyn FnMut() + Send + 'static>;

/// 电机输出
pub trait MotorBank: Send {
    /// 设置电机驱动状态
    fn drive(&mut self, ear: Ear, drive: MotorDrive) -> Result<(), GpioError>;

    /// 释放输出引脚（停止电机、关闭使能）
    ///
    /// 默认实现：停止两个电机。
    fn release(&mut self) {
        for ear in Ear::ALL {
            let _ = self.drive(ear, MotorDrive::Off);
        }
    }
}

/// 编码器输入
pub trait EncoderBank: Send {
    /// 为指定耳朵注册上升沿回调
    ///
    /// # 错误
    /// - `GpioError::EdgeDetection`: 平台不支持边沿检测（启动阶段致命）
    fn on_rising_edge(&mut self, ear: Ear, callback: EdgeCallback) -> Result<(), GpioError>;

    /// 注销所有回调
    fn release(&mut self) {}
}

/// 可拆分的 GPIO 板卡
pub trait GpioBoard {
    type Encoders: EncoderBank + 'static;
    type Motors: MotorBank + 'static;

    /// 配置全部引脚并拆分为编码器输入和电机输出
    fn split(self) -> Result<(Self::Encoders, Self::Motors), GpioError>;
}

/// GPIO 错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpioError {
    /// GPIO 外设不可用（权限、非树莓派平台等）
    #[error("GPIO unavailable: {0}")]
    Unavailable(String),

    /// 边沿检测配置失败
    #[error("Could not set edge detection on pin {pin}: {message}")]
    EdgeDetection { pin: u8, message: String },

    /// 单个引脚操作失败
    #[error("GPIO pin {pin} error: {message}")]
    Pin { pin: u8, message: String },

    /// 引脚已释放
    #[error("GPIO pins already released")]
    Released,
}

impl GpioError {
    /// 启动阶段是否应当终止进程
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GpioError::Unavailable(_) | GpioError::EdgeDetection { .. }
        )
    }
}
