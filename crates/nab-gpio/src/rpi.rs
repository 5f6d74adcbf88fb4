//! Raspberry Pi GPIO 后端（rppal）
//!
//! 编码器输入使用 rppal 的异步中断（独立的中断线程回调），电机输出为普通推挽输出。
//! 引脚对象 drop 时 rppal 会把引脚恢复为原始模式，因此 `release()` 只需停止电机
//! 并拉低使能。

use crate::{EdgeCallback, Ear, EncoderBank, GpioBoard, GpioError, MotorBank, MotorDrive, PinLayout};
use rppal::gpio::{Event, Gpio, InputPin, OutputPin, Trigger};
use tracing::{debug, info, warn};

fn pin_error(pin: u8, e: rppal::gpio::Error) -> GpioError {
    GpioError::Pin {
        pin,
        message: e.to_string(),
    }
}

/// Raspberry Pi 板卡
pub struct RpiBoard {
    gpio: Gpio,
    layout: PinLayout,
}

impl RpiBoard {
    /// 打开 GPIO 外设
    ///
    /// # 错误
    /// - `GpioError::Unavailable`: 非树莓派平台或无 `/dev/gpiomem` 权限
    pub fn new(layout: PinLayout) -> Result<Self, GpioError> {
        let gpio = Gpio::new().map_err(|e| GpioError::Unavailable(e.to_string()))?;
        Ok(Self { gpio, layout })
    }

    fn input(&self, pin: u8) -> Result<InputPin, GpioError> {
        Ok(self.gpio.get(pin).map_err(|e| pin_error(pin, e))?.into_input())
    }

    fn output(&self, pin: u8, high: bool) -> Result<OutputPin, GpioError> {
        let pin_obj = self.gpio.get(pin).map_err(|e| pin_error(pin, e))?;
        Ok(if high {
            pin_obj.into_output_high()
        } else {
            pin_obj.into_output_low()
        })
    }
}

impl GpioBoard for RpiBoard {
    type Encoders = RpiEncoders;
    type Motors = RpiMotors;

    fn split(self) -> Result<(RpiEncoders, RpiMotors), GpioError> {
        let layout = self.layout;

        let encoders = RpiEncoders {
            pins: [
                self.input(layout.encoder_pins[0])?,
                self.input(layout.encoder_pins[1])?,
            ],
            numbers: layout.encoder_pins,
        };

        // 方向引脚先拉低，再打开使能，避免上电瞬间误转
        let motor_pins = [
            [
                self.output(layout.motor_pins[0][0], false)?,
                self.output(layout.motor_pins[0][1], false)?,
            ],
            [
                self.output(layout.motor_pins[1][0], false)?,
                self.output(layout.motor_pins[1][1], false)?,
            ],
        ];
        let enable = [
            self.output(layout.enable_pins[0], true)?,
            self.output(layout.enable_pins[1], true)?,
        ];

        info!(
            "GPIO configured: encoders {:?}, motors {:?}, enable {:?}",
            layout.encoder_pins, layout.motor_pins, layout.enable_pins
        );

        Ok((
            encoders,
            RpiMotors {
                pins: motor_pins,
                enable,
                released: false,
            },
        ))
    }
}

/// 编码器输入（上升沿中断）
pub struct RpiEncoders {
    pins: [InputPin; 2],
    numbers: [u8; 2],
}

impl EncoderBank for RpiEncoders {
    fn on_rising_edge(&mut self, ear: Ear, mut callback: EdgeCallback) -> Result<(), GpioError> {
        let pin = self.numbers[ear.index()];
        self.pins[ear.index()]
            .set_async_interrupt(Trigger::RisingEdge, None, move |_event: Event| callback())
            .map_err(|e| GpioError::EdgeDetection {
                pin,
                message: e.to_string(),
            })?;
        debug!("Rising edge detection enabled on pin {} ({} ear)", pin, ear);
        Ok(())
    }

    fn release(&mut self) {
        for (pin, number) in self.pins.iter_mut().zip(self.numbers) {
            if let Err(e) = pin.clear_async_interrupt() {
                warn!("Failed to clear interrupt on pin {}: {}", number, e);
            }
        }
    }
}

/// 电机输出（H 桥方向引脚 + 使能引脚）
pub struct RpiMotors {
    pins: [[OutputPin; 2]; 2],
    enable: [OutputPin; 2],
    released: bool,
}

impl MotorBank for RpiMotors {
    fn drive(&mut self, ear: Ear, drive: MotorDrive) -> Result<(), GpioError> {
        if self.released {
            return Err(GpioError::Released);
        }
        let levels = drive.levels();
        for (pin, level) in self.pins[ear.index()].iter_mut().zip(levels) {
            if level {
                pin.set_high();
            } else {
                pin.set_low();
            }
        }
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        for pair in self.pins.iter_mut() {
            for pin in pair.iter_mut() {
                pin.set_low();
            }
        }
        for pin in self.enable.iter_mut() {
            pin.set_low();
        }
        self.released = true;
        info!("Motor outputs released");
    }
}
