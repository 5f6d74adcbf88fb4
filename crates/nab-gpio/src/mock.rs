//! Mock GPIO 后端
//!
//! - [`MockBoard`] 记录所有电机驱动调用，保存编码器回调，测试通过
//!   [`MockHandle::fire_edge`] 手动注入上升沿。
//! - [`EarSimulator`] 在后台线程中模拟带缺孔的编码盘：电机运行时按固定间隔推进
//!   一个槽位，经过非缺孔槽位时触发上升沿。

use crate::{EdgeCallback, Ear, EncoderBank, GpioBoard, GpioError, MotorBank, MotorDrive};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::trace;

#[derive(Default)]
struct MockShared {
    drives: Mutex<[MotorDrive; 2]>,
    history: Mutex<Vec<(Ear, MotorDrive)>>,
    callbacks: Mutex<[Option<EdgeCallback>; 2]>,
    released: AtomicBool,
}

/// Mock 板卡
pub struct MockBoard {
    shared: Arc<MockShared>,
    fail_edge_detection: bool,
}

impl MockBoard {
    /// 创建板卡和测试端句柄
    pub fn new() -> (Self, MockHandle) {
        let shared = Arc::new(MockShared::default());
        (
            Self {
                shared: shared.clone(),
                fail_edge_detection: false,
            },
            MockHandle { shared },
        )
    }

    /// 模拟不支持边沿检测的平台
    pub fn failing_edge_detection(mut self) -> Self {
        self.fail_edge_detection = true;
        self
    }
}

impl GpioBoard for MockBoard {
    type Encoders = MockEncoders;
    type Motors = MockMotors;

    fn split(self) -> Result<(MockEncoders, MockMotors), GpioError> {
        Ok((
            MockEncoders {
                shared: self.shared.clone(),
                fail_edge_detection: self.fail_edge_detection,
            },
            MockMotors {
                shared: self.shared,
            },
        ))
    }
}

pub struct MockEncoders {
    shared: Arc<MockShared>,
    fail_edge_detection: bool,
}

impl EncoderBank for MockEncoders {
    fn on_rising_edge(&mut self, ear: Ear, callback: EdgeCallback) -> Result<(), GpioError> {
        if self.fail_edge_detection {
            return Err(GpioError::EdgeDetection {
                pin: ear.index() as u8,
                message: "edge detection not supported by mock board".into(),
            });
        }
        self.shared.callbacks.lock()[ear.index()] = Some(callback);
        Ok(())
    }

    fn release(&mut self) {
        let mut callbacks = self.shared.callbacks.lock();
        callbacks[0] = None;
        callbacks[1] = None;
    }
}

pub struct MockMotors {
    shared: Arc<MockShared>,
}

impl MotorBank for MockMotors {
    fn drive(&mut self, ear: Ear, drive: MotorDrive) -> Result<(), GpioError> {
        if self.shared.released.load(Ordering::Acquire) {
            return Err(GpioError::Released);
        }
        self.shared.drives.lock()[ear.index()] = drive;
        self.shared.history.lock().push((ear, drive));
        Ok(())
    }

    fn release(&mut self) {
        *self.shared.drives.lock() = [MotorDrive::Off; 2];
        self.shared.released.store(true, Ordering::Release);
    }
}

/// 测试端句柄：观察电机输出、注入编码器上升沿
#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<MockShared>,
}

impl MockHandle {
    /// 注入一个上升沿（同步执行已注册的回调）
    ///
    /// 未注册回调时静默忽略。
    pub fn fire_edge(&self, ear: Ear) {
        let mut callbacks = self.shared.callbacks.lock();
        if let Some(callback) = callbacks[ear.index()].as_mut() {
            callback();
        }
    }

    /// 当前电机驱动状态
    pub fn drive(&self, ear: Ear) -> MotorDrive {
        self.shared.drives.lock()[ear.index()]
    }

    /// 全部驱动调用记录
    pub fn history(&self) -> Vec<(Ear, MotorDrive)> {
        self.shared.history.lock().clone()
    }

    /// 指定耳朵的电机启动次数（非 `Off` 的驱动调用）
    pub fn starts(&self, ear: Ear) -> usize {
        self.shared
            .history
            .lock()
            .iter()
            .filter(|(e, d)| *e == ear && d.is_running())
            .count()
    }

    pub fn clear_history(&self) {
        self.shared.history.lock().clear();
    }

    pub fn has_callback(&self, ear: Ear) -> bool {
        self.shared.callbacks.lock()[ear.index()].is_some()
    }

    pub fn is_released(&self) -> bool {
        self.shared.released.load(Ordering::Acquire)
    }
}

struct SimState {
    slots: Mutex<[u32; 2]>,
    running: AtomicBool,
    steps: u32,
}

impl SimState {
    /// 缺孔槽位索引（编码盘共 `steps + 1` 个槽位，最后一个没有孔）
    fn gap(&self) -> u32 {
        self.steps
    }

    /// 推进一个槽位，返回新槽位是否有孔
    fn advance(&self, ear: Ear, drive: MotorDrive) -> bool {
        let slot_count = self.steps + 1;
        let mut slots = self.slots.lock();
        let slot = &mut slots[ear.index()];
        *slot = match drive {
            MotorDrive::Forward => (*slot + 1) % slot_count,
            MotorDrive::Backward => (*slot + slot_count - 1) % slot_count,
            MotorDrive::Off => *slot,
        };
        *slot != self.gap()
    }
}

/// 物理耳朵模拟器
///
/// 槽位 `0..steps` 各有一个孔，槽位 `steps` 为缺孔。从缺孔正转进入槽位 0
/// 产生的上升沿对应逻辑位置 1，即逻辑位置 `p` 对应槽位 `(p - 1) mod steps`。
pub struct EarSimulator {
    state: Arc<SimState>,
    thread: Option<JoinHandle<()>>,
}

impl EarSimulator {
    /// 启动模拟线程
    ///
    /// # 参数
    /// - `steps`: 每圈孔数
    /// - `step_interval`: 电机运行时相邻槽位的时间间隔
    /// - `initial_slots`: 两只耳朵的初始槽位 `[left, right]`（取值 `0..=steps`）
    pub fn start(
        handle: MockHandle,
        steps: u32,
        step_interval: Duration,
        initial_slots: [u32; 2],
    ) -> Self {
        let state = Arc::new(SimState {
            slots: Mutex::new([initial_slots[0] % (steps + 1), initial_slots[1] % (steps + 1)]),
            running: AtomicBool::new(true),
            steps,
        });

        let sim = state.clone();
        let thread = std::thread::Builder::new()
            .name("ear-simulator".into())
            .spawn(move || {
                while sim.running.load(Ordering::Acquire) {
                    std::thread::sleep(step_interval);
                    for ear in Ear::ALL {
                        let drive = handle.drive(ear);
                        if drive.is_running() && sim.advance(ear, drive) {
                            trace!("simulated edge on {} ear", ear);
                            handle.fire_edge(ear);
                        }
                    }
                }
            })
            .ok();

        Self { state, thread }
    }

    /// 当前槽位
    pub fn slot(&self, ear: Ear) -> u32 {
        self.state.slots.lock()[ear.index()]
    }

    /// 当前槽位对应的逻辑位置（缺孔视为 0）
    pub fn position(&self, ear: Ear) -> i32 {
        let slot = self.slot(ear);
        if slot == self.state.gap() {
            0
        } else {
            ((slot + 1) % self.state.steps) as i32
        }
    }

    /// 停止模拟线程
    pub fn stop(&mut self) {
        self.state.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EarSimulator {
    fn drop(&mut self) {
        self.stop();
    }
}
