//! 两轴耳朵控制器：归零与寻位
//!
//! 所有轴状态由一把互斥锁保护，编码器回调（中断线程）和运动线程共享；
//! 同一把锁上的条件变量用于"目标到达 / 双轴停止 / 归零进度"通知。
//!
//! 除编码器桥在到达目标时停止电机外，所有引脚写操作都在运动线程上执行。

use crate::config::EarsConfig;
use crate::error::EarsError;
use crate::state::{EarAxis, EarEvent, EarsState, Rotation};
use nab_gpio::{Ear, GpioError, MotorBank, MotorDrive};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// 移动事件接收端（只能被取走一次）
pub type EarEvents = mpsc::Receiver<EarEvent>;

/// 互斥锁保护的内容：两轴状态 + 电机输出
pub(crate) struct Axes {
    pub(crate) axes: [EarAxis; 2],
    motors: Box<dyn MotorBank>,
}

impl Axes {
    fn axis_mut(&mut self, ear: Ear) -> &mut EarAxis {
        &mut self.axes[ear.index()]
    }

    fn any_running(&self) -> bool {
        self.axes.iter().any(|axis| axis.running)
    }

    fn start_motor(&mut self, ear: Ear, drive: MotorDrive) -> Result<(), GpioError> {
        self.motors.drive(ear, drive)?;
        let axis = self.axis_mut(ear);
        axis.running = true;
        axis.direction = drive;
        debug!("{} ear motor started {:?} (target {:?})", ear, drive, axis.target);
        Ok(())
    }

    /// 停止电机（编码器回调中调用，失败只记录日志）
    pub(crate) fn stop_motor(&mut self, ear: Ear) {
        if let Err(e) = self.motors.drive(ear, MotorDrive::Off) {
            error!("Failed to stop {} ear motor: {}", ear, e);
        }
        let axis = self.axis_mut(ear);
        axis.running = false;
        axis.direction = MotorDrive::Off;
        debug!("{} ear motor stopped at {:?}", ear, axis.position);
    }
}

/// 两轴耳朵控制器
///
/// 阻塞方法（`detect_positions`、`go`、`wait_while_running` 等）只应在
/// [`MotionWorker`](crate::MotionWorker) 上调用。
pub struct EarAxisController {
    pub(crate) axes: Mutex<Axes>,
    pub(crate) cv: Condvar,
    pub(crate) config: EarsConfig,
    events: mpsc::Sender<EarEvent>,
    dropped_events: AtomicU64,
}

impl EarAxisController {
    /// 创建控制器
    ///
    /// 返回控制器和移动事件接收端。两轴位置初始为未知。
    pub fn new(
        motors: Box<dyn MotorBank>,
        config: EarsConfig,
    ) -> Result<(Self, EarEvents), EarsError> {
        config.validate()?;
        let (events, events_rx) = mpsc::channel(config.event_capacity);
        let controller = Self {
            axes: Mutex::new(Axes {
                axes: [EarAxis::default(); 2],
                motors,
            }),
            cv: Condvar::new(),
            config,
            events,
            dropped_events: AtomicU64::new(0),
        };
        Ok((controller, events_rx))
    }

    pub fn config(&self) -> &EarsConfig {
        &self.config
    }

    /// 当前状态快照
    pub fn state(&self) -> EarsState {
        EarsState {
            axes: self.axes.lock().axes,
        }
    }

    /// 因通道已满而丢弃的移动事件数
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    pub(crate) fn emit(&self, event: EarEvent) {
        if self.events.try_send(event).is_err() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            trace!("Ear event dropped: {:?}", event);
        }
    }

    /// 确定两轴位置
    ///
    /// 只对位置未知的轴执行归零（回到起点），已知时直接返回当前位置。
    pub fn detect_positions(&self) -> Result<(i32, i32), EarsError> {
        if self.state().positions_known() {
            return self.positions();
        }
        self.run_detection([None, None])
    }

    /// 忘记两轴位置并重新归零到指定目标
    pub fn reset(&self, targets: [Option<i32>; 2]) -> Result<(i32, i32), EarsError> {
        {
            let mut guard = self.axes.lock();
            for axis in guard.axes.iter_mut() {
                axis.position = None;
            }
        }
        self.run_detection(targets)
    }

    /// 启动寻位，不等待完成
    ///
    /// 任一轴位置未知时先完整归零到 (0, 0)。目标与当前位置模 `steps` 相同时：
    /// 目标在 `[0, steps)` 内则不动作，否则按一圈归一化后启动电机。
    /// 寻位过程中重新设置目标不会停止电机。
    pub fn go(&self, ear: Ear, position: i32, rotation: Rotation) -> Result<(), EarsError> {
        if !self.state().positions_known() {
            self.run_detection([Some(0), Some(0)])?;
        }
        let steps = self.config.steps;
        let mut guard = self.axes.lock();
        let axis = guard.axis_mut(ear);
        axis.target = Some(position);
        if axis.position == Some(position.rem_euclid(steps)) {
            if position >= steps {
                axis.target = Some(position - steps);
            } else if position < 0 {
                axis.target = Some(position + steps);
            } else {
                trace!("{} ear already at {}", ear, position);
                return Ok(());
            }
        }
        guard.start_motor(ear, rotation.into())?;
        Ok(())
    }

    /// 相对当前目标移动 `delta` 个孔位
    pub fn move_by(&self, ear: Ear, delta: i32, rotation: Rotation) -> Result<(), EarsError> {
        if !self.state().positions_known() {
            self.run_detection([Some(0), Some(0)])?;
        }
        let base = {
            let guard = self.axes.lock();
            let axis = &guard.axes[ear.index()];
            axis.target.or(axis.position).unwrap_or(0)
        };
        self.go(ear, base + delta, rotation)
    }

    /// 寻位并等待双轴停止，返回该轴最终位置
    pub fn goto(&self, ear: Ear, position: i32, rotation: Rotation) -> Result<i32, EarsError> {
        self.go(ear, position, rotation)?;
        self.wait_while_running();
        self.state().axis(ear).position.ok_or(EarsError::PositionUnknown(ear))
    }

    /// 阻塞直到两个电机都停止
    pub fn wait_while_running(&self) {
        let mut guard = self.axes.lock();
        while guard.any_running() {
            self.cv.wait(&mut guard);
        }
    }

    /// 停止两个电机并释放输出引脚
    pub fn shutdown(&self) {
        let mut guard = self.axes.lock();
        for ear in Ear::ALL {
            if guard.axes[ear.index()].running {
                guard.stop_motor(ear);
            }
        }
        guard.motors.release();
        self.cv.notify_all();
        info!("Ear motors shut down");
    }

    fn positions(&self) -> Result<(i32, i32), EarsError> {
        let state = self.state();
        let left = state.axes[0]
            .position
            .ok_or(EarsError::PositionUnknown(Ear::Left))?;
        let right = state.axes[1]
            .position
            .ok_or(EarsError::PositionUnknown(Ear::Right))?;
        Ok((left, right))
    }

    /// 归零循环
    ///
    /// 位置未知的轴置为 0、清空目标并正转。之后在条件变量上以 `poll_interval`
    /// 为超时等待：
    /// - 被唤醒且位置有变化：与上一个上升沿的间隔超过阈值说明刚经过缺孔，
    ///   目标设为请求目标或 `(direction - position) mod steps`，位置设为 `direction`
    /// - 超时：距上一个上升沿超过阈值说明停在缺孔上，
    ///   目标设为请求目标或 `(-position) mod steps`，位置设为 0
    ///
    /// 两个电机都停止后返回。
    fn run_detection(&self, targets: [Option<i32>; 2]) -> Result<(i32, i32), EarsError> {
        let steps = self.config.steps;
        let threshold = self.config.missing_hole_threshold;

        let mut guard = self.axes.lock();
        let mut homing = [false; 2];
        for ear in Ear::ALL {
            let axis = guard.axis_mut(ear);
            if axis.position.is_none() {
                homing[ear.index()] = true;
                axis.position = Some(0);
                axis.target = None;
                guard.start_motor(ear, MotorDrive::Forward)?;
                debug!("Homing {} ear (requested target {:?})", ear, targets[ear.index()]);
            }
        }

        let start = Instant::now();
        let mut previous_edges = [start; 2];
        let mut seen = [guard.axes[0].position, guard.axes[1].position];

        while guard.any_running() {
            if let Some(limit) = self.config.homing_timeout
                && start.elapsed() > limit
            {
                for ear in Ear::ALL {
                    if guard.axes[ear.index()].running {
                        guard.stop_motor(ear);
                    }
                    if homing[ear.index()] {
                        guard.axis_mut(ear).position = None;
                    }
                }
                self.cv.notify_all();
                warn!("Homing timed out after {:?}", limit);
                return Err(EarsError::HomingTimeout(limit));
            }

            let timed_out = self
                .cv
                .wait_for(&mut guard, self.config.poll_interval)
                .timed_out();
            let now = Instant::now();

            for ear in Ear::ALL {
                let i = ear.index();
                let axis = guard.axes[i];
                if axis.target.is_some() {
                    continue;
                }
                if !timed_out {
                    if axis.position != seen[i] {
                        if now - previous_edges[i] > threshold {
                            let increment = axis.direction.increment();
                            let position = axis.position.unwrap_or(0);
                            let target = targets[i]
                                .unwrap_or_else(|| (increment - position).rem_euclid(steps));
                            let axis = guard.axis_mut(ear);
                            axis.target = Some(target);
                            axis.position = Some(increment.rem_euclid(steps));
                            debug!("{} ear passed the missing hole, target {}", ear, target);
                        }
                        seen[i] = guard.axes[i].position;
                        previous_edges[i] = now;
                    }
                } else if now - previous_edges[i] > threshold {
                    let position = axis.position.unwrap_or(0);
                    let target = targets[i].unwrap_or_else(|| (-position).rem_euclid(steps));
                    let axis = guard.axis_mut(ear);
                    axis.target = Some(target);
                    axis.position = Some(0);
                    debug!("{} ear sits on the missing hole, target {}", ear, target);
                }
            }
        }
        drop(guard);

        let positions = self.positions()?;
        info!("Ear positions detected: {:?}", positions);
        Ok(positions)
    }
}
