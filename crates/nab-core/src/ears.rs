//! 耳朵异步门面
//!
//! 每个操作先获取异步锁（按到达顺序排队），再提交到运动线程并等待结果，
//! 异步调度器本身从不阻塞。

use crate::CoreError;
use nab_ears::{Ear, EarAxisController, EarEvents, EarsDriver, EarsError, EarsState, Rotation};
use tokio::sync::Mutex;
use tracing::debug;

/// 耳朵异步门面
pub struct Ears {
    driver: EarsDriver,
    /// 串行化耳朵操作（tokio Mutex 公平，FIFO）
    lock: Mutex<()>,
}

impl Ears {
    pub fn new(driver: EarsDriver) -> Self {
        Self {
            driver,
            lock: Mutex::new(()),
        }
    }

    async fn run<F, R>(&self, job: F) -> Result<R, CoreError>
    where
        F: FnOnce(&EarAxisController) -> Result<R, EarsError> + Send + 'static,
        R: Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let result = self.driver.worker().submit(job)?;
        let result = result.await.map_err(|_| EarsError::WorkerClosed)?;
        Ok(result?)
    }

    /// 确定两耳位置（已知时直接返回）
    pub async fn detect_positions(&self) -> Result<(i32, i32), CoreError> {
        debug!("detect_positions");
        self.run(|c| c.detect_positions()).await
    }

    /// 忘记两耳位置并重新归零到指定目标
    pub async fn reset_ears(&self, left: i32, right: i32) -> Result<(i32, i32), CoreError> {
        debug!("reset_ears({}, {})", left, right);
        self.run(move |c| c.reset([Some(left), Some(right)])).await
    }

    /// 启动寻位，不等待电机停止
    pub async fn go(&self, ear: Ear, position: i32, rotation: Rotation) -> Result<(), CoreError> {
        self.run(move |c| c.go(ear, position, rotation)).await
    }

    /// 寻位并等待完成，返回最终位置
    pub async fn goto(&self, ear: Ear, position: i32, rotation: Rotation) -> Result<i32, CoreError> {
        debug!("goto({}, {}, {:?})", ear, position, rotation);
        self.run(move |c| c.goto(ear, position, rotation)).await
    }

    /// 相对当前目标移动
    pub async fn move_ear(&self, ear: Ear, delta: i32, rotation: Rotation) -> Result<(), CoreError> {
        self.run(move |c| c.move_by(ear, delta, rotation)).await
    }

    /// 等待两个电机都停止
    pub async fn wait_while_running(&self) -> Result<(), CoreError> {
        self.run(|c| {
            c.wait_while_running();
            Ok(())
        })
        .await
    }

    /// 当前状态快照（不排队）
    pub fn state(&self) -> EarsState {
        self.driver.controller().state()
    }

    pub fn steps(&self) -> i32 {
        self.driver.controller().config().steps
    }

    /// 取走手动移动事件接收端（只能取一次）
    pub fn take_events(&self) -> Option<EarEvents> {
        self.driver.take_events()
    }

    /// 停止电机并释放 GPIO（幂等）
    pub fn shutdown(&self) {
        self.driver.shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.driver.is_shut_down()
    }
}
