//! 运动线程
//!
//! 单一专用线程串行执行所有物理运动序列（归零、寻位并等待）。任务通过
//! crossbeam 通道提交，结果通过 oneshot 返回，异步调用方可以直接 `.await`。

use crate::controller::EarAxisController;
use crate::error::EarsError;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, trace, warn};

type Job = Box<dyn FnOnce(&EarAxisController) + Send + 'static>;

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 运动线程
pub struct MotionWorker {
    /// drop 时先关闭通道再 join，线程才能收到 Disconnected 退出
    job_tx: Option<Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl MotionWorker {
    /// 启动运动线程
    pub fn spawn(controller: Arc<EarAxisController>) -> Result<Self, EarsError> {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let thread = std::thread::Builder::new()
            .name("ears-motion".into())
            .spawn(move || motion_loop(controller, job_rx))
            .map_err(EarsError::Spawn)?;
        Ok(Self {
            job_tx: Some(job_tx),
            thread: Some(thread),
        })
    }

    /// 提交任务，返回结果 future
    ///
    /// 任务按提交顺序执行。
    pub fn submit<F, R>(&self, job: F) -> Result<oneshot::Receiver<R>, EarsError>
    where
        F: FnOnce(&EarAxisController) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let job: Job = Box::new(move |controller| {
            // 调用方可能已放弃等待
            let _ = result_tx.send(job(controller));
        });
        self.job_tx
            .as_ref()
            .ok_or(EarsError::WorkerClosed)?
            .send(job)
            .map_err(|_| EarsError::WorkerClosed)?;
        Ok(result_rx)
    }

    /// 提交任务并阻塞等待结果（同步调用方使用，不能在异步上下文中调用）
    pub fn run<F, R>(&self, job: F) -> Result<R, EarsError>
    where
        F: FnOnce(&EarAxisController) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.submit(job)?
            .blocking_recv()
            .map_err(|_| EarsError::WorkerClosed)
    }
}

impl Drop for MotionWorker {
    fn drop(&mut self) {
        drop(self.job_tx.take());

        let join_timeout = Duration::from_secs(2);
        if let Some(handle) = self.thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "Motion worker panicked or failed to shut down within {:?}",
                join_timeout
            );
        }
    }
}

fn motion_loop(controller: Arc<EarAxisController>, jobs: Receiver<Job>) {
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;
        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => info!("Motion worker priority set to MAX (realtime)"),
            Err(e) => warn!(
                "Failed to set motion worker priority: {:?}. \
                 On Linux, you may need to run with CAP_SYS_NICE capability.",
                e
            ),
        }
    }

    info!("Motion worker started");
    while let Ok(job) = jobs.recv() {
        trace!("Motion job started");
        job(&controller);
    }
    if controller.state().any_running() {
        warn!("Motion worker exiting while a motor is running");
    }
    info!("Motion worker exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EarsConfig;
    use nab_gpio::mock::MockBoard;
    use nab_gpio::GpioBoard;

    fn controller() -> Arc<EarAxisController> {
        let (board, _handle) = MockBoard::new();
        let (_encoders, motors) = board.split().unwrap();
        let (controller, _events) =
            EarAxisController::new(Box::new(motors), EarsConfig::default()).unwrap();
        Arc::new(controller)
    }

    #[test]
    fn test_jobs_run_in_submission_order() {
        let worker = MotionWorker::spawn(controller()).unwrap();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let receivers: Vec<_> = (0..5)
            .map(|i| {
                let order = order.clone();
                worker
                    .submit(move |_| {
                        std::thread::sleep(Duration::from_millis(2));
                        order.lock().push(i);
                        i * 10
                    })
                    .unwrap()
            })
            .collect();

        let results: Vec<i32> = receivers
            .into_iter()
            .map(|rx| rx.blocking_recv().unwrap())
            .collect();
        assert_eq!(results, vec![0, 10, 20, 30, 40]);
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_jobs_run_on_worker_thread() {
        let worker = MotionWorker::spawn(controller()).unwrap();
        let name = worker
            .run(|_| std::thread::current().name().map(str::to_owned))
            .unwrap();
        assert_eq!(name.as_deref(), Some("ears-motion"));
    }

    #[tokio::test]
    async fn test_submit_is_awaitable() {
        let worker = MotionWorker::spawn(controller()).unwrap();
        let state = worker.submit(|c| c.state()).unwrap().await.unwrap();
        assert!(!state.positions_known());
    }

    #[test]
    fn test_drop_joins_worker() {
        let worker = MotionWorker::spawn(controller()).unwrap();
        worker.run(|_| ()).unwrap();
        drop(worker);
    }
}
