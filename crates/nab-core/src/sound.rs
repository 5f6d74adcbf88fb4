//! 音频引擎：单一活动会话（播放或录音）
//!
//! 会话在专用音频线程上运行阻塞管线，通过 `AtomicBool` 运行标志协作取消，
//! 完成结果经 `watch` 通道广播，因此停止方和等待方可以同时等待同一个会话。
//! 启动新会话前总是先停止并等待旧会话结束（设备已释放）。

use crate::CoreError;
use nab_sound::{
    FrameConsumer, PcmBackend, PlaybackPipeline, RecordPipeline, SoundError, SoundProfile,
    open_source, raise_thread_priority,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, watch};
use tracing::{error, info, warn};

/// 会话类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Playback,
    Recording,
}

/// 会话结束方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// 播放到结尾并排空 / 录音在停止请求后正常结束
    Completed,
    /// 播放被提前停止
    Stopped,
    /// 会话因错误结束（设备已关闭）
    Failed(SoundError),
}

struct Session {
    kind: SessionKind,
    active: Arc<AtomicBool>,
    done: watch::Receiver<Option<SessionOutcome>>,
}

impl Session {
    fn is_finished(&self) -> bool {
        self.done.borrow().is_some()
    }
}

/// 等待会话结束
async fn wait_done(mut done: watch::Receiver<Option<SessionOutcome>>) -> SessionOutcome {
    match done.wait_for(Option::is_some).await {
        Ok(outcome) => outcome.clone().unwrap_or(SessionOutcome::Completed),
        // 音频线程未发送结果就退出（panic）
        Err(_) => SessionOutcome::Failed(SoundError::Worker(
            "audio worker exited unexpectedly".into(),
        )),
    }
}

/// 音频引擎
///
/// drop 时只清除运行标志，不等待音频线程退出；需要确认设备已释放时
/// 先调用 `NabCore::shutdown`（或 `stop_playing` / `stop_recording`）。
pub struct AudioEngine {
    backend: Arc<dyn PcmBackend>,
    profile: SoundProfile,
    session: Mutex<Option<Session>>,
}

impl AudioEngine {
    pub fn new(backend: Arc<dyn PcmBackend>, profile: SoundProfile) -> Self {
        Self {
            backend,
            profile,
            session: Mutex::new(None),
        }
    }

    /// 执行设备自检后创建引擎
    ///
    /// # 错误
    /// - `SoundError::SelfTest`: 播放或录音格式无法配置（致命）
    pub fn with_self_test(
        backend: Arc<dyn PcmBackend>,
        profile: SoundProfile,
    ) -> Result<Self, CoreError> {
        profile.self_test(backend.as_ref())?;
        Ok(Self::new(backend, profile))
    }

    pub fn profile(&self) -> &SoundProfile {
        &self.profile
    }

    /// 停止当前会话（如有）并播放文件，不等待播放结束
    ///
    /// 音源在音频线程上打开；打开或格式错误通过 [`wait_until_done`](Self::wait_until_done) 报告。
    pub async fn start_playing_preloaded(&self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let pipeline =
            PlaybackPipeline::new(self.backend.clone(), self.profile.playback_device.clone());

        let mut session = self.session.lock().await;
        Self::stop_session(session.take()).await;

        info!("Playing {}", path.display());
        let started = Self::spawn_session(SessionKind::Playback, "sound-playback", move |active| {
            let source = open_source(&path)?;
            let report = pipeline.run(source, active)?;
            Ok(if report.stopped {
                SessionOutcome::Stopped
            } else {
                SessionOutcome::Completed
            })
        })?;
        *session = Some(started);
        Ok(())
    }

    /// 播放文件并等待结束
    pub async fn play(&self, path: impl AsRef<Path>) -> Result<SessionOutcome, CoreError> {
        self.start_playing_preloaded(path).await?;
        Ok(self
            .wait_until_done()
            .await?
            .unwrap_or(SessionOutcome::Completed))
    }

    /// 停止播放并等待设备释放（幂等）
    ///
    /// 返回被停止会话的结束方式；没有播放会话时返回 `None`。
    pub async fn stop_playing(&self) -> Option<SessionOutcome> {
        self.stop_kind(SessionKind::Playback).await
    }

    /// 停止当前会话（如有）并开始录音，每个周期回调一次 `consumer`
    ///
    /// # 错误
    /// - `SoundError::NoCaptureDevice`: 当前硬件版本没有录音设备
    pub async fn start_recording(&self, mut consumer: FrameConsumer) -> Result<(), CoreError> {
        let device = self
            .profile
            .record_device
            .clone()
            .ok_or(SoundError::NoCaptureDevice)?;
        let pipeline = RecordPipeline::new(self.backend.clone(), device);

        let mut session = self.session.lock().await;
        Self::stop_session(session.take()).await;

        info!("Recording started");
        let started = Self::spawn_session(SessionKind::Recording, "sound-record", move |active| {
            pipeline.run(&mut *consumer, active)?;
            Ok(SessionOutcome::Completed)
        })?;
        *session = Some(started);
        Ok(())
    }

    /// 停止录音并等待最终回调完成（幂等）
    pub async fn stop_recording(&self) -> Option<SessionOutcome> {
        self.stop_kind(SessionKind::Recording).await
    }

    /// 等待当前会话结束（不停止）
    ///
    /// 没有会话时返回 `Ok(None)`。致命错误（不支持的格式等）以 `Err` 返回，
    /// 其它错误作为 `SessionOutcome::Failed` 正常返回。
    pub async fn wait_until_done(&self) -> Result<Option<SessionOutcome>, CoreError> {
        let done = {
            let session = self.session.lock().await;
            match session.as_ref() {
                Some(session) => session.done.clone(),
                None => return Ok(None),
            }
        };
        match wait_done(done).await {
            SessionOutcome::Failed(e) if e.is_fatal() => Err(CoreError::Sound(e)),
            outcome => Ok(Some(outcome)),
        }
    }

    /// 当前正在运行的会话类型
    pub async fn current_session(&self) -> Option<SessionKind> {
        let session = self.session.lock().await;
        session
            .as_ref()
            .filter(|session| !session.is_finished())
            .map(|session| session.kind)
    }

    /// 是否有会话正在运行
    pub async fn is_busy(&self) -> bool {
        self.current_session().await.is_some()
    }

    async fn stop_kind(&self, kind: SessionKind) -> Option<SessionOutcome> {
        let mut session = self.session.lock().await;
        if session.as_ref().is_none_or(|s| s.kind != kind) {
            return None;
        }
        Self::stop_session(session.take()).await
    }

    async fn stop_session(session: Option<Session>) -> Option<SessionOutcome> {
        let session = session?;
        session.active.store(false, Ordering::Release);
        let outcome = wait_done(session.done).await;
        info!("{:?} session ended: {:?}", session.kind, outcome);
        Some(outcome)
    }

    fn spawn_session<F>(
        kind: SessionKind,
        thread_name: &'static str,
        body: F,
    ) -> Result<Session, CoreError>
    where
        F: FnOnce(&AtomicBool) -> Result<SessionOutcome, SoundError> + Send + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        let (done_tx, done) = watch::channel(None);
        let flag = active.clone();
        std::thread::Builder::new()
            .name(thread_name.into())
            .spawn(move || {
                raise_thread_priority(thread_name);
                let outcome = body(&flag).unwrap_or_else(|e| {
                    if e.is_fatal() {
                        error!("{:?} session failed (fatal): {}", kind, e);
                    } else {
                        error!("{:?} session failed: {}", kind, e);
                    }
                    SessionOutcome::Failed(e)
                });
                flag.store(false, Ordering::Release);
                done_tx.send_replace(Some(outcome));
            })
            .map_err(|e| SoundError::Worker(e.to_string()))?;
        Ok(Session { kind, active, done })
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take()
            && !session.is_finished()
        {
            warn!("{:?} session still running on drop, stopping", session.kind);
            session.active.store(false, Ordering::Release);
        }
    }
}
