//! # nab-sound
//!
//! 固定周期 PCM 播放 / 录音管线。
//!
//! - [`PlaybackPipeline`]: WAV / MP3 解码后按 1/10 秒周期写入设备，末尾补零
//! - [`RecordPipeline`]: 16 kHz 单声道 S16LE，每 100ms 回调一次帧消费者
//! - [`SoundProfile`]: 按硬件版本选择声卡设备并执行启动自检
//! - [`Asr`]: 录音数据到外部语音解码器的桥接
//!
//! 设备访问通过 [`PcmBackend`] 抽象：`alsa` feature 提供 ALSA 实现，
//! `mock` feature 提供记录事件的测试实现。
//!
//! 管线本身是阻塞的，由上层在专用音频线程上运行，并通过 `AtomicBool`
//! 运行标志在周期粒度上协作取消。

mod asr;
mod backend;
mod error;
mod format;
mod playback;
mod profile;
mod record;
mod source;

#[cfg(all(feature = "alsa", target_os = "linux"))]
mod alsa_pcm;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use asr::{Asr, SpeechDecoder, pcm_to_samples};
pub use backend::{PcmBackend, PcmReader, PcmWriter};
pub use error::SoundError;
pub use format::{PcmParams, SampleFormat, SoundFormat};
pub use playback::{PeriodChunker, PlaybackPipeline, PlaybackReport};
pub use profile::{HardwareModel, MODEL_2018_CARD_NAME, MODEL_2019_CARD_NAME, SoundProfile};
pub use record::{FrameConsumer, RECORD_PERIOD_FRAMES, RECORD_RATE, RecordPipeline, RecordReport};
pub use source::{Mp3Source, SoundSource, WavSource, open_source};

#[cfg(all(feature = "alsa", target_os = "linux"))]
pub use alsa_pcm::AlsaBackend;

/// 在当前线程上尝试提升调度优先级（`realtime` feature）
///
/// 失败只记录警告。
pub fn raise_thread_priority(thread_name: &str) {
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;
        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => tracing::info!("{} thread priority set to MAX (realtime)", thread_name),
            Err(e) => tracing::warn!(
                "Failed to set {} thread priority: {:?}. \
                 On Linux, you may need to run with CAP_SYS_NICE capability.",
                thread_name,
                e
            ),
        }
    }
    #[cfg(not(feature = "realtime"))]
    let _ = thread_name;
}
