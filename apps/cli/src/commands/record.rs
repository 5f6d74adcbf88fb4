//! 录音命令
//!
//! 录制 16 kHz 单声道 S16LE 到 WAV 文件

use crate::rig::Rig;
use anyhow::{Context, Result};
use clap::Args;
use nab_core::{FrameConsumer, SessionOutcome};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::error;

/// 录音命令参数
#[derive(Args, Debug)]
pub struct RecordCommand {
    /// 输出 WAV 文件路径
    #[arg(short, long)]
    pub output: PathBuf,

    /// 录音时长（秒），0 表示直到 Ctrl+C
    #[arg(short, long, default_value_t = 5)]
    pub duration: u64,
}

/// 把录音周期写入 WAV 文件的帧消费者，最终回调时完成文件
fn wav_consumer(path: &Path) -> Result<FrameConsumer> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: nab_sound::RECORD_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("创建 {} 失败", path.display()))?;
    let mut writer: Option<hound::WavWriter<BufWriter<File>>> = Some(writer);

    Ok(Box::new(move |pcm: &[u8], is_final: bool| {
        let Some(w) = writer.as_mut() else {
            return;
        };
        for sample in pcm.chunks_exact(2) {
            if let Err(e) = w.write_sample(i16::from_le_bytes([sample[0], sample[1]])) {
                error!("WAV write failed: {}", e);
                break;
            }
        }
        if is_final
            && let Some(w) = writer.take()
            && let Err(e) = w.finalize()
        {
            error!("WAV finalize failed: {}", e);
        }
    }))
}

impl RecordCommand {
    pub async fn execute(&self, rig: &Rig, interrupt: Arc<Notify>) -> Result<()> {
        let audio = rig.core.audio();
        audio
            .start_recording(wav_consumer(&self.output)?)
            .await
            .context("启动录音失败")?;
        println!("🎙️  录音中 (Ctrl+C 停止)...");

        if self.duration > 0 {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(self.duration)) => {
                    println!("\n⏱️  达到时长限制");
                },
                _ = interrupt.notified() => {},
            }
        } else {
            interrupt.notified().await;
        }

        match audio.stop_recording().await {
            Some(SessionOutcome::Failed(e)) => anyhow::bail!("录音中断: {}", e),
            _ => println!("✅ 已保存到 {}", self.output.display()),
        }
        Ok(())
    }
}
