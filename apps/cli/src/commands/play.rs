//! 播放命令

use crate::rig::Rig;
use anyhow::{Context, Result};
use clap::Args;
use nab_core::SessionOutcome;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;

/// 播放命令参数
#[derive(Args, Debug)]
pub struct PlayCommand {
    /// WAV 或 MP3 文件
    pub file: PathBuf,
}

impl PlayCommand {
    pub async fn execute(&self, rig: &Rig, interrupt: Arc<Notify>) -> Result<()> {
        let audio = rig.core.audio();
        println!("🔊 播放 {} (Ctrl+C 停止)", self.file.display());
        audio
            .start_playing_preloaded(&self.file)
            .await
            .context("启动播放失败")?;

        let outcome = tokio::select! {
            outcome = audio.wait_until_done() => outcome?,
            _ = interrupt.notified() => {
                println!("\n⏹️  停止播放...");
                audio.stop_playing().await
            },
        };

        match outcome {
            Some(SessionOutcome::Completed) | None => println!("✅ 播放完成"),
            Some(SessionOutcome::Stopped) => println!("✅ 已停止"),
            Some(SessionOutcome::Failed(e)) => anyhow::bail!("播放中断: {}", e),
        }
        Ok(())
    }
}
