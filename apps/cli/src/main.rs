//! # nab-cli
//!
//! 兔子耳朵与音频引擎的命令行工具。
//!
//! ```bash
//! # 写入默认配置
//! nab-cli config init --model 2019_tagtag
//!
//! # 模拟硬件上检测耳朵位置、寻位
//! nab-cli --simulate detect
//! nab-cli --simulate goto left 20
//!
//! # 播放 / 录音
//! nab-cli play boot.mp3
//! nab-cli record -o hello.wav -d 3
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;

mod commands;
mod rig;

use commands::{ConfigCommand, GotoCommand, MoveCommand, PlayCommand, RecordCommand, ResetCommand};
use rig::Rig;

/// nab-cli - 耳朵与音频命令行工具
#[derive(Parser, Debug)]
#[command(name = "nab-cli")]
#[command(about = "Drive the rabbit ears and audio engine", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件（默认 <config_dir>/nabcore/config.toml）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 使用模拟硬件
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 检测两耳位置
    Detect,

    /// 耳朵寻位到目标孔位
    Goto {
        #[command(flatten)]
        args: GotoCommand,
    },

    /// 耳朵相对移动
    Move {
        #[command(flatten)]
        args: MoveCommand,
    },

    /// 重新归零两耳
    Reset {
        #[command(flatten)]
        args: ResetCommand,
    },

    /// 播放 WAV / MP3
    Play {
        #[command(flatten)]
        args: PlayCommand,
    },

    /// 录音到 WAV
    Record {
        #[command(flatten)]
        args: RecordCommand,
    },

    /// 声卡检测与自检
    Selftest,
}

/// Ctrl+C 通知（处理函数在独立线程上运行）
fn interrupt_signal() -> Result<Arc<Notify>> {
    let notify = Arc::new(Notify::new());
    let handler = notify.clone();
    ctrlc::set_handler(move || handler.notify_one()).context("注册 Ctrl+C 处理失败")?;
    Ok(notify)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nab_cli=info,nab_core=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => commands::config::default_config_file()?,
    };

    if let Commands::Config(cmd) = cli.command {
        return cmd.execute(&config_path);
    }

    let config = commands::config::load_config(&config_path)?;

    if let Commands::Selftest = cli.command {
        let backend = rig::pcm_backend(cli.simulate)?;
        return commands::selftest::execute(&config, backend.as_ref());
    }

    let interrupt = interrupt_signal()?;
    let rig = Rig::open(&config, cli.simulate)?;
    let result = match cli.command {
        Commands::Detect => commands::ears::detect(&rig).await,
        Commands::Goto { args } => args.execute(&rig).await,
        Commands::Move { args } => args.execute(&rig).await,
        Commands::Reset { args } => args.execute(&rig).await,
        Commands::Play { args } => args.execute(&rig, interrupt).await,
        Commands::Record { args } => args.execute(&rig, interrupt).await,
        Commands::Config(_) | Commands::Selftest => Ok(()),
    };
    rig.close().await;
    result
}
