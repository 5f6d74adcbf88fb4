//! 配置管理命令
//!
//! 默认配置文件：`<config_dir>/nabcore/config.toml`

use anyhow::{Context, Result};
use clap::Subcommand;
use nab_core::{HardwareModel, NabConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
pub fn default_config_file() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("nabcore");
    path.push("config.toml");
    Ok(path)
}

/// 加载配置；文件不存在时使用默认配置
pub fn load_config(path: &Path) -> Result<NabConfig> {
    if !path.exists() {
        return Ok(NabConfig::default());
    }
    NabConfig::load(path).with_context(|| format!("加载配置 {} 失败", path.display()))
}

fn save_config(path: &Path, config: &NabConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).context("创建配置目录失败")?;
    }
    let content = format!("# nabcore configuration\n\n{}", config.to_toml_string()?);
    fs::write(path, content).context("写入配置文件失败")?;
    Ok(())
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示生效的配置
    Show,

    /// 写入默认配置文件（已存在时需要 --force）
    Init {
        /// 硬件版本（2018 / 2019_tag / 2019_tagtag）
        #[arg(short, long, value_parser = parse_model)]
        model: Option<HardwareModel>,

        /// 覆盖已有文件
        #[arg(short, long)]
        force: bool,
    },

    /// 显示配置文件路径
    Path,
}

fn parse_model(s: &str) -> Result<HardwareModel, String> {
    match s {
        "2018" => Ok(HardwareModel::Model2018),
        "2019_tag" => Ok(HardwareModel::Model2019Tag),
        "2019_tagtag" => Ok(HardwareModel::Model2019TagTag),
        other => Err(format!("unknown hardware model: {}", other)),
    }
}

impl ConfigCommand {
    pub fn execute(self, path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Show => {
                let config = load_config(path)?;
                print!("{}", config.to_toml_string()?);
            },

            ConfigCommand::Init { model, force } => {
                if path.exists() && !force {
                    anyhow::bail!("{} 已存在（使用 --force 覆盖）", path.display());
                }
                let mut config = NabConfig::default();
                if let Some(model) = model {
                    config.hardware_model = model;
                }
                save_config(path, &config)?;
                println!("✅ 已写入 {}", path.display());
            },

            ConfigCommand::Path => println!("{}", path.display()),
        }
        Ok(())
    }
}
