//! 耳朵命令

use crate::rig::Rig;
use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use nab_core::{Ear, Rotation};

/// 耳朵选择
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EarArg {
    Left,
    Right,
}

impl From<EarArg> for Ear {
    fn from(ear: EarArg) -> Self {
        match ear {
            EarArg::Left => Ear::Left,
            EarArg::Right => Ear::Right,
        }
    }
}

/// 寻位命令参数
#[derive(Args, Debug)]
pub struct GotoCommand {
    /// 耳朵
    #[arg(value_enum)]
    pub ear: EarArg,

    /// 目标孔位（超出 [0, steps) 表示额外整圈）
    #[arg(allow_hyphen_values = true)]
    pub position: i32,

    /// 反转
    #[arg(short, long)]
    pub backward: bool,
}

impl GotoCommand {
    pub async fn execute(&self, rig: &Rig) -> Result<()> {
        let rotation = if self.backward {
            Rotation::Backward
        } else {
            Rotation::Forward
        };
        println!("⏳ {} ear -> {} ({:?})...", Ear::from(self.ear), self.position, rotation);
        let position = rig
            .core
            .ears()
            .goto(self.ear.into(), self.position, rotation)
            .await?;
        println!("✅ {} ear at {}", Ear::from(self.ear), position);
        Ok(())
    }
}

/// 相对移动命令参数
#[derive(Args, Debug)]
pub struct MoveCommand {
    #[arg(value_enum)]
    pub ear: EarArg,

    /// 相对孔位数
    #[arg(allow_hyphen_values = true)]
    pub delta: i32,

    #[arg(short, long)]
    pub backward: bool,
}

impl MoveCommand {
    pub async fn execute(&self, rig: &Rig) -> Result<()> {
        let rotation = if self.backward {
            Rotation::Backward
        } else {
            Rotation::Forward
        };
        let ears = rig.core.ears();
        ears.move_ear(self.ear.into(), self.delta, rotation).await?;
        ears.wait_while_running().await?;
        let state = ears.state();
        match state.axis(self.ear.into()).position {
            Some(position) => println!("✅ {} ear at {}", Ear::from(self.ear), position),
            None => bail!("{} ear position lost", Ear::from(self.ear)),
        }
        Ok(())
    }
}

/// 归零命令参数
#[derive(Args, Debug)]
pub struct ResetCommand {
    /// 左耳归零后的目标
    #[arg(default_value_t = 0)]
    pub left: i32,

    /// 右耳归零后的目标
    #[arg(default_value_t = 0)]
    pub right: i32,
}

impl ResetCommand {
    pub async fn execute(&self, rig: &Rig) -> Result<()> {
        println!("⏳ 归零中...");
        let (left, right) = rig.core.ears().reset_ears(self.left, self.right).await?;
        println!("✅ left = {}, right = {}", left, right);
        Ok(())
    }
}

/// 检测当前位置
pub async fn detect(rig: &Rig) -> Result<()> {
    println!("⏳ 检测耳朵位置...");
    let (left, right) = rig.core.ears().detect_positions().await?;
    println!("✅ left = {}, right = {} (steps = {})", left, right, rig.core.ears().steps());
    Ok(())
}
