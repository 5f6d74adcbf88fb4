//! 单轴状态与对外快照类型

use nab_gpio::{Ear, MotorDrive};

/// 请求的旋转方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Forward,
    Backward,
}

impl From<Rotation> for MotorDrive {
    fn from(rotation: Rotation) -> Self {
        match rotation {
            Rotation::Forward => MotorDrive::Forward,
            Rotation::Backward => MotorDrive::Backward,
        }
    }
}

/// 电机状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorState {
    Stopped,
    /// 正在寻找缺孔（`target == None`）
    Homing,
    /// 正在转向目标位置
    Seeking,
}

/// 单轴状态
///
/// - `position`: `[0, steps)` 或未知
/// - `target`: 可以超出 `[0, steps)`，表示额外的整圈；`None` 表示正在归零
/// - `direction`: 编码器上升沿按 `direction.increment()` 推进位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EarAxis {
    pub position: Option<i32>,
    pub target: Option<i32>,
    pub direction: MotorDrive,
    pub running: bool,
}

impl EarAxis {
    pub fn motor_state(&self) -> MotorState {
        match (self.running, self.target) {
            (false, _) => MotorState::Stopped,
            (true, None) => MotorState::Homing,
            (true, Some(_)) => MotorState::Seeking,
        }
    }
}

/// 两轴状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EarsState {
    pub axes: [EarAxis; 2],
}

impl EarsState {
    pub fn axis(&self, ear: Ear) -> &EarAxis {
        &self.axes[ear.index()]
    }

    /// 两轴位置均已知
    pub fn positions_known(&self) -> bool {
        self.axes.iter().all(|axis| axis.position.is_some())
    }

    pub fn any_running(&self) -> bool {
        self.axes.iter().any(|axis| axis.running)
    }
}

/// 耳朵事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarEvent {
    /// 电机停止时检测到编码器上升沿（耳朵被手动拨动），该耳位置已失效
    Moved(Ear),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motor_state_transitions() {
        let mut axis = EarAxis::default();
        assert_eq!(axis.motor_state(), MotorState::Stopped);

        axis.running = true;
        assert_eq!(axis.motor_state(), MotorState::Homing);

        axis.target = Some(20);
        assert_eq!(axis.motor_state(), MotorState::Seeking);

        axis.running = false;
        assert_eq!(axis.motor_state(), MotorState::Stopped);
    }

    #[test]
    fn test_rotation_to_drive() {
        assert_eq!(MotorDrive::from(Rotation::Forward), MotorDrive::Forward);
        assert_eq!(MotorDrive::from(Rotation::Backward), MotorDrive::Backward);
    }

    #[test]
    fn test_state_queries() {
        let mut state = EarsState::default();
        assert!(!state.positions_known());
        state.axes[0].position = Some(3);
        state.axes[1].position = Some(0);
        assert!(state.positions_known());
        assert!(!state.any_running());
        state.axes[1].running = true;
        assert!(state.any_running());
        assert_eq!(state.axis(Ear::Left).position, Some(3));
    }
}
