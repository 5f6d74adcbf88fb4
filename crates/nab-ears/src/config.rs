//! 耳朵控制配置

use crate::EarsError;
use std::time::Duration;

/// 耳朵控制配置
///
/// 缺孔检测依赖两个时间参数：正常孔间隔必须明显小于 `missing_hole_threshold`，
/// 经过缺孔时的间隔（约两倍孔间隔）必须大于它。
#[derive(Debug, Clone)]
pub struct EarsConfig {
    /// 每圈编码孔数（STEPS）
    pub steps: i32,
    /// 相邻上升沿间隔超过该值即判定刚经过缺孔（默认 400ms）
    pub missing_hole_threshold: Duration,
    /// 归零循环等待条件变量的超时（默认 300ms）
    pub poll_interval: Duration,
    /// 归零总超时（`None` = 不限时）
    pub homing_timeout: Option<Duration>,
    /// 移动事件通道容量
    pub event_capacity: usize,
}

impl Default for EarsConfig {
    fn default() -> Self {
        Self {
            steps: 17,
            missing_hole_threshold: Duration::from_millis(400),
            poll_interval: Duration::from_millis(300),
            homing_timeout: None,
            event_capacity: 16,
        }
    }
}

impl EarsConfig {
    /// 设置每圈孔数
    pub fn with_steps(mut self, steps: i32) -> Self {
        self.steps = steps;
        self
    }

    /// 设置缺孔阈值和轮询间隔
    pub fn with_timing(mut self, missing_hole_threshold: Duration, poll_interval: Duration) -> Self {
        self.missing_hole_threshold = missing_hole_threshold;
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_homing_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.homing_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), EarsError> {
        if self.steps < 2 {
            return Err(EarsError::InvalidConfig(format!(
                "steps must be at least 2, got {}",
                self.steps
            )));
        }
        if self.missing_hole_threshold.is_zero() || self.poll_interval.is_zero() {
            return Err(EarsError::InvalidConfig(
                "missing hole threshold and poll interval must be non-zero".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(EarsError::InvalidConfig(
                "event capacity must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EarsConfig::default();
        assert_eq!(config.steps, 17);
        assert_eq!(config.missing_hole_threshold, Duration::from_millis(400));
        assert_eq!(config.poll_interval, Duration::from_millis(300));
        assert!(config.homing_timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        assert!(EarsConfig::default().with_steps(1).validate().is_err());
        assert!(
            EarsConfig::default()
                .with_timing(Duration::ZERO, Duration::from_millis(10))
                .validate()
                .is_err()
        );
    }
}
