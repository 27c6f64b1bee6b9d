//! Driver 模块错误类型定义

use ipbot_control::ConfigError;
use thiserror::Error;

/// Driver 错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 配置非法
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 构建时缺少协作方
    #[error("Missing component: {0}")]
    MissingComponent(&'static str),

    /// 流水线通道已关闭（下游阶段退出）
    #[error("Pipeline channel closed")]
    ChannelClosed,

    /// 流水线阶段线程 panic 或异常退出
    #[error("Pipeline stage failed: {0}")]
    StageFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let msg = format!("{}", DriverError::MissingComponent("imu"));
        assert_eq!(msg, "Missing component: imu");

        let msg = format!("{}", DriverError::StageFailed("control".to_string()));
        assert!(msg.contains("control"));
    }

    #[test]
    fn test_config_error_converts() {
        let mut config = ipbot_control::ControlConfig::default();
        config.cycle.period_ms = 0;
        let err: DriverError = config.validate().unwrap_err().into();
        assert!(matches!(err, DriverError::Config(_)));
        assert!(format!("{}", err).contains("cycle.period_ms"));
    }
}
