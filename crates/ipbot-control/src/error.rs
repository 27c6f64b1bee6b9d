//! 控制核心错误类型定义
//!
//! 控制周期本身不返回错误：传感器故障和倾倒都在周期内部处理。
//! 这里只有配置加载和校验会产生的错误。

use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 读写配置文件失败
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML 解析失败
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML 序列化失败
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// 参数取值非法
    #[error("Invalid config `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("pid.kp", "must be finite");
        assert_eq!(format!("{}", err), "Invalid config `pid.kp`: must be finite");

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ConfigError = io.into();
        assert!(format!("{}", err).contains("IO error"));
    }
}
