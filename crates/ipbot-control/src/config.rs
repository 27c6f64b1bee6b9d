//! # 控制参数配置
//!
//! 所有可调参数集中在 [`ControlConfig`]：PID 增益、目标角、两组滞回带、
//! 位置分区阈值与除数、速度缩放除数、控制周期等。
//!
//! 配置可以从 TOML 文件加载，缺省字段使用默认值：
//!
//! ```toml
//! [pid]
//! kp = 60.0
//!
//! [safety.recover_band]
//! min = 172.0
//! max = 188.0
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 完整控制配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// 姿态估计
    pub estimator: EstimatorConfig,

    /// 安全状态机
    pub safety: SafetyConfig,

    /// PID 增益
    pub pid: PidConfig,

    /// 转向修正
    pub steering: SteeringConfig,

    /// 车轮反馈聚合
    pub feedback: FeedbackConfig,

    /// 控制周期
    pub cycle: CycleConfig,
}

impl ControlConfig {
    /// 从 TOML 字符串解析
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ControlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为 TOML 字符串
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 从文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 保存配置到文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// 校验参数
    ///
    /// 拒绝非有限值、非正的除数和周期、空的或反向的角度带。
    /// 分区阈值的单调性不在这里检查，由调用方保证。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let e = &self.estimator;
        positive("estimator.gyro_sensitivity", e.gyro_sensitivity)?;
        non_negative("estimator.q_angle", e.q_angle)?;
        non_negative("estimator.q_bias", e.q_bias)?;
        positive("estimator.r_measure", e.r_measure)?;
        finite("estimator.tilt_offset_deg", e.tilt_offset_deg)?;

        self.safety.recover_band.check("safety.recover_band")?;
        self.safety.balance_band.check("safety.balance_band")?;

        finite("pid.kp", self.pid.kp)?;
        finite("pid.ki", self.pid.ki)?;
        finite("pid.kd", self.pid.kd)?;
        if let Some(limit) = self.pid.integral_limit {
            positive("pid.integral_limit", limit)?;
        }

        let s = &self.steering;
        finite("steering.target_angle", s.target_angle)?;
        positive("steering.velocity_scale_move", s.velocity_scale_move)?;
        positive("steering.velocity_scale_stop", s.velocity_scale_stop)?;
        positive("steering.velocity_scale_turning", s.velocity_scale_turning)?;
        positive("steering.position_scale_a", s.position_scale_a)?;
        positive("steering.position_scale_b", s.position_scale_b)?;
        positive("steering.position_scale_c", s.position_scale_c)?;
        if s.zone_a < 0 || s.zone_b < 0 {
            return Err(ConfigError::invalid(
                "steering.zone_a/zone_b",
                "zone thresholds must be >= 0",
            ));
        }
        finite("steering.target_min", s.target_min)?;
        finite("steering.target_max", s.target_max)?;
        if s.target_min > s.target_max {
            return Err(ConfigError::invalid(
                "steering.target_min/target_max",
                format!("inverted clamp range [{}, {}]", s.target_min, s.target_max),
            ));
        }

        if self.feedback.velocity_window == 0 {
            return Err(ConfigError::invalid(
                "feedback.velocity_window",
                "must be at least 1 cycle",
            ));
        }

        if self.cycle.period_ms == 0 {
            return Err(ConfigError::invalid("cycle.period_ms", "must be > 0"));
        }

        Ok(())
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{} is not finite", value)))
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{} must be > 0", value)))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{} must be >= 0", value)))
    }
}

/// 闭区间角度带（度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TiltBand {
    pub min: f64,
    pub max: f64,
}

impl TiltBand {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// 是否落在带内（含端点）
    ///
    /// NaN 永远不在带内。
    pub fn contains(&self, tilt: f64) -> bool {
        tilt >= self.min && tilt <= self.max
    }

    fn check(&self, field: &'static str) -> Result<(), ConfigError> {
        finite(field, self.min)?;
        finite(field, self.max)?;
        if self.min < self.max {
            Ok(())
        } else {
            Err(ConfigError::invalid(
                field,
                format!("empty or inverted band [{}, {}]", self.min, self.max),
            ))
        }
    }
}

/// 姿态估计参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// 陀螺仪灵敏度除数（原始计数 -> °/s）
    pub gyro_sensitivity: f64,
    /// 角度过程噪声
    pub q_angle: f64,
    /// 零偏过程噪声
    pub q_bias: f64,
    /// 测量噪声
    pub r_measure: f64,
    /// 加速度计倾角偏移（直立对应约 180°）
    pub tilt_offset_deg: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            gyro_sensitivity: 131.0, // ±250°/s 量程
            q_angle: 0.001,
            q_bias: 0.003,
            r_measure: 0.03,
            tilt_offset_deg: 180.0,
        }
    }
}

/// 安全状态机参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// 从倒地恢复时是否重置 PID 与目标位置
    ///
    /// 关闭后恢复时沿用倒地前的积分项和目标位置。
    pub reset_on_recovery: bool,
    /// 倒地状态下允许恢复的角度带（窄）
    pub recover_band: TiltBand,
    /// 平衡状态下允许继续控制的角度带（宽）
    pub balance_band: TiltBand,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            reset_on_recovery: true,
            recover_band: TiltBand::new(170.0, 190.0),
            balance_band: TiltBand::new(135.0, 225.0),
        }
    }
}

/// PID 增益
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// 积分项绝对值上限（None 表示不限制）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integral_limit: Option<f64>,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 55.468,
            ki: 0.554,
            kd: 42.524,
            integral_limit: None,
        }
    }
}

/// 转向修正参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// 基准目标角（度）
    pub target_angle: f64,
    /// 前进/后退时的速度缩放除数
    pub velocity_scale_move: f64,
    /// 定点保持时的速度缩放除数
    pub velocity_scale_stop: f64,
    /// 转弯时的速度缩放除数
    pub velocity_scale_turning: f64,
    /// A 区阈值（|位置误差| 大于此值）
    pub zone_a: i64,
    /// B 区阈值（|位置误差| 大于此值）
    pub zone_b: i64,
    /// A 区位置除数
    pub position_scale_a: f64,
    /// B 区位置除数
    pub position_scale_b: f64,
    /// C 区位置除数
    pub position_scale_c: f64,
    /// 定点保持时目标角下限
    pub target_min: f64,
    /// 定点保持时目标角上限
    pub target_max: f64,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            target_angle: 180.0,
            velocity_scale_move: 35.0,
            velocity_scale_stop: 30.0,
            velocity_scale_turning: 35.0,
            zone_a: 4000,
            zone_b: 2000,
            position_scale_a: 250.0,
            position_scale_b: 500.0,
            position_scale_c: 1000.0,
            target_min: 160.0,
            target_max: 200.0,
        }
    }
}

/// 车轮反馈聚合参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// 速度刷新窗口（周期数）
    pub velocity_window: u32,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            velocity_window: 10, // 10 × 10ms = 100ms
        }
    }
}

/// 控制周期
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    pub period_ms: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self { period_ms: 10 }
    }
}

impl CycleConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// 滤波器使用的固定时间步长（秒）
    pub fn dt_secs(&self) -> f64 {
        self.period().as_secs_f64()
    }
}
