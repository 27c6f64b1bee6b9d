//! PID 控制器 - 离散形式，每个控制周期调用一次
//!
//! # 算法
//!
//! ```text
//! e      = target - measured
//! p      = Kp * e
//! i     += Ki * e            (可选钳位到 [-limit, +limit])
//! d      = Kd * (e - e_last)
//! output = p + i + d
//! ```
//!
//! 增益按"每周期"标定，不乘除 `dt`：周期固定，改变周期需要重新整定增益。
//!
//! # 示例
//!
//! ```rust
//! use ipbot_control::pid::PidController;
//!
//! let mut pid = PidController::new()
//!     .with_gains(55.468, 0.554, 42.524)
//!     .with_integral_limit(Some(500.0));
//!
//! let output = pid.tick(170.0 - 178.0);
//! assert!(output < 0.0);
//! ```

use crate::config::PidConfig;

/// PID 内部状态
///
/// 积分项跨周期保留，直到显式 [`reset`](PidController::reset)。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidState {
    /// 上一周期误差（用于微分）
    pub last_error: f64,
    /// 比例项
    pub p_term: f64,
    /// 积分项累积值（已乘 Ki）
    pub i_term: f64,
    /// 微分项
    pub d_term: f64,
    /// 最近一次输出
    pub output: f64,
}

/// PID 控制器
#[derive(Debug, Clone, PartialEq)]
pub struct PidController {
    kp: f64,
    ki: f64,
    kd: f64,
    /// 积分项限制（None 表示不限制）
    integral_limit: Option<f64>,
    state: PidState,
}

impl Default for PidController {
    fn default() -> Self {
        Self::new()
    }
}

impl PidController {
    /// 创建增益全为 0、无积分限制的控制器
    pub fn new() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            integral_limit: None,
            state: PidState::default(),
        }
    }

    /// 按配置创建
    pub fn from_config(config: &PidConfig) -> Self {
        Self::new()
            .with_gains(config.kp, config.ki, config.kd)
            .with_integral_limit(config.integral_limit)
    }

    /// 设置 PID 增益
    pub fn with_gains(mut self, kp: f64, ki: f64, kd: f64) -> Self {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
        self
    }

    /// 设置积分项限制
    ///
    /// 防止积分饱和（Integral Windup）。`None` 保持无界累积。
    /// 负值按绝对值处理，NaN 视为不限制。
    pub fn with_integral_limit(mut self, limit: Option<f64>) -> Self {
        self.integral_limit = limit.filter(|l| !l.is_nan()).map(f64::abs);
        self
    }

    pub fn gains(&self) -> (f64, f64, f64) {
        (self.kp, self.ki, self.kd)
    }

    pub fn integral_limit(&self) -> Option<f64> {
        self.integral_limit
    }

    pub fn state(&self) -> &PidState {
        &self.state
    }

    /// 执行一次 PID 计算，返回输出
    pub fn tick(&mut self, error: f64) -> f64 {
        let s = &mut self.state;

        s.p_term = self.kp * error;

        s.i_term += self.ki * error;
        if let Some(limit) = self.integral_limit {
            s.i_term = s.i_term.clamp(-limit, limit);
        }

        s.d_term = self.kd * (error - s.last_error);
        s.last_error = error;

        s.output = s.p_term + s.i_term + s.d_term;
        s.output
    }

    /// 清零全部状态（P/I/D 项、上次误差、输出）
    pub fn reset(&mut self) {
        self.state = PidState::default();
    }
}
