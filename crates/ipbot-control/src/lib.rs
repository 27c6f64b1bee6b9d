//! # ipbot 控制核心
//!
//! 两轮自平衡机器人的控制周期：
//!
//! - **姿态估计** (`estimator`): 加速度计倾角与陀螺仪角速度的卡尔曼融合
//! - **车轮反馈** (`feedback`): 编码器计数聚合为位置/速度
//! - **安全状态机** (`safety`): Prone / Balancing 两态滞回
//! - **转向修正** (`corrector`, `pid`): 目标角调整、PID、左右轮差分
//! - **控制核心** (`core`): 按固定顺序编排以上组件
//!
//! # 快速开始
//!
//! ```rust
//! use ipbot_control::{ControlConfig, ControlCore, WheelFeedback};
//! use ipbot_hal::OrientationSample;
//!
//! let mut core = ControlCore::new(ControlConfig::default()).unwrap();
//! let sample = OrientationSample::new([0.0, 0.0, 16384.0], 0.0);
//! let outcome = core.step(&sample, WheelFeedback::default());
//! assert_eq!(outcome.tilt(), Some(180.0));
//! ```

pub mod config;
pub mod core;
pub mod corrector;
pub mod error;
pub mod estimator;
pub mod feedback;
pub mod intent;
pub mod pid;
pub mod safety;

pub use config::{
    ControlConfig, CycleConfig, EstimatorConfig, FeedbackConfig, PidConfig, SafetyConfig,
    SteeringConfig, TiltBand,
};
pub use core::{ControlCore, CycleOutcome};
pub use corrector::{CorrectorOutput, SteeringCorrector, WheelCommands};
pub use error::ConfigError;
pub use estimator::{FilterState, TiltEstimator};
pub use feedback::{FeedbackAggregator, WheelFeedback};
pub use intent::{Longitudinal, SteeringIntent, Turn};
pub use pid::{PidController, PidState};
pub use safety::{SafetyMonitor, SafetyState, SafetyTransition};
