//! 控制核心 - 单个周期的完整编排
//!
//! 周期内严格按顺序：采集 -> 姿态估计 -> 安全状态机 -> （Balancing 时）转向修正 -> 下发。
//!
//! - 采集失败：整周期跳过，不更新滤波器、不切换状态、不发任何电机命令
//!   （电机保持上一次的命令）
//! - Prone：停止全部电机并清除驱动层计数
//! - Prone -> Balancing：按配置重置 PID 和目标位置
//!
//! [`ControlCore::step`] 不涉及任何 I/O，可以单独放在流水线的控制阶段中运行；
//! [`ControlCore::run_cycle`] 是同步的单线程入口。

use crate::config::ControlConfig;
use crate::corrector::{CorrectorOutput, SteeringCorrector};
use crate::error::ConfigError;
use crate::estimator::TiltEstimator;
use crate::feedback::WheelFeedback;
use crate::intent::SteeringIntent;
use crate::safety::{SafetyMonitor, SafetyState, SafetyTransition};
use ipbot_hal::{ImuSource, MotorDriver, OrientationSample, SensorError, WheelEncoder};
use tracing::{debug, trace};

/// 单个周期的结果
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// 采集失败或采样无效，周期被跳过
    Skipped(SensorError),
    /// Prone：电机停止并复位
    Stopped {
        tilt: f64,
        transition: SafetyTransition,
    },
    /// Balancing：按修正器输出驱动电机
    Driven {
        tilt: f64,
        output: CorrectorOutput,
        transition: SafetyTransition,
    },
}

impl CycleOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, CycleOutcome::Skipped(_))
    }

    pub fn tilt(&self) -> Option<f64> {
        match self {
            CycleOutcome::Skipped(_) => None,
            CycleOutcome::Stopped { tilt, .. } | CycleOutcome::Driven { tilt, .. } => Some(*tilt),
        }
    }

    pub fn transition(&self) -> Option<SafetyTransition> {
        match self {
            CycleOutcome::Skipped(_) => None,
            CycleOutcome::Stopped { transition, .. }
            | CycleOutcome::Driven { transition, .. } => Some(*transition),
        }
    }

    /// 把本周期的结果作用到电机和编码器上
    ///
    /// - `Skipped`: 什么都不做
    /// - `Stopped`: `stop_and_reset_all`，随后通知编码器计数已清零
    /// - `Driven`: 先左后右下发命令
    pub fn actuate<E, M>(&self, encoder: &mut E, motors: &mut M)
    where
        E: WheelEncoder + ?Sized,
        M: MotorDriver + ?Sized,
    {
        match self {
            CycleOutcome::Skipped(_) => {},
            CycleOutcome::Stopped { .. } => {
                motors.stop_and_reset_all();
                encoder.on_counters_reset();
            },
            CycleOutcome::Driven { output, .. } => output.commands.send(motors),
        }
    }
}

/// 控制核心
///
/// 持有全部跨周期状态：滤波器、安全状态、PID 与目标位置、当前转向意图。
/// 同一时刻只能有一个周期在运行（`&mut self`）。
#[derive(Debug, Clone, PartialEq)]
pub struct ControlCore {
    config: ControlConfig,
    estimator: TiltEstimator,
    safety: SafetyMonitor,
    corrector: SteeringCorrector,
    intent: SteeringIntent,
}

impl ControlCore {
    /// 校验配置并创建核心，初始状态为 Prone
    pub fn new(config: ControlConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            estimator: TiltEstimator::new(config.estimator.clone()),
            safety: SafetyMonitor::new(config.safety.clone()),
            corrector: SteeringCorrector::new(config.steering.clone(), &config.pid),
            intent: SteeringIntent::default(),
            config,
        })
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn estimator(&self) -> &TiltEstimator {
        &self.estimator
    }

    pub fn corrector(&self) -> &SteeringCorrector {
        &self.corrector
    }

    pub fn safety_state(&self) -> SafetyState {
        self.safety.state()
    }

    pub fn intent(&self) -> &SteeringIntent {
        &self.intent
    }

    /// 替换转向意图（周期之间调用）
    pub fn set_intent(&mut self, intent: SteeringIntent) {
        self.intent = intent;
    }

    pub fn intent_mut(&mut self) -> &mut SteeringIntent {
        &mut self.intent
    }

    /// 手动重置 PID 和目标位置
    pub fn reset_corrector(&mut self, wheel_position: i64) {
        self.corrector.reset(wheel_position);
    }

    /// 估计 -> 安全判断 -> 修正（不涉及 I/O）
    ///
    /// 非有限值采样视为无效采集，与采集失败同样处理。
    pub fn step(&mut self, sample: &OrientationSample, feedback: WheelFeedback) -> CycleOutcome {
        if !sample.is_finite() {
            return CycleOutcome::Skipped(SensorError::InvalidSample(format!("{:?}", sample)));
        }

        let tilt = self.estimator.update(sample, self.config.cycle.dt_secs());
        let transition = self.safety.update(tilt);

        if transition.is_recovery() && self.config.safety.reset_on_recovery {
            self.corrector.reset(feedback.position);
            debug!("PID reset on recovery, target position = {}", feedback.position);
        }

        match transition.current {
            SafetyState::Prone => {
                trace!(tilt, "prone");
                CycleOutcome::Stopped { tilt, transition }
            },
            SafetyState::Balancing => {
                let output = self.corrector.correct(tilt, &self.intent, feedback);
                trace!(
                    tilt,
                    target = output.target_angle,
                    pid = output.pid_value,
                    left = output.left_value,
                    right = output.right_value,
                    "balancing"
                );
                CycleOutcome::Driven {
                    tilt,
                    output,
                    transition,
                }
            },
        }
    }

    /// 执行一个完整控制周期
    pub fn run_cycle<I, E, M>(&mut self, imu: &mut I, encoder: &mut E, motors: &mut M) -> CycleOutcome
    where
        I: ImuSource + ?Sized,
        E: WheelEncoder + ?Sized,
        M: MotorDriver + ?Sized,
    {
        let sample = match imu.acquire_orientation() {
            Ok(sample) => sample,
            Err(e) => {
                debug!("Sensor acquisition failed, cycle skipped: {}", e);
                return CycleOutcome::Skipped(e);
            },
        };

        encoder.refresh();
        let feedback = WheelFeedback::read(encoder);
        let outcome = self.step(&sample, feedback);
        outcome.actuate(encoder, motors);
        outcome
    }
}
