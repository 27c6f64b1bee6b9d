//! 转向修正器 - 目标角调整 + PID + 左右轮差分
//!
//! 每个周期（仅在 Balancing 状态下）执行：
//!
//! 1. **纵向目标角**（按意图优先级）
//!    - Forward: `offset += v / 35`，`target -= offset`
//!    - Backward: `offset -= v / 35`，`target += offset`
//!    - Hold: 按位置误差分区（A/B/C）比例修正，再减去 `v / 30`，钳位到 [160, 200]
//! 2. **PID**: `error = target - tilt`
//! 3. **转向**: 转向偏移按速度衰减（`turning - |v / 35|`，下限 0），左右轮差分
//! 4. **命令**: 非负为 Forward，负值为 Backward 取绝对值
//!
//! 纵向和转向偏移都是本周期的输入，不会被写回意图。

use crate::config::{PidConfig, SteeringConfig};
use crate::feedback::WheelFeedback;
use crate::intent::{Longitudinal, SteeringIntent, Turn};
use crate::pid::{PidController, PidState};
use ipbot_hal::{MotorCommand, MotorDriver, MotorId};

/// 左右轮命令
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelCommands {
    pub left: MotorCommand,
    pub right: MotorCommand,
}

impl WheelCommands {
    pub fn from_signed(left: f64, right: f64) -> Self {
        Self {
            left: MotorCommand::from_signed(left),
            right: MotorCommand::from_signed(right),
        }
    }

    /// 下发到电机驱动（先左后右）
    pub fn send<M: MotorDriver + ?Sized>(&self, motors: &mut M) {
        motors.apply(MotorId::Left, self.left);
        motors.apply(MotorId::Right, self.right);
    }
}

/// 一次修正的完整输出
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectorOutput {
    /// 调整后的目标角（度）
    pub target_angle: f64,
    /// PID 输出
    pub pid_value: f64,
    /// 左轮带符号控制量
    pub left_value: f64,
    /// 右轮带符号控制量
    pub right_value: f64,
    pub commands: WheelCommands,
}

/// 位置误差对应的分区除数
///
/// 严格大于阈值才进入外侧分区，恰好等于阈值归内侧分区。
pub fn zone_divisor(position_error: i64, config: &SteeringConfig) -> f64 {
    let magnitude = position_error.unsigned_abs();
    if magnitude > config.zone_a.unsigned_abs() {
        config.position_scale_a
    } else if magnitude > config.zone_b.unsigned_abs() {
        config.position_scale_b
    } else {
        config.position_scale_c
    }
}

/// 根据意图和车轮反馈计算本周期目标角
pub fn target_angle(
    intent: &SteeringIntent,
    feedback: WheelFeedback,
    target_position: i64,
    config: &SteeringConfig,
) -> f64 {
    let velocity = feedback.velocity as f64;
    let base = config.target_angle;

    match intent.longitudinal() {
        Longitudinal::Forward => {
            // 高速时减小偏移，倒车时增大
            let offset = intent.longitudinal_offset + velocity / config.velocity_scale_move;
            base - offset
        },
        Longitudinal::Backward => {
            let offset = intent.longitudinal_offset - velocity / config.velocity_scale_move;
            base + offset
        },
        Longitudinal::Hold => {
            let position_error = feedback.position.saturating_sub(target_position);
            let target = base
                - position_error as f64 / zone_divisor(position_error, config)
                - velocity / config.velocity_scale_stop;
            // 不用 f64::clamp：未校验的配置可能给出反向边界
            target.max(config.target_min).min(config.target_max)
        },
    }
}

/// 按速度衰减后的转向偏移，始终 >= 0
pub fn effective_turning(turning_offset: f64, velocity: i64, config: &SteeringConfig) -> f64 {
    let reduced = turning_offset - (velocity as f64 / config.velocity_scale_turning).abs();
    // f64::max 在 reduced 为 NaN 时返回 0
    reduced.max(0.0)
}

/// 把 PID 输出拆分为左右轮控制量
pub fn turning_split(
    pid_value: f64,
    intent: &SteeringIntent,
    velocity: i64,
    config: &SteeringConfig,
) -> (f64, f64) {
    match intent.turn() {
        Turn::Straight => (pid_value, pid_value),
        Turn::Left => {
            let turning = effective_turning(intent.turning_offset, velocity, config);
            (pid_value - turning, pid_value + turning)
        },
        Turn::Right => {
            let turning = effective_turning(intent.turning_offset, velocity, config);
            (pid_value + turning, pid_value - turning)
        },
    }
}

/// 转向修正器
///
/// 持有 PID 状态和目标位置，两者只由本结构修改。
#[derive(Debug, Clone, PartialEq)]
pub struct SteeringCorrector {
    config: SteeringConfig,
    pid: PidController,
    target_position: i64,
}

impl SteeringCorrector {
    pub fn new(config: SteeringConfig, pid: &PidConfig) -> Self {
        Self {
            config,
            pid: PidController::from_config(pid),
            target_position: 0,
        }
    }

    pub fn config(&self) -> &SteeringConfig {
        &self.config
    }

    pub fn pid_state(&self) -> &PidState {
        self.pid.state()
    }

    pub fn target_position(&self) -> i64 {
        self.target_position
    }

    /// 计算本周期左右轮命令
    pub fn correct(
        &mut self,
        tilt: f64,
        intent: &SteeringIntent,
        feedback: WheelFeedback,
    ) -> CorrectorOutput {
        let target_angle = target_angle(intent, feedback, self.target_position, &self.config);
        let pid_value = self.pid.tick(target_angle - tilt);
        let (left_value, right_value) =
            turning_split(pid_value, intent, feedback.velocity, &self.config);

        CorrectorOutput {
            target_angle,
            pid_value,
            left_value,
            right_value,
            commands: WheelCommands::from_signed(left_value, right_value),
        }
    }

    /// 清零 PID 状态，并把目标位置设为当前位置
    ///
    /// 重复调用结果相同。
    pub fn reset(&mut self, wheel_position: i64) {
        self.pid.reset();
        self.target_position = wheel_position;
    }
}
