//! Mock 硬件
//!
//! 用于测试和仿真的内存模拟硬件。三个协作方共享同一份 [`RigState`]，
//! 并附带一个线性化的倒立摆模型，使闭环仿真成为可能。

use crate::{
    Direction, ImuSource, MotorCommand, MotorDriver, MotorId, OrientationSample, PulseCounter,
    SensorError, WheelCounts,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// 模拟平台参数
#[derive(Debug, Clone, PartialEq)]
pub struct MockRigConfig {
    /// 重力项系数 g/l（rad/s²）
    pub gravity_gain: f64,
    /// 电机控制量到角加速度的增益（rad/s² 每单位控制量）
    pub motor_gain: f64,
    /// 控制量饱和值（PWM 上限）
    pub max_command: f64,
    /// 车轮计数速度增益（counts/s 每单位控制量）
    pub wheel_gain: f64,
    /// 1g 对应的加速度计读数
    pub accel_one_g: f64,
    /// 陀螺仪灵敏度（LSB per °/s）
    pub gyro_sensitivity: f64,
}

impl Default for MockRigConfig {
    fn default() -> Self {
        Self {
            gravity_gain: 49.0,
            motor_gain: 0.25,
            max_command: 255.0,
            wheel_gain: 4.0,
            accel_one_g: 16384.0,
            gyro_sensitivity: 131.0,
        }
    }
}

/// 模拟平台状态
#[derive(Debug, Clone, PartialEq)]
pub struct RigState {
    /// 俯仰角（度，180 为直立）
    pub tilt_deg: f64,
    /// 俯仰角速度（°/s）
    pub rate_dps: f64,
    /// 左编码器计数
    pub left_count: f64,
    /// 右编码器计数
    pub right_count: f64,
    /// 左电机当前命令（None 表示停止）
    pub left_command: Option<MotorCommand>,
    /// 右电机当前命令（None 表示停止）
    pub right_command: Option<MotorCommand>,
    /// `move_motor` 调用次数
    pub commands_issued: u64,
    /// `stop_and_reset_all` 调用次数
    pub stop_resets: u64,
    /// 剩余的注入故障次数（每次采集消耗一次）
    pub pending_faults: u32,
    /// 已成功提供的采样数
    pub samples_served: u64,
}

impl Default for RigState {
    fn default() -> Self {
        Self {
            tilt_deg: 180.0,
            rate_dps: 0.0,
            left_count: 0.0,
            right_count: 0.0,
            left_command: None,
            right_command: None,
            commands_issued: 0,
            stop_resets: 0,
            pending_faults: 0,
            samples_served: 0,
        }
    }
}

/// 模拟平台
///
/// 通过 [`imu`](Self::imu)、[`counter`](Self::counter)、[`motors`](Self::motors)
/// 取得三个协作方的句柄，它们共享内部状态。
#[derive(Debug, Clone)]
pub struct MockRig {
    state: Arc<Mutex<RigState>>,
    config: MockRigConfig,
}

impl Default for MockRig {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRig {
    /// 创建直立、静止的模拟平台
    pub fn new() -> Self {
        Self::with_config(MockRigConfig::default())
    }

    pub fn with_config(config: MockRigConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(RigState::default())),
            config,
        }
    }

    pub fn config(&self) -> &MockRigConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, RigState> {
        // 测试线程 panic 后仍允许读取状态
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 读取状态快照
    pub fn state(&self) -> RigState {
        self.lock().clone()
    }

    /// 设置俯仰角（度）
    pub fn set_tilt(&self, tilt_deg: f64) {
        self.lock().tilt_deg = tilt_deg;
    }

    /// 设置俯仰角速度（°/s）
    pub fn set_rate(&self, rate_dps: f64) {
        self.lock().rate_dps = rate_dps;
    }

    /// 设置编码器计数
    pub fn set_counts(&self, left: i64, right: i64) {
        let mut state = self.lock();
        state.left_count = left as f64;
        state.right_count = right as f64;
    }

    /// 注入接下来 `count` 次采集失败
    pub fn inject_faults(&self, count: u32) {
        self.lock().pending_faults += count;
    }

    pub fn imu(&self) -> MockImu {
        MockImu { rig: self.clone() }
    }

    pub fn counter(&self) -> MockPulseCounter {
        MockPulseCounter { rig: self.clone() }
    }

    pub fn motors(&self) -> MockMotors {
        MockMotors { rig: self.clone() }
    }

    /// 推进倒立摆模型 `dt` 秒
    ///
    /// θ'' = (g/l)·sin θ + k·u，u 为左右命令的平均值（已饱和）。
    /// 倾角超过 ±90° 视为倒地，保持静止。
    pub fn step(&self, dt: f64) {
        let cfg = &self.config;
        let mut state = self.lock();

        let signed = |cmd: Option<MotorCommand>| {
            cmd.map(|c| c.signed().clamp(-cfg.max_command, cfg.max_command))
                .unwrap_or(0.0)
        };
        let left = signed(state.left_command);
        let right = signed(state.right_command);

        state.left_count += left * cfg.wheel_gain * dt;
        state.right_count += right * cfg.wheel_gain * dt;

        let theta = (state.tilt_deg - 180.0).to_radians();
        if theta.abs() >= std::f64::consts::FRAC_PI_2 {
            state.rate_dps = 0.0;
            return;
        }

        let u = (left + right) / 2.0;
        let accel = cfg.gravity_gain * theta.sin() + cfg.motor_gain * u;
        let rate = state.rate_dps.to_radians() + accel * dt;
        let theta = (theta + rate * dt).clamp(
            -std::f64::consts::FRAC_PI_2,
            std::f64::consts::FRAC_PI_2,
        );

        state.rate_dps = rate.to_degrees();
        state.tilt_deg = 180.0 + theta.to_degrees();
    }
}

/// 模拟 IMU
#[derive(Debug, Clone)]
pub struct MockImu {
    rig: MockRig,
}

impl ImuSource for MockImu {
    fn acquire_orientation(&mut self) -> Result<OrientationSample, SensorError> {
        let cfg = self.rig.config.clone();
        let mut state = self.rig.lock();

        if state.pending_faults > 0 {
            state.pending_faults -= 1;
            return Err(SensorError::Bus("injected fault".to_string()));
        }

        let theta = (state.tilt_deg - 180.0).to_radians();
        state.samples_served += 1;
        Ok(OrientationSample::new(
            [
                0.0,
                cfg.accel_one_g * theta.sin(),
                cfg.accel_one_g * theta.cos(),
            ],
            state.rate_dps * cfg.gyro_sensitivity,
        ))
    }
}

/// 模拟编码器计数
#[derive(Debug, Clone)]
pub struct MockPulseCounter {
    rig: MockRig,
}

impl PulseCounter for MockPulseCounter {
    fn counts(&self) -> WheelCounts {
        let state = self.rig.lock();
        WheelCounts {
            left: state.left_count.round() as i64,
            right: state.right_count.round() as i64,
        }
    }
}

/// 模拟电机驱动
#[derive(Debug, Clone)]
pub struct MockMotors {
    rig: MockRig,
}

impl MotorDriver for MockMotors {
    fn move_motor(&mut self, motor: MotorId, direction: Direction, magnitude: f64) {
        let mut state = self.rig.lock();
        let command = Some(MotorCommand {
            direction,
            magnitude,
        });
        match motor {
            MotorId::Left => state.left_command = command,
            MotorId::Right => state.right_command = command,
        }
        state.commands_issued += 1;
    }

    fn stop_motor(&mut self, motor: MotorId) {
        let mut state = self.rig.lock();
        match motor {
            MotorId::Left => state.left_command = None,
            MotorId::Right => state.right_command = None,
        }
    }

    fn stop_and_reset_all(&mut self) {
        let mut state = self.rig.lock();
        state.left_command = None;
        state.right_command = None;
        state.left_count = 0.0;
        state.right_count = 0.0;
        state.stop_resets += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upright_sample() {
        let rig = MockRig::new();
        let sample = rig.imu().acquire_orientation().unwrap();
        assert_eq!(sample.accel_y, 0.0);
        assert_eq!(sample.accel_z, 16384.0);
        assert_eq!(sample.gyro_rate, 0.0);
    }

    #[test]
    fn test_tilted_sample_matches_angle() {
        let rig = MockRig::new();
        rig.set_tilt(190.0);
        let s = rig.imu().acquire_orientation().unwrap();
        let angle = s.accel_y.atan2(s.accel_z).to_degrees() + 180.0;
        assert!((angle - 190.0).abs() < 1e-9);
    }

    #[test]
    fn test_injected_faults_are_consumed() {
        let rig = MockRig::new();
        rig.inject_faults(2);
        let mut imu = rig.imu();
        assert!(imu.acquire_orientation().is_err());
        assert!(imu.acquire_orientation().is_err());
        assert!(imu.acquire_orientation().is_ok());
        assert_eq!(rig.state().samples_served, 1);
    }

    #[test]
    fn test_stop_and_reset_clears_counts() {
        let rig = MockRig::new();
        rig.set_counts(100, -40);
        let mut motors = rig.motors();
        motors.move_motor(MotorId::Left, Direction::Forward, 10.0);
        motors.stop_and_reset_all();

        let state = rig.state();
        assert_eq!(state.left_command, None);
        assert_eq!(state.right_command, None);
        assert_eq!(rig.counter().counts(), WheelCounts::default());
        assert_eq!(state.stop_resets, 1);
        assert_eq!(state.commands_issued, 1);
    }

    #[test]
    fn test_equilibrium_is_stationary() {
        let rig = MockRig::new();
        for _ in 0..100 {
            rig.step(0.01);
        }
        let state = rig.state();
        assert_eq!(state.tilt_deg, 180.0);
        assert_eq!(state.rate_dps, 0.0);
    }

    #[test]
    fn test_unpowered_rig_falls_over() {
        let rig = MockRig::new();
        rig.set_tilt(181.0);
        for _ in 0..200 {
            rig.step(0.01);
        }
        assert!(rig.state().tilt_deg > 225.0);
    }

    #[test]
    fn test_forward_command_moves_wheels() {
        let rig = MockRig::new();
        let mut motors = rig.motors();
        for motor in MotorId::ALL {
            motors.move_motor(motor, Direction::Forward, 100.0);
        }
        rig.step(0.1);
        let counts = rig.counter().counts();
        assert_eq!(counts.left, 40);
        assert_eq!(counts.right, 40);
    }
}
