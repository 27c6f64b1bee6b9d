//! # ipbot HAL
//!
//! 硬件协作方抽象层：控制核心只通过这里定义的窄接口与硬件交互。
//!
//! ## 协作方
//!
//! - [`ImuSource`]: 姿态采样（加速度计三轴 + 俯仰轴陀螺仪）
//! - [`WheelEncoder`]: 车轮位置/速度反馈
//! - [`PulseCounter`]: 左右编码器原始脉冲计数
//! - [`MotorDriver`]: 电机驱动（方向 + 幅值、停止、停止并复位）
//!
//! 总线读取、引脚配置、中断计数和 PWM 生成都在这些 trait 的实现里完成，
//! 不属于本 crate。
//!
//! ## Feature Flags
//!
//! - `mock` - 内存中的模拟硬件（带线性化倒立摆模型），用于测试和仿真
//! - `serde` - 数据类型的序列化支持

use thiserror::Error;

#[cfg(feature = "mock")]
pub mod mock;

/// 传感器采集错误
///
/// 采集失败时控制周期整体跳过（不更新滤波器、不切换状态、不发电机命令），
/// 下一个周期即为隐式重试。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    /// 总线通信失败（I2C NACK、仲裁丢失等）
    #[error("Sensor bus error: {0}")]
    Bus(String),
    /// 在周期预算内未完成读取
    #[error("Sensor read timeout")]
    Timeout,
    /// 传感器尚未就绪（未初始化或数据未更新）
    #[error("Sensor not ready")]
    NotReady,
    /// 读到的数据无效（NaN、饱和等）
    #[error("Invalid sensor sample: {0}")]
    InvalidSample(String),
}

/// 单次姿态采样
///
/// 每个周期由传感器协作方产生一次，立即被消费，不保留。
/// 加速度单位任意（只用到 y/z 的比值），陀螺仪为原始计数。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrientationSample {
    /// X 轴加速度
    pub accel_x: f64,
    /// Y 轴加速度
    pub accel_y: f64,
    /// Z 轴加速度
    pub accel_z: f64,
    /// 俯仰轴角速度（原始计数，需除以灵敏度换算为 °/s）
    pub gyro_rate: f64,
}

impl OrientationSample {
    /// 由加速度数组和原始角速度构造
    pub fn new(accel: [f64; 3], gyro_rate: f64) -> Self {
        Self {
            accel_x: accel[0],
            accel_y: accel[1],
            accel_z: accel[2],
            gyro_rate,
        }
    }

    /// 检查采样是否为有限值
    pub fn is_finite(&self) -> bool {
        self.accel_x.is_finite()
            && self.accel_y.is_finite()
            && self.accel_z.is_finite()
            && self.gyro_rate.is_finite()
    }
}

/// 电机编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotorId {
    /// 左电机
    Left,
    /// 右电机
    Right,
}

impl MotorId {
    /// 全部电机（左、右）
    pub const ALL: [MotorId; 2] = [MotorId::Left, MotorId::Right];
}

/// 电机转动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Forward,
    Backward,
}

/// 单个车轮的驱动命令
///
/// 方向 + 非负幅值。每个周期产生，不保留。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotorCommand {
    pub direction: Direction,
    /// 幅值（始终 >= 0）
    pub magnitude: f64,
}

impl MotorCommand {
    /// 由带符号的控制量生成命令
    ///
    /// 非负值（包括 0）为 `Forward`，负值为 `Backward` 且幅值取绝对值。
    pub fn from_signed(value: f64) -> Self {
        if value >= 0.0 {
            Self {
                direction: Direction::Forward,
                magnitude: value,
            }
        } else {
            Self {
                direction: Direction::Backward,
                magnitude: -value,
            }
        }
    }

    /// 还原为带符号的控制量
    pub fn signed(&self) -> f64 {
        match self.direction {
            Direction::Forward => self.magnitude,
            Direction::Backward => -self.magnitude,
        }
    }
}

/// 左右编码器原始脉冲计数（自上次复位起累计）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WheelCounts {
    pub left: i64,
    pub right: i64,
}

/// 姿态传感器接口
pub trait ImuSource {
    /// 采集一次姿态数据
    ///
    /// 必须在周期预算内返回；失败时返回 [`SensorError`]，不要在内部重试。
    fn acquire_orientation(&mut self) -> Result<OrientationSample, SensorError>;
}

/// 车轮反馈接口
///
/// 位置为合成传动系统的累计计数（带符号），速度为带符号的速率，
/// 均自上次复位起计算。
pub trait WheelEncoder {
    fn wheel_position(&self) -> i64;

    fn wheel_velocity(&self) -> i64;

    /// 每个控制周期读取前调用一次
    ///
    /// 默认什么都不做；需要周期性聚合的实现（如速度窗口）可覆盖此方法。
    fn refresh(&mut self) {}

    /// 驱动层计数被清零（`stop_and_reset_all`）后调用
    fn on_counters_reset(&mut self) {}
}

/// 编码器脉冲计数接口（中断计数由实现方负责）
pub trait PulseCounter {
    fn counts(&self) -> WheelCounts;
}

/// 电机驱动接口
pub trait MotorDriver {
    /// 以给定方向和幅值驱动电机
    fn move_motor(&mut self, motor: MotorId, direction: Direction, magnitude: f64);

    /// 停止单个电机
    fn stop_motor(&mut self, motor: MotorId);

    /// 停止全部电机并清除驱动层的位置计数
    fn stop_and_reset_all(&mut self);

    /// 下发一条 [`MotorCommand`]
    fn apply(&mut self, motor: MotorId, command: MotorCommand) {
        self.move_motor(motor, command.direction, command.magnitude);
    }
}

impl<T: ImuSource + ?Sized> ImuSource for Box<T> {
    fn acquire_orientation(&mut self) -> Result<OrientationSample, SensorError> {
        (**self).acquire_orientation()
    }
}

impl<T: WheelEncoder + ?Sized> WheelEncoder for Box<T> {
    fn wheel_position(&self) -> i64 {
        (**self).wheel_position()
    }

    fn wheel_velocity(&self) -> i64 {
        (**self).wheel_velocity()
    }

    fn refresh(&mut self) {
        (**self).refresh()
    }

    fn on_counters_reset(&mut self) {
        (**self).on_counters_reset()
    }
}

impl<T: PulseCounter + ?Sized> PulseCounter for Box<T> {
    fn counts(&self) -> WheelCounts {
        (**self).counts()
    }
}

impl<T: MotorDriver + ?Sized> MotorDriver for Box<T> {
    fn move_motor(&mut self, motor: MotorId, direction: Direction, magnitude: f64) {
        (**self).move_motor(motor, direction, magnitude)
    }

    fn stop_motor(&mut self, motor: MotorId) {
        (**self).stop_motor(motor)
    }

    fn stop_and_reset_all(&mut self) {
        (**self).stop_and_reset_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motor_command_from_signed() {
        let cmd = MotorCommand::from_signed(12.5);
        assert_eq!(cmd.direction, Direction::Forward);
        assert_eq!(cmd.magnitude, 12.5);

        let cmd = MotorCommand::from_signed(-3.0);
        assert_eq!(cmd.direction, Direction::Backward);
        assert_eq!(cmd.magnitude, 3.0);
        assert_eq!(cmd.signed(), -3.0);
    }

    #[test]
    fn test_motor_command_zero_is_forward() {
        let cmd = MotorCommand::from_signed(0.0);
        assert_eq!(cmd.direction, Direction::Forward);
        assert_eq!(cmd.magnitude, 0.0);
    }

    #[test]
    fn test_sensor_error_display() {
        assert_eq!(format!("{}", SensorError::Timeout), "Sensor read timeout");
        let msg = format!("{}", SensorError::Bus("nack".to_string()));
        assert!(msg.contains("bus") && msg.contains("nack"));
    }

    #[test]
    fn test_sample_is_finite() {
        assert!(OrientationSample::new([0.0, 0.0, 1.0], 0.0).is_finite());
        assert!(!OrientationSample::new([f64::NAN, 0.0, 1.0], 0.0).is_finite());
    }

    struct Recorder(Vec<(MotorId, Direction, f64)>);

    impl MotorDriver for Recorder {
        fn move_motor(&mut self, motor: MotorId, direction: Direction, magnitude: f64) {
            self.0.push((motor, direction, magnitude));
        }
        fn stop_motor(&mut self, _motor: MotorId) {}
        fn stop_and_reset_all(&mut self) {}
    }

    #[test]
    fn test_apply_forwards_to_move_motor() {
        let mut driver = Recorder(Vec::new());
        driver.apply(MotorId::Left, MotorCommand::from_signed(-4.0));
        assert_eq!(driver.0, vec![(MotorId::Left, Direction::Backward, 4.0)]);
    }
}
