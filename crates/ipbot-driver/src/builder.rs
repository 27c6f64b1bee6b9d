//! Builder 模式实现
//!
//! 提供链式构造 [`Balancer`] 的便捷方式。

use crate::error::DriverError;
use crate::intent::IntentHandle;
use crate::metrics::CycleMetrics;
use crate::runner::{Balancer, BoxedEncoder, BoxedImu, BoxedMotors};
use ipbot_control::{ControlConfig, ControlCore, FeedbackAggregator};
use ipbot_hal::{ImuSource, MotorDriver, PulseCounter, WheelEncoder};
use std::sync::Arc;

/// Balancer Builder（链式构造）
///
/// # Example
///
/// ```rust
/// use ipbot_driver::BalancerBuilder;
/// use ipbot_hal::mock::MockRig;
///
/// let rig = MockRig::new();
/// let mut balancer = BalancerBuilder::new()
///     .imu(rig.imu())
///     .pulse_counter(rig.counter())
///     .motors(rig.motors())
///     .build()
///     .unwrap();
///
/// balancer.run_cycle();
/// ```
#[derive(Default)]
pub struct BalancerBuilder {
    config: Option<ControlConfig>,
    imu: Option<BoxedImu>,
    encoder: Option<BoxedEncoder>,
    counter: Option<Box<dyn PulseCounter + Send>>,
    motors: Option<BoxedMotors>,
    intent: Option<IntentHandle>,
    metrics: Option<Arc<CycleMetrics>>,
}

impl BalancerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置控制配置（可选，默认 [`ControlConfig::default`]）
    pub fn config(mut self, config: ControlConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn imu(mut self, imu: impl ImuSource + Send + 'static) -> Self {
        self.imu = Some(Box::new(imu));
        self
    }

    /// 直接提供位置/速度反馈
    ///
    /// 与 [`pulse_counter`](Self::pulse_counter) 二选一，同时设置时以此为准。
    pub fn encoder(mut self, encoder: impl WheelEncoder + Send + 'static) -> Self {
        self.encoder = Some(Box::new(encoder));
        self
    }

    /// 提供原始脉冲计数，构建时包装为 [`FeedbackAggregator`]
    pub fn pulse_counter(mut self, counter: impl PulseCounter + Send + 'static) -> Self {
        self.counter = Some(Box::new(counter));
        self
    }

    pub fn motors(mut self, motors: impl MotorDriver + Send + 'static) -> Self {
        self.motors = Some(Box::new(motors));
        self
    }

    /// 共享已有的意图句柄（可选）
    pub fn intent_handle(mut self, handle: IntentHandle) -> Self {
        self.intent = Some(handle);
        self
    }

    /// 共享已有的指标（可选）
    pub fn metrics(mut self, metrics: Arc<CycleMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// 构建 Balancer
    ///
    /// # Errors
    /// - `DriverError::Config`: 配置校验失败
    /// - `DriverError::MissingComponent`: 缺少 IMU、编码器或电机
    pub fn build(self) -> Result<Balancer, DriverError> {
        let config = self.config.unwrap_or_default();
        let core = ControlCore::new(config)?;

        let imu = self.imu.ok_or(DriverError::MissingComponent("imu"))?;
        let encoder: BoxedEncoder = match (self.encoder, self.counter) {
            (Some(encoder), _) => encoder,
            (None, Some(counter)) => {
                Box::new(FeedbackAggregator::new(counter, &core.config().feedback))
            },
            (None, None) => return Err(DriverError::MissingComponent("encoder")),
        };
        let motors = self.motors.ok_or(DriverError::MissingComponent("motors"))?;

        Ok(Balancer::from_parts(
            core,
            imu,
            encoder,
            motors,
            self.intent.unwrap_or_default(),
            self.metrics.unwrap_or_default(),
        ))
    }
}
