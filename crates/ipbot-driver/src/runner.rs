//! Balancer - 固定周期控制循环
//!
//! 把控制核心和三个硬件协作方组装在一起，提供无参数的 [`Balancer::run_cycle`]
//! 以及基于 `spin_sleep` 的定周期循环 [`Balancer::run`]。
//!
//! # 定时
//!
//! 循环以锚点（deadline）推进：每个周期结束后睡眠到下一个锚点，
//! 自动扣除本周期耗时。若本周期耗时超过周期长度（overrun），不睡眠，
//! 并把锚点重置为当前时间，避免后续周期连续追赶。

use crate::intent::IntentHandle;
use crate::metrics::CycleMetrics;
use ipbot_control::{ControlCore, CycleOutcome};
use ipbot_hal::{ImuSource, MotorDriver, WheelEncoder};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub type BoxedImu = Box<dyn ImuSource + Send>;
pub type BoxedEncoder = Box<dyn WheelEncoder + Send>;
pub type BoxedMotors = Box<dyn MotorDriver + Send>;

/// 连续传感器故障时，每隔多少次打印一次告警
const FAULT_LOG_INTERVAL: u64 = 100;

/// 自平衡控制器
pub struct Balancer {
    pub(crate) core: ControlCore,
    pub(crate) imu: BoxedImu,
    pub(crate) encoder: BoxedEncoder,
    pub(crate) motors: BoxedMotors,
    pub(crate) intent: IntentHandle,
    pub(crate) metrics: Arc<CycleMetrics>,
    /// 当前连续故障次数
    consecutive_faults: u64,
}

impl std::fmt::Debug for Balancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Balancer")
            .field("core", &self.core)
            .field("intent", &self.intent.snapshot())
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}

impl Balancer {
    pub(crate) fn from_parts(
        core: ControlCore,
        imu: BoxedImu,
        encoder: BoxedEncoder,
        motors: BoxedMotors,
        intent: IntentHandle,
        metrics: Arc<CycleMetrics>,
    ) -> Self {
        Self {
            core,
            imu,
            encoder,
            motors,
            intent,
            metrics,
            consecutive_faults: 0,
        }
    }

    pub fn core(&self) -> &ControlCore {
        &self.core
    }

    /// 转向意图句柄（克隆后交给导航/输入源）
    pub fn intent_handle(&self) -> IntentHandle {
        self.intent.clone()
    }

    pub fn metrics(&self) -> Arc<CycleMetrics> {
        self.metrics.clone()
    }

    /// 控制周期（由 `cycle.period_ms` 决定）
    pub fn period(&self) -> Duration {
        self.core.config().cycle.period()
    }

    /// 执行一个控制周期
    ///
    /// 读取最新的转向意图，运行控制核心，更新指标。
    pub fn run_cycle(&mut self) -> CycleOutcome {
        self.core.set_intent(self.intent.snapshot());
        let outcome =
            self.core
                .run_cycle(self.imu.as_mut(), self.encoder.as_mut(), self.motors.as_mut());
        self.metrics.record(&outcome);

        match &outcome {
            CycleOutcome::Skipped(e) => {
                self.consecutive_faults += 1;
                if self.consecutive_faults % FAULT_LOG_INTERVAL == 1 {
                    warn!(
                        "Sensor acquisition failed ({} in a row), motors hold last command: {}",
                        self.consecutive_faults, e
                    );
                }
            },
            _ => {
                if self.consecutive_faults >= FAULT_LOG_INTERVAL {
                    info!("Sensor recovered after {} failed reads", self.consecutive_faults);
                }
                self.consecutive_faults = 0;
            },
        }

        outcome
    }

    /// 以固定周期运行，直到 `stop` 被置位或达到 `max_iterations`
    ///
    /// 返回实际执行的周期数。
    pub fn run(&mut self, stop: &AtomicBool, max_iterations: Option<u64>) -> u64 {
        self.run_with(stop, max_iterations, |_| {})
    }

    /// 同 [`run`](Self::run)，每个周期结束后调用一次 `on_cycle`
    ///
    /// `on_cycle` 的耗时计入本周期。
    pub fn run_with<F>(&mut self, stop: &AtomicBool, max_iterations: Option<u64>, mut on_cycle: F) -> u64
    where
        F: FnMut(&CycleOutcome),
    {
        let period = self.period();
        let mut next_tick = Instant::now();
        let mut iterations = 0u64;

        info!("Balancer loop started, period {:?}", period);

        loop {
            if stop.load(Ordering::Acquire) {
                break;
            }
            if let Some(max) = max_iterations
                && iterations >= max
            {
                break;
            }

            let outcome = self.run_cycle();
            on_cycle(&outcome);
            iterations += 1;

            next_tick += period;
            let now = Instant::now();
            if next_tick > now {
                spin_sleep::sleep(next_tick - now);
            } else {
                self.metrics.overruns.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Control loop overrun: cycle took {:?} (period {:?})",
                    now.duration_since(next_tick - period),
                    period
                );
                next_tick = now;
            }
        }

        info!("Balancer loop stopped after {} cycles", iterations);
        iterations
    }
}
