//! # ipbot Driver
//!
//! 控制核心的运行时：
//!
//! - [`BalancerBuilder`] / [`Balancer`]: 组装协作方，单线程定周期循环
//! - [`IntentHandle`]: 跨线程共享的转向意图（`arc-swap`，无锁读取）
//! - [`CycleMetrics`]: 原子计数的周期指标
//! - [`spawn_pipeline`]: 采集 / 控制 / 执行三阶段线程流水线（`crossbeam-channel`）
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use ipbot_driver::BalancerBuilder;
//! use ipbot_hal::mock::MockRig;
//! use std::sync::atomic::AtomicBool;
//!
//! let rig = MockRig::new();
//! let mut balancer = BalancerBuilder::new()
//!     .imu(rig.imu())
//!     .pulse_counter(rig.counter())
//!     .motors(rig.motors())
//!     .build()?;
//!
//! let intent = balancer.intent_handle();
//! intent.forward();
//! intent.set_longitudinal_offset(2.0);
//!
//! let stop = AtomicBool::new(false);
//! balancer.run(&stop, Some(1000));
//! # Ok::<(), ipbot_driver::DriverError>(())
//! ```

pub mod builder;
pub mod error;
pub mod intent;
pub mod metrics;
pub mod pipeline;
pub mod runner;

pub use builder::BalancerBuilder;
pub use error::DriverError;
pub use intent::IntentHandle;
pub use metrics::{CycleMetrics, MetricsSnapshot};
pub use pipeline::{Acquisition, PipelineConfig, PipelineHandle, PipelineParts, spawn_pipeline};
pub use runner::{Balancer, BoxedEncoder, BoxedImu, BoxedMotors};
