//! 控制周期指标
//!
//! 原子计数器，控制线程写入，任何线程都可以无锁读取快照。

use ipbot_control::CycleOutcome;
use std::sync::atomic::{AtomicU64, Ordering};

/// 控制周期实时指标
///
/// # 使用示例
///
/// ```rust
/// use ipbot_driver::CycleMetrics;
/// use std::sync::Arc;
/// use std::sync::atomic::Ordering;
///
/// let metrics = Arc::new(CycleMetrics::default());
/// metrics.cycles.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.cycles, 1);
/// ```
#[derive(Debug, Default)]
pub struct CycleMetrics {
    /// 已执行的周期总数（含被跳过的）
    pub cycles: AtomicU64,

    /// 传感器采集失败次数
    ///
    /// 持续增长说明传感器总线有问题；此时电机保持最后一次命令。
    pub sensor_faults: AtomicU64,

    /// 处于 Prone 的周期数
    pub prone_cycles: AtomicU64,

    /// 处于 Balancing 的周期数
    pub balancing_cycles: AtomicU64,

    /// Prone -> Balancing 次数
    pub recoveries: AtomicU64,

    /// Balancing -> Prone 次数
    pub falls: AtomicU64,

    /// 周期超时次数（单个周期耗时超过周期长度）
    pub overruns: AtomicU64,
}

impl CycleMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按周期结果累加计数
    pub fn record(&self, outcome: &CycleOutcome) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        match outcome {
            CycleOutcome::Skipped(_) => {
                self.sensor_faults.fetch_add(1, Ordering::Relaxed);
            },
            CycleOutcome::Stopped { .. } => {
                self.prone_cycles.fetch_add(1, Ordering::Relaxed);
            },
            CycleOutcome::Driven { .. } => {
                self.balancing_cycles.fetch_add(1, Ordering::Relaxed);
            },
        }

        if let Some(transition) = outcome.transition() {
            if transition.is_recovery() {
                self.recoveries.fetch_add(1, Ordering::Relaxed);
            } else if transition.is_fall() {
                self.falls.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            sensor_faults: self.sensor_faults.load(Ordering::Relaxed),
            prone_cycles: self.prone_cycles.load(Ordering::Relaxed),
            balancing_cycles: self.balancing_cycles.load(Ordering::Relaxed),
            recoveries: self.recoveries.load(Ordering::Relaxed),
            falls: self.falls.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.cycles.store(0, Ordering::Relaxed);
        self.sensor_faults.store(0, Ordering::Relaxed);
        self.prone_cycles.store(0, Ordering::Relaxed);
        self.balancing_cycles.store(0, Ordering::Relaxed);
        self.recoveries.store(0, Ordering::Relaxed);
        self.falls.store(0, Ordering::Relaxed);
        self.overruns.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub sensor_faults: u64,
    pub prone_cycles: u64,
    pub balancing_cycles: u64,
    pub recoveries: u64,
    pub falls: u64,
    pub overruns: u64,
}

impl MetricsSnapshot {
    /// 传感器故障率（百分比），`cycles` 为 0 时返回 0.0
    pub fn fault_rate(&self) -> f64 {
        if self.cycles == 0 {
            return 0.0;
        }
        (self.sensor_faults as f64 / self.cycles as f64) * 100.0
    }

    /// 平衡周期占有效周期的比例（百分比）
    pub fn balancing_ratio(&self) -> f64 {
        let effective = self.prone_cycles + self.balancing_cycles;
        if effective == 0 {
            return 0.0;
        }
        (self.balancing_cycles as f64 / effective as f64) * 100.0
    }
}
