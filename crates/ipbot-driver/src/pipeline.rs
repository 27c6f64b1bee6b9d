//! 三阶段流水线：采集 -> 控制 -> 执行
//!
//! 每个阶段一个线程，阶段之间用有界 `crossbeam-channel` 传递数据，
//! 每份状态只有一个写入者：
//!
//! | 阶段 | 独占 | 输入 | 输出 |
//! |------|------|------|------|
//! | 采集 | IMU、编码器、超时计数 | 定时器、计数清零次数 | [`Acquisition`] |
//! | 控制 | [`ControlCore`]、周期指标 | [`Acquisition`]、意图快照 | [`CycleOutcome`] |
//! | 执行 | 电机、计数清零次数 | [`CycleOutcome`] | - |
//!
//! 采集周期取自控制核心的 `cycle.period_ms`，与滤波器积分步长一致。
//!
//! 传感器故障作为 `Skipped` 一路传到执行阶段，执行阶段不发任何命令。
//!
//! # 计数清零
//!
//! Prone 时执行阶段 `stop_and_reset_all` 后递增清零次数，采集阶段在下一个周期
//! 看到新值后复位编码器历史，并把已应用的清零次数写入 [`Acquisition::reset_epoch`]。
//! 队列中早于最近一次清零采集的反馈已经过期，控制阶段按清零后的零值处理，
//! 恢复平衡时锁存的目标位置因此不会带入清零前的计数。
//!
//! # 关闭
//!
//! 采集阶段检查运行标志（或达到 `max_cycles`）后退出并释放发送端，
//! 下游阶段在通道断开后依次退出。

use crate::error::DriverError;
use crate::intent::IntentHandle;
use crate::metrics::CycleMetrics;
use crate::runner::{Balancer, BoxedEncoder, BoxedImu, BoxedMotors};
use crossbeam_channel::{Receiver, Sender, bounded};
use ipbot_control::{ControlCore, CycleOutcome, WheelFeedback};
use ipbot_hal::{OrientationSample, SensorError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};

/// 流水线配置
///
/// 采集周期不在这里配置，由控制核心的 `cycle.period_ms` 决定。
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 阶段间队列容量
    ///
    /// 控制阶段跟不上时采集阶段会阻塞，而不是丢弃样本。
    pub queue_capacity: usize,

    /// 采集阶段最多执行的周期数（None 表示直到 shutdown）
    pub max_cycles: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 4,
            max_cycles: None,
        }
    }
}

/// 采集阶段的输出
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    /// 周期序号（从 0 开始）
    pub seq: u64,
    pub sample: Result<OrientationSample, SensorError>,
    pub feedback: WheelFeedback,
    /// 读取反馈时已应用的计数清零次数
    pub reset_epoch: u64,
}

impl Acquisition {
    /// 控制阶段可用的反馈
    ///
    /// `stops_issued` 为控制阶段已发出的 `Stopped` 次数。反馈采集时尚未应用全部清零，
    /// 说明计数来自清零之前，返回清零后的零值。
    pub fn feedback_for(&self, stops_issued: u64) -> WheelFeedback {
        if self.reset_epoch < stops_issued {
            WheelFeedback::default()
        } else {
            self.feedback
        }
    }
}

/// 流水线各阶段使用的协作方
pub struct PipelineParts {
    pub core: ControlCore,
    pub imu: BoxedImu,
    pub encoder: BoxedEncoder,
    pub motors: BoxedMotors,
    pub intent: IntentHandle,
    pub metrics: Arc<CycleMetrics>,
}

/// 流水线句柄
///
/// Drop 时自动 shutdown。
pub struct PipelineHandle {
    is_running: Arc<AtomicBool>,
    period: Duration,
    acquisition: Option<JoinHandle<()>>,
    control: Option<JoinHandle<ControlCore>>,
    actuation: Option<JoinHandle<()>>,
    metrics: Arc<CycleMetrics>,
}

impl std::fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("is_running", &self.is_running.load(Ordering::Relaxed))
            .field("period", &self.period)
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}

/// 启动三阶段流水线
pub fn spawn_pipeline(parts: PipelineParts, config: PipelineConfig) -> Result<PipelineHandle, DriverError> {
    let PipelineParts {
        core,
        imu,
        encoder,
        motors,
        intent,
        metrics,
    } = parts;

    let period = core.config().cycle.period();
    let capacity = config.queue_capacity.max(1);
    let (sample_tx, sample_rx) = bounded::<Acquisition>(capacity);
    let (outcome_tx, outcome_rx) = bounded::<CycleOutcome>(capacity);

    let is_running = Arc::new(AtomicBool::new(true));
    let resets = Arc::new(AtomicU64::new(0));

    let acquisition = {
        let stage = AcquisitionStage {
            imu,
            encoder,
            sample_tx,
            resets: resets.clone(),
            is_running: is_running.clone(),
            metrics: metrics.clone(),
            period,
            max_cycles: config.max_cycles,
        };
        thread::Builder::new()
            .name("ipbot-acquisition".to_string())
            .spawn(move || stage.run())
            .map_err(|e| DriverError::StageFailed(format!("spawn acquisition: {}", e)))?
    };

    let control = {
        let metrics = metrics.clone();
        thread::Builder::new()
            .name("ipbot-control".to_string())
            .spawn(move || control_loop(core, sample_rx, outcome_tx, intent, metrics))
            .map_err(|e| DriverError::StageFailed(format!("spawn control: {}", e)))?
    };

    let actuation = thread::Builder::new()
        .name("ipbot-actuation".to_string())
        .spawn(move || actuation_loop(motors, outcome_rx, resets))
        .map_err(|e| DriverError::StageFailed(format!("spawn actuation: {}", e)))?;

    Ok(PipelineHandle {
        is_running,
        period,
        acquisition: Some(acquisition),
        control: Some(control),
        actuation: Some(actuation),
        metrics,
    })
}

impl Balancer {
    /// 把单线程 Balancer 拆分为三阶段流水线
    ///
    /// 意图句柄和指标继续共享。
    pub fn into_pipeline(self, config: PipelineConfig) -> Result<PipelineHandle, DriverError> {
        spawn_pipeline(
            PipelineParts {
                core: self.core,
                imu: self.imu,
                encoder: self.encoder,
                motors: self.motors,
                intent: self.intent,
                metrics: self.metrics,
            },
            config,
        )
    }
}

impl PipelineHandle {
    pub fn metrics(&self) -> Arc<CycleMetrics> {
        self.metrics.clone()
    }

    /// 采集周期（等于控制核心的 `cycle.period()`）
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// 停止采集并等待所有阶段退出，返回控制核心的最终状态
    pub fn shutdown(mut self) -> Result<ControlCore, DriverError> {
        self.is_running.store(false, Ordering::Release);
        self.join_all()
    }

    /// 等待流水线自然结束（`max_cycles` 用尽），返回控制核心的最终状态
    pub fn wait(mut self) -> Result<ControlCore, DriverError> {
        self.join_all()
    }

    fn join_all(&mut self) -> Result<ControlCore, DriverError> {
        let acquisition = join_stage(self.acquisition.take(), "acquisition");
        let control = match self.control.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| DriverError::StageFailed("control thread panicked".to_string())),
            None => Err(DriverError::StageFailed("control stage already joined".to_string())),
        };
        let actuation = join_stage(self.actuation.take(), "actuation");

        acquisition?;
        actuation?;
        control
    }
}

fn join_stage(handle: Option<JoinHandle<()>>, name: &str) -> Result<(), DriverError> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| DriverError::StageFailed(format!("{} thread panicked", name))),
        None => Ok(()),
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if self.acquisition.is_none() && self.control.is_none() && self.actuation.is_none() {
            return;
        }
        self.is_running.store(false, Ordering::Release);
        if let Err(e) = self.join_all() {
            error!("Pipeline shutdown failed: {}", e);
        }
    }
}

struct AcquisitionStage {
    imu: BoxedImu,
    encoder: BoxedEncoder,
    sample_tx: Sender<Acquisition>,
    /// 执行阶段已完成的计数清零次数
    resets: Arc<AtomicU64>,
    is_running: Arc<AtomicBool>,
    metrics: Arc<CycleMetrics>,
    period: Duration,
    max_cycles: Option<u64>,
}

impl AcquisitionStage {
    fn run(mut self) {
        let mut next_tick = Instant::now();
        let mut seq = 0u64;
        let mut reset_epoch = 0u64;

        loop {
            if !self.is_running.load(Ordering::Acquire) {
                trace!("Acquisition stage: is_running flag is false, exiting");
                break;
            }
            if let Some(max) = self.max_cycles
                && seq >= max
            {
                break;
            }

            // 执行阶段已清零驱动层计数
            let resets = self.resets.load(Ordering::Acquire);
            if resets != reset_epoch {
                self.encoder.on_counters_reset();
                reset_epoch = resets;
            }

            let sample = self.imu.acquire_orientation();
            if sample.is_ok() {
                self.encoder.refresh();
            }
            let acquisition = Acquisition {
                seq,
                sample,
                feedback: WheelFeedback::read(self.encoder.as_ref()),
                reset_epoch,
            };

            if self.sample_tx.send(acquisition).is_err() {
                warn!("Acquisition stage: control stage disconnected, exiting");
                break;
            }
            seq += 1;

            next_tick += self.period;
            let now = Instant::now();
            if next_tick > now {
                spin_sleep::sleep(next_tick - now);
            } else {
                self.metrics.overruns.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Acquisition overrun: cycle {} took {:?} (period {:?})",
                    seq - 1,
                    now.duration_since(next_tick - self.period),
                    self.period
                );
                next_tick = now;
            }
        }
    }
}

fn control_loop(
    mut core: ControlCore,
    sample_rx: Receiver<Acquisition>,
    outcome_tx: Sender<CycleOutcome>,
    intent: IntentHandle,
    metrics: Arc<CycleMetrics>,
) -> ControlCore {
    let mut last_seq = None;
    let mut stops_issued = 0u64;

    for acquisition in sample_rx.iter() {
        if let Some(last) = last_seq
            && acquisition.seq != last + 1
        {
            warn!("Control stage: sequence gap {} -> {}", last, acquisition.seq);
        }
        last_seq = Some(acquisition.seq);

        core.set_intent(intent.snapshot());
        let feedback = acquisition.feedback_for(stops_issued);
        let outcome = match acquisition.sample {
            Ok(sample) => core.step(&sample, feedback),
            Err(e) => {
                debug!("Control stage: cycle {} skipped: {}", acquisition.seq, e);
                CycleOutcome::Skipped(e)
            },
        };
        metrics.record(&outcome);
        if matches!(outcome, CycleOutcome::Stopped { .. }) {
            stops_issued += 1;
        }

        if outcome_tx.send(outcome).is_err() {
            warn!("Control stage: actuation stage disconnected, exiting");
            break;
        }
    }

    core
}

fn actuation_loop(mut motors: BoxedMotors, outcome_rx: Receiver<CycleOutcome>, resets: Arc<AtomicU64>) {
    for outcome in outcome_rx.iter() {
        match outcome {
            CycleOutcome::Skipped(_) => {},
            CycleOutcome::Stopped { .. } => {
                motors.stop_and_reset_all();
                resets.fetch_add(1, Ordering::Release);
            },
            CycleOutcome::Driven { output, .. } => output.commands.send(motors.as_mut()),
        }
    }
}
