//! 仿真命令
//!
//! 在 [`MockRig`] 的线性化倒立摆上闭环运行控制器，结束后打印指标摘要。
//! 默认按仿真时间推进（不等待真实时钟），`--realtime` 时按控制周期实时运行，
//! Ctrl+C 提前结束。

use super::config::load_or_default;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use ipbot_control::{ControlConfig, SafetyState};
use ipbot_driver::{Balancer, BalancerBuilder, IntentHandle, MetricsSnapshot};
use ipbot_hal::mock::MockRig;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// 仿真使用的转向意图
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IntentArg {
    Stop,
    Forward,
    Backward,
    Left,
    Right,
}

/// 仿真参数
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// 运行的控制周期数
    #[arg(short, long, default_value_t = 1000)]
    pub cycles: u64,

    /// 控制参数文件（默认使用内置参数）
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// 转向意图
    #[arg(short, long, value_enum, default_value_t = IntentArg::Stop)]
    pub intent: IntentArg,

    /// 纵向角度偏移（度）
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub offset: f64,

    /// 转向偏移
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub turning: f64,

    /// 初始俯仰角（度，180 为直立）
    #[arg(long, default_value_t = 180.0)]
    pub initial_tilt: f64,

    /// 开始时注入的连续采集失败次数
    #[arg(long, default_value_t = 0)]
    pub sensor_faults: u32,

    /// 按真实控制周期运行
    #[arg(long)]
    pub realtime: bool,
}

/// 仿真结果
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub metrics: MetricsSnapshot,
    /// 模拟平台的真实俯仰角
    pub final_tilt: f64,
    /// 滤波后的俯仰角
    pub estimated_tilt: f64,
    pub final_state: SafetyState,
}

impl SimulateCommand {
    pub fn execute(self) -> Result<()> {
        let config = load_or_default(self.file.as_deref())?;

        let stop = Arc::new(AtomicBool::new(false));
        if self.realtime {
            let s = stop.clone();
            ctrlc::set_handler(move || {
                s.store(true, Ordering::SeqCst);
                println!("\n收到退出信号，正在停止...");
            })
            .context("设置 Ctrl+C 处理失败")?;
        }

        let report = self.simulate(config, &stop)?;
        print_report(&report);
        Ok(())
    }

    /// 运行仿真
    pub fn simulate(&self, config: ControlConfig, stop: &AtomicBool) -> Result<SimulationReport> {
        let rig = MockRig::new();
        rig.set_tilt(self.initial_tilt);
        rig.inject_faults(self.sensor_faults);

        let mut balancer = BalancerBuilder::new()
            .config(config)
            .imu(rig.imu())
            .pulse_counter(rig.counter())
            .motors(rig.motors())
            .build()
            .context("创建控制器失败")?;
        self.apply_intent(&balancer.intent_handle());

        let dt = balancer.core().config().cycle.dt_secs();
        info!(
            "Simulating {} cycles from tilt {:.1}° (intent {:?})",
            self.cycles, self.initial_tilt, self.intent
        );

        if self.realtime {
            balancer.run_with(stop, Some(self.cycles), |_| rig.step(dt));
        } else {
            for _ in 0..self.cycles {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                balancer.run_cycle();
                rig.step(dt);
            }
        }

        Ok(report(&balancer, &rig))
    }

    /// 把命令行意图写入句柄
    pub fn apply_intent(&self, handle: &IntentHandle) {
        match self.intent {
            IntentArg::Stop => handle.stop(),
            IntentArg::Forward => handle.forward(),
            IntentArg::Backward => handle.backward(),
            IntentArg::Left => handle.left(),
            IntentArg::Right => handle.right(),
        }
        handle.set_longitudinal_offset(self.offset);
        handle.set_turning_offset(self.turning);
    }
}

fn report(balancer: &Balancer, rig: &MockRig) -> SimulationReport {
    let core = balancer.core();
    SimulationReport {
        metrics: balancer.metrics().snapshot(),
        final_tilt: rig.state().tilt_deg,
        estimated_tilt: core.estimator().angle(),
        final_state: core.safety_state(),
    }
}

fn print_report(report: &SimulationReport) {
    let m = &report.metrics;
    let marker = if m.falls == 0 && report.final_state == SafetyState::Balancing {
        "✅"
    } else {
        "⚠️"
    };

    println!("{} 仿真结束: {:?}", marker, report.final_state);
    println!("  周期数: {}", m.cycles);
    println!("  平衡周期: {} ({:.1}%)", m.balancing_cycles, m.balancing_ratio());
    println!("  倒地周期: {}", m.prone_cycles);
    println!("  传感器故障: {} ({:.1}%)", m.sensor_faults, m.fault_rate());
    println!("  恢复次数: {}  倒地次数: {}", m.recoveries, m.falls);
    if m.overruns > 0 {
        println!("  周期超时: {}", m.overruns);
    }
    println!(
        "  最终俯仰角: {:.2}° (滤波 {:.2}°)",
        report.final_tilt, report.estimated_tilt
    );
}
