//! 车轮反馈聚合
//!
//! 把左右编码器原始计数聚合为合成传动系统的位置和速度：
//!
//! - 位置 = 左计数 + 右计数
//! - 速度 = 最近一个完整窗口内的位置增量（窗口默认 10 个周期，即 100ms）
//!
//! [`FeedbackAggregator`] 本身实现 [`WheelEncoder`]，控制核心只看到位置/速度。

use crate::config::FeedbackConfig;
use ipbot_hal::{PulseCounter, WheelEncoder};

/// 单周期的车轮反馈读数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WheelFeedback {
    /// 累计位置（带符号）
    pub position: i64,
    /// 速度（带符号）
    pub velocity: i64,
}

impl WheelFeedback {
    pub fn new(position: i64, velocity: i64) -> Self {
        Self { position, velocity }
    }

    /// 从编码器读取当前位置和速度
    pub fn read<E: WheelEncoder + ?Sized>(encoder: &E) -> Self {
        Self {
            position: encoder.wheel_position(),
            velocity: encoder.wheel_velocity(),
        }
    }
}

/// 编码器计数聚合器
#[derive(Debug, Clone)]
pub struct FeedbackAggregator<C> {
    counter: C,
    window: u32,
    ticks: u32,
    position: i64,
    window_start: i64,
    velocity: i64,
}

impl<C: PulseCounter> FeedbackAggregator<C> {
    pub fn new(counter: C, config: &FeedbackConfig) -> Self {
        Self {
            counter,
            window: config.velocity_window.max(1),
            ticks: 0,
            position: 0,
            window_start: 0,
            velocity: 0,
        }
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }

    pub fn feedback(&self) -> WheelFeedback {
        WheelFeedback::new(self.position, self.velocity)
    }

    /// 清空历史（位置、窗口起点、速度）
    ///
    /// 在电机驱动的 `stop_and_reset_all` 清零计数之后调用。
    pub fn reset(&mut self) {
        self.ticks = 0;
        self.position = 0;
        self.window_start = 0;
        self.velocity = 0;
    }
}

impl<C: PulseCounter> WheelEncoder for FeedbackAggregator<C> {
    fn wheel_position(&self) -> i64 {
        self.position
    }

    fn wheel_velocity(&self) -> i64 {
        self.velocity
    }

    fn refresh(&mut self) {
        let counts = self.counter.counts();
        self.position = counts.left + counts.right;

        self.ticks += 1;
        if self.ticks >= self.window {
            self.velocity = self.position - self.window_start;
            self.window_start = self.position;
            self.ticks = 0;
        }
    }

    fn on_counters_reset(&mut self) {
        self.reset();
    }
}
