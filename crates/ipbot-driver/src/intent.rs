//! 共享转向意图句柄
//!
//! 外部导航/输入源在任意线程写入，控制线程每个周期开始时无锁读取一次快照。
//! 写入使用 `rcu`，并发的 setter 不会互相覆盖。

use arc_swap::ArcSwap;
use ipbot_control::intent::{Longitudinal, SteeringIntent, Turn};
use std::sync::Arc;

/// 转向意图句柄（可克隆，所有克隆共享同一份意图）
#[derive(Debug, Clone)]
pub struct IntentHandle {
    inner: Arc<ArcSwap<SteeringIntent>>,
}

impl Default for IntentHandle {
    fn default() -> Self {
        Self::new(SteeringIntent::default())
    }
}

impl IntentHandle {
    pub fn new(initial: SteeringIntent) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// 读取当前意图（无锁）
    pub fn snapshot(&self) -> SteeringIntent {
        **self.inner.load()
    }

    /// 整体替换
    pub fn set(&self, intent: SteeringIntent) {
        self.inner.store(Arc::new(intent));
    }

    fn update(&self, f: impl Fn(SteeringIntent) -> SteeringIntent) {
        self.inner.rcu(|old| f(**old));
    }

    fn set_longitudinal(&self, mode: Longitudinal) {
        self.update(|intent| {
            let offset = intent.longitudinal_offset;
            intent.with_longitudinal(mode, offset)
        });
    }

    fn set_turn(&self, turn: Turn) {
        self.update(|intent| {
            let offset = intent.turning_offset;
            intent.with_turn(turn, offset)
        });
    }

    /// 前进（清除后退/停止）
    pub fn forward(&self) {
        self.set_longitudinal(Longitudinal::Forward);
    }

    /// 后退（清除前进/停止）
    pub fn backward(&self) {
        self.set_longitudinal(Longitudinal::Backward);
    }

    /// 定点保持（清除前进/后退）
    pub fn stop(&self) {
        self.set_longitudinal(Longitudinal::Hold);
    }

    pub fn left(&self) {
        self.set_turn(Turn::Left);
    }

    pub fn right(&self) {
        self.set_turn(Turn::Right);
    }

    /// 取消转向
    pub fn straight(&self) {
        self.set_turn(Turn::Straight);
    }

    pub fn set_longitudinal_offset(&self, offset: f64) {
        self.update(|mut intent| {
            intent.longitudinal_offset = offset;
            intent
        });
    }

    pub fn set_turning_offset(&self, offset: f64) {
        self.update(|mut intent| {
            intent.turning_offset = offset;
            intent
        });
    }
}
