//! 安全状态机 - 倒地/平衡两态滞回
//!
//! - Prone：倾角进入恢复带（窄）才切换到 Balancing
//! - Balancing：倾角离开平衡带（宽）即切换到 Prone
//!
//! 宽带吸收平衡过程中的振荡，窄带要求车体被扶到接近直立后才重新启动电机。

use crate::config::SafetyConfig;
use tracing::info;

/// 安全状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SafetyState {
    /// 倒地：电机保持停止
    #[default]
    Prone,
    /// 平衡：修正器驱动电机
    Balancing,
}

/// 由当前状态和滤波倾角计算下一状态
///
/// 纯函数。NaN 不在任何角度带内，因此总是导向 Prone。
pub fn next_state(current: SafetyState, tilt: f64, config: &SafetyConfig) -> SafetyState {
    let band = match current {
        SafetyState::Prone => &config.recover_band,
        SafetyState::Balancing => &config.balance_band,
    };
    if band.contains(tilt) {
        SafetyState::Balancing
    } else {
        SafetyState::Prone
    }
}

/// 一次状态更新的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyTransition {
    pub previous: SafetyState,
    pub current: SafetyState,
}

impl SafetyTransition {
    /// Prone -> Balancing
    pub fn is_recovery(&self) -> bool {
        self.previous == SafetyState::Prone && self.current == SafetyState::Balancing
    }

    /// Balancing -> Prone
    pub fn is_fall(&self) -> bool {
        self.previous == SafetyState::Balancing && self.current == SafetyState::Prone
    }

    pub fn is_balancing(&self) -> bool {
        self.current == SafetyState::Balancing
    }
}

/// 安全监视器，持有当前状态
#[derive(Debug, Clone, PartialEq)]
pub struct SafetyMonitor {
    config: SafetyConfig,
    state: SafetyState,
}

impl SafetyMonitor {
    /// 以 Prone 状态启动
    pub fn new(config: SafetyConfig) -> Self {
        Self {
            config,
            state: SafetyState::Prone,
        }
    }

    pub fn state(&self) -> SafetyState {
        self.state
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    pub fn update(&mut self, tilt: f64) -> SafetyTransition {
        let previous = self.state;
        self.state = next_state(previous, tilt, &self.config);
        let transition = SafetyTransition {
            previous,
            current: self.state,
        };

        if transition.is_recovery() {
            info!("Recovered upright at {:.2}°, balancing", tilt);
        } else if transition.is_fall() {
            info!("Fell over at {:.2}°, motors stopped", tilt);
        }

        transition
    }
}
