//! 转向意图
//!
//! 由外部导航/输入源在周期之间设置，控制核心只读取。
//! 五个布尔标志两两互斥（前进/后退/停止，左/右），另有两个数值偏移。

use serde::{Deserialize, Serialize};

/// 纵向模式（按优先级解析后）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Longitudinal {
    Forward,
    Backward,
    /// 定点保持（Stop 或未设置任何纵向标志）
    Hold,
}

/// 转向模式（按优先级解析后）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Left,
    Right,
    Straight,
}

/// 转向意图
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringIntent {
    pub forward: bool,
    pub backward: bool,
    pub stop: bool,
    pub left: bool,
    pub right: bool,
    /// 纵向偏移（度），前进/后退时作用于目标角
    pub longitudinal_offset: f64,
    /// 转向偏移，左/右转时作用于左右轮差分
    pub turning_offset: f64,
}

impl Default for SteeringIntent {
    /// 默认为停止（定点保持）、直行、偏移为 0
    fn default() -> Self {
        Self {
            forward: false,
            backward: false,
            stop: true,
            left: false,
            right: false,
            longitudinal_offset: 0.0,
            turning_offset: 0.0,
        }
    }
}

impl SteeringIntent {
    pub fn forward(offset: f64) -> Self {
        Self::default().with_longitudinal(Longitudinal::Forward, offset)
    }

    pub fn backward(offset: f64) -> Self {
        Self::default().with_longitudinal(Longitudinal::Backward, offset)
    }

    /// 设置纵向模式，互斥的另外两个标志被清除
    pub fn with_longitudinal(mut self, mode: Longitudinal, offset: f64) -> Self {
        self.forward = mode == Longitudinal::Forward;
        self.backward = mode == Longitudinal::Backward;
        self.stop = mode == Longitudinal::Hold;
        self.longitudinal_offset = offset;
        self
    }

    /// 设置转向模式，互斥的另一个标志被清除
    pub fn with_turn(mut self, turn: Turn, offset: f64) -> Self {
        self.left = turn == Turn::Left;
        self.right = turn == Turn::Right;
        self.turning_offset = offset;
        self
    }

    /// 解析纵向模式：Forward > Backward > Hold
    ///
    /// 标志同时置位时按优先级取第一个；三者都未置位时按 Hold 处理。
    pub fn longitudinal(&self) -> Longitudinal {
        if self.forward {
            Longitudinal::Forward
        } else if self.backward {
            Longitudinal::Backward
        } else {
            Longitudinal::Hold
        }
    }

    /// 解析转向模式：Left > Right > Straight
    pub fn turn(&self) -> Turn {
        if self.left {
            Turn::Left
        } else if self.right {
            Turn::Right
        } else {
            Turn::Straight
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_hold_straight() {
        let intent = SteeringIntent::default();
        assert!(intent.stop);
        assert_eq!(intent.longitudinal(), Longitudinal::Hold);
        assert_eq!(intent.turn(), Turn::Straight);
    }

    #[test]
    fn test_precedence() {
        let intent = SteeringIntent {
            forward: true,
            backward: true,
            stop: true,
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(intent.longitudinal(), Longitudinal::Forward);
        assert_eq!(intent.turn(), Turn::Left);

        let intent = SteeringIntent {
            backward: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(intent.longitudinal(), Longitudinal::Backward);
        assert_eq!(intent.turn(), Turn::Right);
    }

    #[test]
    fn test_no_flags_is_hold() {
        let intent = SteeringIntent {
            stop: false,
            ..Default::default()
        };
        assert_eq!(intent.longitudinal(), Longitudinal::Hold);
    }

    #[test]
    fn test_setters_keep_pairs_exclusive() {
        let intent = SteeringIntent::forward(2.0)
            .with_turn(Turn::Left, 5.0)
            .with_longitudinal(Longitudinal::Backward, 1.0)
            .with_turn(Turn::Right, 3.0);

        assert!(!intent.forward && intent.backward && !intent.stop);
        assert!(!intent.left && intent.right);
        assert_eq!(intent.longitudinal_offset, 1.0);
        assert_eq!(intent.turning_offset, 3.0);
    }
}
