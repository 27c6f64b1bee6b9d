//! IntentHandle 的属性测试

use ipbot_control::intent::{Longitudinal, Turn};
use ipbot_driver::IntentHandle;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Forward,
    Backward,
    Stop,
    Left,
    Right,
    Straight,
    Offset(f64),
    Turning(f64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Forward),
        Just(Op::Backward),
        Just(Op::Stop),
        Just(Op::Left),
        Just(Op::Right),
        Just(Op::Straight),
        (-20.0..20.0f64).prop_map(Op::Offset),
        (0.0..50.0f64).prop_map(Op::Turning),
    ]
}

proptest! {
    /// 任意 setter 序列之后，纵向标志恰有一个置位，左右最多一个置位，
    /// 且解析结果与最后一次模式设置一致
    #[test]
    fn setters_keep_flags_exclusive(ops in prop::collection::vec(op(), 0..40)) {
        let handle = IntentHandle::default();
        let mut expected_long = Longitudinal::Hold;
        let mut expected_turn = Turn::Straight;

        for op in &ops {
            match op {
                Op::Forward => { handle.forward(); expected_long = Longitudinal::Forward; },
                Op::Backward => { handle.backward(); expected_long = Longitudinal::Backward; },
                Op::Stop => { handle.stop(); expected_long = Longitudinal::Hold; },
                Op::Left => { handle.left(); expected_turn = Turn::Left; },
                Op::Right => { handle.right(); expected_turn = Turn::Right; },
                Op::Straight => { handle.straight(); expected_turn = Turn::Straight; },
                Op::Offset(v) => handle.set_longitudinal_offset(*v),
                Op::Turning(v) => handle.set_turning_offset(*v),
            }
        }

        let intent = handle.snapshot();
        let long_flags = [intent.forward, intent.backward, intent.stop];
        prop_assert_eq!(long_flags.iter().filter(|f| **f).count(), 1);
        prop_assert!(!(intent.left && intent.right));
        prop_assert_eq!(intent.longitudinal(), expected_long);
        prop_assert_eq!(intent.turn(), expected_turn);
    }
}
