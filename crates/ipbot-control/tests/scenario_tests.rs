//! 端到端场景测试
//!
//! 从全新的控制核心出发，第一帧采样直接成为滤波初值，
//! 因此可以精确构造"本周期倾角"。

use ipbot_control::intent::Turn;
use ipbot_control::{
    ControlConfig, ControlCore, CycleOutcome, FeedbackAggregator, SafetyState, SteeringIntent,
    WheelFeedback,
};
use ipbot_hal::mock::MockRig;
use ipbot_hal::{Direction, OrientationSample};

fn sample_at(tilt_deg: f64) -> OrientationSample {
    let theta = (tilt_deg - 180.0).to_radians();
    OrientationSample::new([0.0, 16384.0 * theta.sin(), 16384.0 * theta.cos()], 0.0)
}

fn core() -> ControlCore {
    ControlCore::new(ControlConfig::default()).unwrap()
}

#[test]
fn test_prone_upright_at_rest_engages_with_zero_output() {
    let mut core = core();
    assert_eq!(core.safety_state(), SafetyState::Prone);

    let outcome = core.step(&sample_at(180.0), WheelFeedback::new(0, 0));
    let CycleOutcome::Driven {
        output, transition, ..
    } = outcome
    else {
        panic!("Expected Driven, got {:?}", outcome);
    };

    assert!(transition.is_recovery());
    assert_eq!(output.target_angle, 180.0);
    assert_eq!(output.pid_value, 0.0);
    for cmd in [output.commands.left, output.commands.right] {
        assert_eq!(cmd.direction, Direction::Forward);
        assert_eq!(cmd.magnitude, 0.0);
    }
}

#[test]
fn test_forward_intent_leaning_back_drives_backward() {
    let mut core = core();
    core.set_intent(SteeringIntent::forward(0.0));

    let outcome = core.step(&sample_at(178.0), WheelFeedback::new(0, 350));
    let CycleOutcome::Driven { tilt, output, .. } = outcome else {
        panic!("Expected Driven, got {:?}", outcome);
    };

    assert!((tilt - 178.0).abs() < 1e-9);
    // offset = 0 + 350/35 = 10, 目标角 = 170，误差 = -8
    assert!((output.target_angle - 170.0).abs() < 1e-12);
    let state = core.corrector().pid_state();
    assert!((state.p_term - (-443.744)).abs() < 1e-6);
    assert!(output.pid_value < 0.0);

    assert_eq!(output.commands.left.direction, Direction::Backward);
    assert_eq!(output.commands.right.direction, Direction::Backward);
    assert_eq!(output.commands.left.magnitude, output.commands.right.magnitude);
    assert!((output.commands.left.magnitude - output.pid_value.abs()).abs() < 1e-12);

    // 偏移只作用于本周期，不写回意图
    assert_eq!(core.intent().longitudinal_offset, 0.0);
}

#[test]
fn test_left_turn_is_reduced_by_speed() {
    let mut core = core();
    core.set_intent(SteeringIntent::default().with_turn(Turn::Left, 10.0));

    let outcome = core.step(&sample_at(170.0), WheelFeedback::new(0, 70));
    let CycleOutcome::Driven { output, .. } = outcome else {
        panic!("Expected Driven, got {:?}", outcome);
    };

    // turning = 10 - 70/35 = 8
    assert!((output.left_value - (output.pid_value - 8.0)).abs() < 1e-9);
    assert!((output.right_value - (output.pid_value + 8.0)).abs() < 1e-9);
}

#[test]
fn test_sensor_fault_leaves_state_untouched() {
    let rig = MockRig::new();
    rig.set_tilt(182.0);
    let mut core = core();
    let mut imu = rig.imu();
    let mut encoder = FeedbackAggregator::new(rig.counter(), &core.config().feedback);
    let mut motors = rig.motors();

    for _ in 0..50 {
        core.run_cycle(&mut imu, &mut encoder, &mut motors);
        rig.step(0.01);
    }
    assert_eq!(core.safety_state(), SafetyState::Balancing);

    let before_core = core.clone();
    let before_rig = rig.state();
    let before_feedback = encoder.feedback();

    rig.inject_faults(1);
    let outcome = core.run_cycle(&mut imu, &mut encoder, &mut motors);

    assert!(outcome.is_skipped());
    assert_eq!(core, before_core);
    assert_eq!(encoder.feedback(), before_feedback);
    let after_rig = rig.state();
    assert_eq!(after_rig.commands_issued, before_rig.commands_issued);
    assert_eq!(after_rig.stop_resets, before_rig.stop_resets);
    // 电机保持上一次的命令
    assert_eq!(after_rig.left_command, before_rig.left_command);
    assert_eq!(after_rig.right_command, before_rig.right_command);
}

#[test]
fn test_prone_never_drives_motors() {
    let rig = MockRig::new();
    rig.set_tilt(240.0);
    let mut core = core();
    let mut imu = rig.imu();
    let mut encoder = FeedbackAggregator::new(rig.counter(), &core.config().feedback);
    let mut motors = rig.motors();

    for _ in 0..100 {
        let outcome = core.run_cycle(&mut imu, &mut encoder, &mut motors);
        assert!(matches!(outcome, CycleOutcome::Stopped { .. }));
        rig.step(0.01);
    }

    let state = rig.state();
    assert_eq!(state.commands_issued, 0);
    assert_eq!(state.stop_resets, 100);
    // 未在平衡状态下运行过，PID 状态未被触碰
    assert_eq!(core.corrector().pid_state().i_term, 0.0);
}

#[test]
fn test_prone_cycles_keep_pid_and_target_position() {
    let mut core = core();

    // 恢复时锁存目标位置 120，随后在 175° 保持，积分持续累积
    let first = core.step(&sample_at(175.0), WheelFeedback::new(120, 0));
    assert!(first.transition().is_some_and(|t| t.is_recovery()));
    for _ in 0..20 {
        let outcome = core.step(&sample_at(175.0), WheelFeedback::new(120, 0));
        assert!(matches!(outcome, CycleOutcome::Driven { .. }));
    }
    assert_eq!(core.corrector().target_position(), 120);

    // 持续倒向 250°，直到滤波角离开平衡带
    let mut fell = false;
    for _ in 0..500 {
        let outcome = core.step(&sample_at(250.0), WheelFeedback::new(120, 0));
        if matches!(outcome, CycleOutcome::Stopped { .. }) {
            assert!(outcome.transition().is_some_and(|t| t.is_fall()));
            fell = true;
            break;
        }
    }
    assert!(fell, "robot never fell");

    let pid_before = *core.corrector().pid_state();
    assert!(pid_before.i_term != 0.0);

    // 倒地期间反馈任意变化，PID 和目标位置都不变
    for k in 0..100 {
        let outcome = core.step(&sample_at(250.0), WheelFeedback::new(5000 + k, -300));
        assert!(matches!(outcome, CycleOutcome::Stopped { .. }));
        assert_eq!(core.safety_state(), SafetyState::Prone);
    }

    assert_eq!(*core.corrector().pid_state(), pid_before);
    assert_eq!(core.corrector().target_position(), 120);
}
