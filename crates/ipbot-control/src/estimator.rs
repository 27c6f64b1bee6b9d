//! 姿态估计器 - 加速度计倾角与陀螺仪角速度的卡尔曼融合
//!
//! # 算法
//!
//! 状态向量为 `[angle, bias]`（倾角、陀螺仪零偏），每个周期：
//!
//! ```text
//! 预测:  angle += dt * (rate - bias)
//!        P = F P Fᵀ + Q·dt            F = [[1, -dt], [0, 1]]
//! 更新:  y = measured - angle         (measured 为加速度计倾角)
//!        S = P₀₀ + R
//!        K = P·Hᵀ / S                 H = [1, 0]
//!        [angle, bias] += K·y
//!        P = (I - K H) P
//! ```
//!
//! 加速度计倾角 = atan2(accel_y, accel_z)（度）+ 180°，直立时约为 180°，
//! 与安全状态机的角度带中心一致。

use crate::config::EstimatorConfig;
use ipbot_hal::OrientationSample;
use nalgebra::{Matrix2, RowVector2, Vector2};

/// 滤波器状态
///
/// 只由 [`TiltEstimator`] 持有和修改，每个成功的周期更新一次。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState {
    /// 当前倾角估计（度）
    pub angle: f64,
    /// 陀螺仪零偏估计（°/s）
    pub bias: f64,
    /// 误差协方差
    pub covariance: Matrix2<f64>,
    /// 是否已用第一帧加速度计倾角初始化
    pub seeded: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            angle: 0.0,
            bias: 0.0,
            covariance: Matrix2::zeros(),
            seeded: false,
        }
    }
}

/// 由加速度计计算原始倾角（度）
pub fn accel_tilt(sample: &OrientationSample, offset_deg: f64) -> f64 {
    sample.accel_y.atan2(sample.accel_z).to_degrees() + offset_deg
}

/// 倾角估计器
#[derive(Debug, Clone, PartialEq)]
pub struct TiltEstimator {
    config: EstimatorConfig,
    state: FilterState,
}

impl TiltEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            state: FilterState::default(),
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// 最近一次的倾角估计（度）
    pub fn angle(&self) -> f64 {
        self.state.angle
    }

    /// 融合一帧采样，返回滤波后的倾角（度）
    ///
    /// 第一帧直接以加速度计倾角作为初值，之后按卡尔曼递推。
    pub fn update(&mut self, sample: &OrientationSample, dt: f64) -> f64 {
        let measured = accel_tilt(sample, self.config.tilt_offset_deg);
        let rate = sample.gyro_rate / self.config.gyro_sensitivity;
        let s = &mut self.state;

        if !s.seeded {
            s.angle = measured;
            s.seeded = true;
        }

        // 1. 预测
        s.angle += dt * (rate - s.bias);
        let f = Matrix2::new(1.0, -dt, 0.0, 1.0);
        let q = Matrix2::new(self.config.q_angle * dt, 0.0, 0.0, self.config.q_bias * dt);
        s.covariance = f * s.covariance * f.transpose() + q;

        // 2. 新息与增益
        let innovation = measured - s.angle;
        let h = RowVector2::new(1.0, 0.0);
        let s_cov = s.covariance[(0, 0)] + self.config.r_measure;
        let gain: Vector2<f64> = s.covariance * h.transpose() / s_cov;

        // 3. 修正
        s.angle += gain[0] * innovation;
        s.bias += gain[1] * innovation;
        s.covariance = (Matrix2::identity() - gain * h) * s.covariance;

        s.angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_at(tilt_deg: f64, rate_dps: f64) -> OrientationSample {
        let theta = (tilt_deg - 180.0).to_radians();
        OrientationSample::new([0.0, theta.sin(), theta.cos()], rate_dps * 131.0)
    }

    #[test]
    fn test_accel_tilt_upright_is_180() {
        let sample = OrientationSample::new([0.0, 0.0, 16384.0], 0.0);
        assert_eq!(accel_tilt(&sample, 180.0), 180.0);
    }

    #[test]
    fn test_accel_tilt_follows_y_component() {
        let tilt = accel_tilt(&sample_at(200.0, 0.0), 180.0);
        assert!((tilt - 200.0).abs() < 1e-9);
        let tilt = accel_tilt(&sample_at(150.0, 0.0), 180.0);
        assert!((tilt - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_first_sample_seeds_angle() {
        let mut est = TiltEstimator::new(EstimatorConfig::default());
        let angle = est.update(&sample_at(180.0, 0.0), 0.01);
        assert_eq!(angle, 180.0);
        assert!(est.state().seeded);
        assert_eq!(est.state().bias, 0.0);
    }

    #[test]
    fn test_gyro_rate_drives_prediction() {
        let mut est = TiltEstimator::new(EstimatorConfig::default());
        // 10°/s，10ms 后预测 +0.1°，加速度计几乎不拉回（初始协方差为 0）
        let angle = est.update(&sample_at(180.0, 10.0), 0.01);
        assert!(angle > 180.09 && angle < 180.1, "angle = {}", angle);
    }

    #[test]
    fn test_converges_and_learns_gyro_bias() {
        let mut est = TiltEstimator::new(EstimatorConfig::default());
        // 真实倾角 185° 静止，陀螺仪带 2°/s 零偏
        let sample = sample_at(185.0, 2.0);
        for _ in 0..2000 {
            est.update(&sample, 0.01);
        }
        assert!((est.angle() - 185.0).abs() < 1e-3, "angle = {}", est.angle());
        assert!((est.state().bias - 2.0).abs() < 1e-3, "bias = {}", est.state().bias);
    }

    #[test]
    fn test_covariance_stays_symmetric_positive() {
        let mut est = TiltEstimator::new(EstimatorConfig::default());
        for i in 0..500 {
            let tilt = 180.0 + (i as f64 * 0.05).sin() * 5.0;
            est.update(&sample_at(tilt, 0.0), 0.01);
        }
        let p = est.state().covariance;
        assert!(p[(0, 0)] > 0.0 && p[(1, 1)] > 0.0);
        assert!((p[(0, 1)] - p[(1, 0)]).abs() < 1e-12);
    }
}
