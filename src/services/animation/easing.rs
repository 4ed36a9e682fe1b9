//! Кривая замедления анимации прокрутки.
//!
//! Экспоненциальный ease-out, форма которого задаётся отношением хвоста к
//! разгону: чем длиннее хвост, тем мягче кривая.

use crate::config::AnimationParams;

/// Нижняя граница крутизны - при меньших значениях кривая вырождается в линейную
const MIN_STEEPNESS: f64 = 0.001;

/// Крутизна кривой: k = 24 / (r + 1)
#[inline]
pub fn steepness(tail_head_ratio: f64) -> f64 {
    (24.0 / (tail_head_ratio.max(0.0) + 1.0)).max(MIN_STEEPNESS)
}

/// Нормированный ease-out: f(t) = (1 - e^(-k·t)) / (1 - e^(-k))
#[inline]
pub fn ease_out(t: f64, k: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t >= 1.0 {
        return 1.0;
    }
    -(-k * t).exp_m1() / -(-k).exp_m1()
}

/// Доля пройденного пути для прогресса `t` ∈ [0, 1]
#[inline]
pub fn progress_curve(t: f64, params: &AnimationParams) -> f64 {
    if params.easing {
        ease_out(t, steepness(params.tail_head_ratio))
    } else {
        t.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn params(easing: bool, ratio: f64) -> AnimationParams {
        AnimationParams {
            duration: Duration::from_millis(400),
            tail_head_ratio: ratio,
            easing,
        }
    }

    #[test]
    fn test_easing_boundaries() {
        for ratio in [0.0, 1.0, 4.0, 20.0] {
            let p = params(true, ratio);
            assert!(progress_curve(0.0, &p).abs() < 1e-9, "ratio {}", ratio);
            assert!((progress_curve(1.0, &p) - 1.0).abs() < 1e-9, "ratio {}", ratio);
        }
    }

    #[test]
    fn test_easing_monotonic_and_front_loaded() {
        let p = params(true, 4.0);
        let mut prev = 0.0;
        for i in 0..=100 {
            let t = i as f64 / 100.0;
            let v = progress_curve(t, &p);
            assert!(v >= prev, "not monotonic at t={}", t);
            prev = v;
        }
        // ease-out: к середине пройдено больше половины
        assert!(progress_curve(0.5, &p) > 0.5);
    }

    #[test]
    fn test_linear_when_easing_disabled() {
        let p = params(false, 4.0);
        assert_eq!(progress_curve(0.25, &p), 0.25);
        assert_eq!(progress_curve(2.0, &p), 1.0);
    }

    #[test]
    fn test_steepness_floor() {
        assert_eq!(steepness(0.0), 24.0);
        assert_eq!(steepness(4.0), 4.8);
        assert!(steepness(f64::MAX) >= MIN_STEEPNESS);
    }
}
