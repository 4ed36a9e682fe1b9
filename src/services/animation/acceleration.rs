use crate::config::AccelerationParams;
use std::time::{Duration, Instant};

/// Окно затухания: после такой паузы ускорение сбрасывается полностью
pub const DECAY_WINDOW: Duration = Duration::from_millis(300);

/// Максимальный прирост множителя за одно событие (при нулевом интервале)
const GROWTH_STEP: f64 = 0.8;

/// Состояние ускорения одной оси
#[derive(Debug, Clone, PartialEq)]
pub struct AccelerationState {
    last_event_time: Option<Instant>,
    multiplier: f64,
    last_direction: i8,
}

impl Default for AccelerationState {
    fn default() -> Self {
        Self {
            last_event_time: None,
            multiplier: 1.0,
            last_direction: 0,
        }
    }
}

impl AccelerationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Множитель скорости для очередного щелчка.
    ///
    /// Быстрые щелчки в одном направлении плавно разгоняют прокрутку, пауза
    /// длиннее порога линейно возвращает множитель к 1.0, а смена
    /// направления сбрасывает его сразу.
    pub fn compute_multiplier(
        &mut self,
        event_time: Instant,
        direction: i8,
        params: &AccelerationParams,
    ) -> f64 {
        let max = params.max.max(1.0);

        let next = match self.last_event_time {
            None => 1.0,
            Some(_) if self.last_direction != 0 && direction != self.last_direction => 1.0,
            Some(last) => {
                let gap = event_time.saturating_duration_since(last);
                Self::next_multiplier(self.multiplier, gap, params.threshold)
            }
        };

        self.multiplier = next.clamp(1.0, max);
        self.last_event_time = Some(event_time);
        self.last_direction = direction;
        self.multiplier
    }

    fn next_multiplier(current: f64, gap: Duration, threshold: Duration) -> f64 {
        if gap > DECAY_WINDOW {
            return 1.0;
        }

        if gap <= threshold {
            let ratio = if threshold.is_zero() {
                1.0
            } else {
                gap.as_secs_f64() / threshold.as_secs_f64()
            };
            return current + GROWTH_STEP * (1.0 - ratio);
        }

        // threshold < gap <= DECAY_WINDOW, значит threshold < DECAY_WINDOW
        let span = (DECAY_WINDOW - threshold).as_secs_f64();
        let elapsed = (gap - threshold).as_secs_f64();
        1.0 + (current - 1.0) * (1.0 - elapsed / span)
    }
}
