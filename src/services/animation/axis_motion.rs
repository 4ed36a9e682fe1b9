use super::easing::progress_curve;
use crate::config::AnimationParams;
use crate::events::direction_of;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
}

/// Как новый шаг повлиял на движение оси
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Ось простаивала - нужен новый рабочий поток
    Started,
    /// Продолжение в том же направлении
    Extended,
    /// Смена направления: старая цель отброшена
    Superseded,
}

/// Результат одного такта анимации
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Целое смещение для вывода (0 - выводить нечего)
    pub delta: i32,
    pub finished: bool,
}

/// Чистая модель движения одной оси.
///
/// Время передаётся явно, поэтому модель детерминирована и тестируется без
/// потоков. Позиции измеряются в hi-res единицах (120 = один щелчок).
#[derive(Debug, Clone)]
pub struct AxisMotion {
    phase: Phase,
    /// Интерполированная позиция на последнем такте
    current_position: f64,
    target_position: f64,
    start_position: f64,
    start_time: Instant,
    duration: Duration,
    direction: i8,
    /// Дробный остаток, ещё не выведенный целыми единицами
    sub_pixel: f64,
    params: Option<AnimationParams>,
    generation: u64,
}

impl Default for AxisMotion {
    fn default() -> Self {
        Self::new()
    }
}

impl AxisMotion {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            current_position: 0.0,
            target_position: 0.0,
            start_position: 0.0,
            start_time: Instant::now(),
            duration: Duration::ZERO,
            direction: 0,
            sub_pixel: 0.0,
            params: None,
            generation: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Номер запуска; меняется при каждом старте и отмене
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn direction(&self) -> i8 {
        self.direction
    }

    pub fn target_position(&self) -> f64 {
        self.target_position
    }

    pub fn sub_pixel(&self) -> f64 {
        self.sub_pixel
    }

    /// Добавить шаг к движению оси
    pub fn start(&mut self, increment: f64, now: Instant, params: AnimationParams) -> StartOutcome {
        let direction = direction_of(increment);
        let duration = params.effective_duration();

        let outcome = match self.phase {
            Phase::Idle => {
                self.start_position = self.current_position;
                self.target_position = self.current_position + increment;
                self.direction = direction;
                self.generation = self.generation.wrapping_add(1);
                self.phase = Phase::Running;
                StartOutcome::Started
            }
            Phase::Running if direction == self.direction || direction == 0 => {
                // Кривая перестраивается от текущей точки, без скачка позиции
                self.start_position = self.position_at(now);
                self.target_position += increment;
                StartOutcome::Extended
            }
            Phase::Running => {
                let position = self.position_at(now);
                self.start_position = position;
                self.target_position = position + increment;
                self.direction = direction;
                StartOutcome::Superseded
            }
        };

        self.start_time = now;
        self.duration = duration;
        self.params = Some(params);
        outcome
    }

    fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start_time);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Интерполированная позиция в момент `now`
    pub fn position_at(&self, now: Instant) -> f64 {
        match (self.phase, self.params.as_ref()) {
            (Phase::Running, Some(params)) => {
                let eased = progress_curve(self.progress(now), params);
                self.start_position + (self.target_position - self.start_position) * eased
            }
            _ => self.current_position,
        }
    }

    /// Один такт: целая часть пройденного пути уходит на вывод, дробная копится
    pub fn tick(&mut self, now: Instant) -> Tick {
        if self.phase == Phase::Idle {
            return Tick {
                delta: 0,
                finished: true,
            };
        }

        let position = self.position_at(now);
        let raw = position - self.current_position + self.sub_pixel;

        if self.progress(now) >= 1.0 {
            // Остаток округляется от нуля, дальше ось начинает с чистого листа
            let delta = raw.round() as i32;
            self.reset_to_idle();
            return Tick {
                delta,
                finished: true,
            };
        }

        let whole = raw.trunc();
        self.sub_pixel = raw - whole;
        self.current_position = position;

        Tick {
            delta: whole as i32,
            finished: false,
        }
    }

    /// Немедленная остановка без досылки остатка
    pub fn cancel(&mut self) {
        self.reset_to_idle();
        self.generation = self.generation.wrapping_add(1);
    }

    fn reset_to_idle(&mut self) {
        self.phase = Phase::Idle;
        self.current_position = 0.0;
        self.target_position = 0.0;
        self.start_position = 0.0;
        self.direction = 0;
        self.sub_pixel = 0.0;
    }
}
