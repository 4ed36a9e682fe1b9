use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Ось прокрутки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Vertical,
    Horizontal,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::Vertical, Axis::Horizontal];

    /// Индекс оси в массивах состояний движка
    pub fn index(self) -> usize {
        match self {
            Axis::Vertical => 0,
            Axis::Horizontal => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::Vertical => "vertical",
            Axis::Horizontal => "horizontal",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Одно "сырое" событие колеса, полученное от ОС
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollEvent {
    pub axis: Axis,
    /// Количество щелчков колеса со знаком
    pub raw_delta: i32,
    pub timestamp: Instant,
}

impl ScrollEvent {
    pub fn new(axis: Axis, raw_delta: i32) -> Self {
        Self {
            axis,
            raw_delta,
            timestamp: Instant::now(),
        }
    }

    pub fn at(axis: Axis, raw_delta: i32, timestamp: Instant) -> Self {
        Self {
            axis,
            raw_delta,
            timestamp,
        }
    }
}

impl fmt::Display for ScrollEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:+}", self.axis, self.raw_delta)
    }
}

/// Событие колеса на границе перехвата.
///
/// Собственный вывод движка помечается явно, чтобы диспетчер никогда не
/// обрабатывал его повторно.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelInput {
    Genuine(ScrollEvent),
    Synthetic(ScrollEvent),
}

impl WheelInput {
    pub fn event(&self) -> &ScrollEvent {
        match self {
            WheelInput::Genuine(event) | WheelInput::Synthetic(event) => event,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, WheelInput::Synthetic(_))
    }
}

/// Решение диспетчера по исходному событию
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookDecision {
    /// Пробросить событие без изменений
    Forward,
    /// Поглотить событие, движение синтезирует аниматор
    Suppress,
}

/// Знак движения: -1, 0 или +1
pub fn direction_of(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}
