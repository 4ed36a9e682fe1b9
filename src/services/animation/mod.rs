//! Физика прокрутки: ускорение, кривая замедления и анимация осей.

pub mod acceleration;
pub mod axis_animator;
pub mod axis_motion;
pub mod easing;

pub use acceleration::AccelerationState;
pub use axis_animator::{AxisAnimator, PushOutcome, LOCK_BUDGET, TICK_INTERVAL};
pub use axis_motion::{AxisMotion, Phase, StartOutcome, Tick};
