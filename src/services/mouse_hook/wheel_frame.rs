use crate::events::{Axis, HookDecision, ScrollEvent, WheelInput};
use crate::services::virtual_device::HI_RES_PER_NOTCH;
use evdev::{EventType, InputEvent, RelativeAxisCode};
use smallvec::SmallVec;
use std::time::Instant;

pub type EventBatch = SmallVec<[InputEvent; 8]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WheelUnit {
    Notch,
    HiRes,
}

fn wheel_code(code: u16) -> Option<(Axis, WheelUnit)> {
    match code {
        c if c == RelativeAxisCode::REL_WHEEL.0 => Some((Axis::Vertical, WheelUnit::Notch)),
        c if c == RelativeAxisCode::REL_WHEEL_HI_RES.0 => Some((Axis::Vertical, WheelUnit::HiRes)),
        c if c == RelativeAxisCode::REL_HWHEEL.0 => Some((Axis::Horizontal, WheelUnit::Notch)),
        c if c == RelativeAxisCode::REL_HWHEEL_HI_RES.0 => Some((Axis::Horizontal, WheelUnit::HiRes)),
        _ => None,
    }
}

fn wheel_events(axis: Axis, notches: i32) -> [InputEvent; 2] {
    let (hi_res, low_res) = match axis {
        Axis::Vertical => (RelativeAxisCode::REL_WHEEL_HI_RES, RelativeAxisCode::REL_WHEEL),
        Axis::Horizontal => (RelativeAxisCode::REL_HWHEEL_HI_RES, RelativeAxisCode::REL_HWHEEL),
    };
    [
        InputEvent::new(EventType::RELATIVE.0, hi_res.0, notches * HI_RES_PER_NOTCH),
        InputEvent::new(EventType::RELATIVE.0, low_res.0, notches),
    ]
}

#[derive(Default)]
struct AxisFrame {
    notches: i32,
    hi_res: i32,
    events: SmallVec<[InputEvent; 2]>,
}

/// Разбор кадра событий мыши (до SYN_REPORT) на проброс и щелчки колеса.
///
/// Обычная мышь присылает в кадре и щелчок, и его hi-res дубль - такой кадр
/// диспетчеризуется по щелчку. Мыши с мелким шагом присылают только hi-res
/// доли: они копятся до целого щелчка.
pub struct WheelFrameDecoder {
    hi_res_residual: [i32; 2],
    synthetic: bool,
}

impl WheelFrameDecoder {
    /// `synthetic` - устройство является собственным выводом движка
    pub fn new(synthetic: bool) -> Self {
        Self {
            hi_res_residual: [0; 2],
            synthetic,
        }
    }

    /// Возвращает события для проброса через виртуальную мышь
    pub fn decode<D, B>(&mut self, frame: &[InputEvent], mut dispatch: D, bypass: B) -> EventBatch
    where
        D: FnMut(WheelInput) -> HookDecision,
        B: Fn() -> bool,
    {
        let mut forward = EventBatch::new();
        let mut wheel: [AxisFrame; 2] = Default::default();

        for event in frame {
            let kind = event.event_type();
            if kind == EventType::SYNCHRONIZATION {
                continue;
            }
            if kind == EventType::RELATIVE {
                if let Some((axis, unit)) = wheel_code(event.code()) {
                    let axis_frame = &mut wheel[axis.index()];
                    match unit {
                        WheelUnit::Notch => axis_frame.notches += event.value(),
                        WheelUnit::HiRes => axis_frame.hi_res += event.value(),
                    }
                    axis_frame.events.push(*event);
                    continue;
                }
            }
            forward.push(*event);
        }

        for axis in Axis::ALL {
            let axis_frame = &wheel[axis.index()];
            let residual = &mut self.hi_res_residual[axis.index()];

            let (notches, original) = if axis_frame.notches != 0 {
                *residual = 0;
                (axis_frame.notches, axis_frame.events.clone())
            } else if axis_frame.hi_res != 0 {
                if bypass() {
                    *residual = 0;
                    forward.extend(axis_frame.events.iter().copied());
                    continue;
                }
                *residual += axis_frame.hi_res;
                let notches = *residual / HI_RES_PER_NOTCH;
                if notches == 0 {
                    continue;
                }
                *residual -= notches * HI_RES_PER_NOTCH;
                (notches, SmallVec::from(wheel_events(axis, notches)))
            } else {
                continue;
            };

            let event = ScrollEvent::at(axis, notches, Instant::now());
            let input = if self.synthetic {
                WheelInput::Synthetic(event)
            } else {
                WheelInput::Genuine(event)
            };

            if dispatch(input) == HookDecision::Forward {
                forward.extend(original);
            }
        }

        forward
    }
}
