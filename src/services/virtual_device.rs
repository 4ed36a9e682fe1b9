use crate::error::{Result, ScrollError};
use crate::events::Axis;
use evdev::uinput::VirtualDevice;
use evdev::{AttributeSet, EventType, InputEvent, KeyCode, RelativeAxisCode};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::time::Duration;
use tracing::{error, info};

/// Hi-res единиц в одном щелчке колеса
pub const HI_RES_PER_NOTCH: i32 = 120;

/// Сколько поток перехвата ждёт устройство ради проброса кадра
pub const FORWARD_LOCK_BUDGET: Duration = Duration::from_millis(2);

/// Получатель синтезированной прокрутки
pub trait ScrollSink: Send + Sync {
    /// Вывести смещение `delta` в hi-res единицах по оси `axis`
    fn emit(&self, axis: Axis, delta: i32) -> Result<()>;

    /// Вывод с ограниченным ожиданием устройства; `Ok(false)` - устройство
    /// занято дольше `budget`, ничего не выведено
    fn try_emit(&self, axis: Axis, delta: i32, _budget: Duration) -> Result<bool> {
        self.emit(axis, delta).map(|()| true)
    }
}

const MOUSE_BUTTONS: [KeyCode; 8] = [
    KeyCode::BTN_LEFT,
    KeyCode::BTN_RIGHT,
    KeyCode::BTN_MIDDLE,
    KeyCode::BTN_SIDE,
    KeyCode::BTN_EXTRA,
    KeyCode::BTN_FORWARD,
    KeyCode::BTN_BACK,
    KeyCode::BTN_TASK,
];

const MOUSE_AXES: [RelativeAxisCode; 6] = [
    RelativeAxisCode::REL_X,
    RelativeAxisCode::REL_Y,
    RelativeAxisCode::REL_WHEEL,
    RelativeAxisCode::REL_HWHEEL,
    RelativeAxisCode::REL_WHEEL_HI_RES,
    RelativeAxisCode::REL_HWHEEL_HI_RES,
];

struct MouseState {
    device: Option<VirtualDevice>,
    /// Hi-res остаток по осям, ещё не выданный щелчками низкого разрешения
    low_res_residual: [i32; 2],
}

/// Виртуальная мышь uinput: проброс событий захваченной мыши и вывод
/// синтезированной прокрутки.
pub struct VirtualMouse {
    state: Mutex<MouseState>,
    device_name: String,
    dry_run: bool,
}

impl VirtualMouse {
    pub fn new(device_name: &str, dry_run: bool) -> Result<Self> {
        info!("Инициализация VirtualMouse '{}' (dry_run: {})", device_name, dry_run);

        let device = if dry_run {
            None
        } else {
            Some(Self::create_virtual_device(device_name)?)
        };

        Ok(Self {
            state: Mutex::new(MouseState {
                device,
                low_res_residual: [0; 2],
            }),
            device_name: device_name.to_string(),
            dry_run,
        })
    }

    fn create_virtual_device(device_name: &str) -> Result<VirtualDevice> {
        info!("Создание виртуального устройства uinput '{}'", device_name);

        let mut keys = AttributeSet::<KeyCode>::new();
        for button in MOUSE_BUTTONS {
            keys.insert(button);
        }

        let mut axes = AttributeSet::<RelativeAxisCode>::new();
        for axis in MOUSE_AXES {
            axes.insert(axis);
        }

        let device = VirtualDevice::builder()
            .and_then(|builder| builder.name(device_name).with_keys(&keys))
            .and_then(|builder| builder.with_relative_axes(&axes))
            .and_then(|builder| builder.build())
            .map_err(|e| {
                ScrollError::Internal(format!(
                    "Не удалось создать виртуальное устройство '{}': {}",
                    device_name, e
                ))
            })?;

        info!("Виртуальное устройство '{}' создано успешно", device_name);
        Ok(device)
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Пробросить кадр событий физической мыши без изменений.
    ///
    /// SYN_REPORT отбрасывается: uinput добавляет его сам после пакета.
    pub fn forward(&self, events: &[InputEvent]) -> Result<()> {
        let batch: SmallVec<[InputEvent; 8]> = events
            .iter()
            .filter(|event| {
                let kind = event.event_type();
                kind == EventType::KEY || kind == EventType::RELATIVE
            })
            .copied()
            .collect();

        if batch.is_empty() {
            return Ok(());
        }

        let Some(mut state) = self.state.try_lock_for(FORWARD_LOCK_BUDGET) else {
            return Err(ScrollError::ServiceUnavailable(format!(
                "Виртуальное устройство занято дольше {:?}",
                FORWARD_LOCK_BUDGET
            )));
        };

        if self.dry_run {
            crate::trace_if_enabled!("[DRY RUN] Проброс {} событий", batch.len());
            return Ok(());
        }

        match state.device.as_mut() {
            Some(device) => device.emit(&batch).map_err(ScrollError::Io),
            None => Err(ScrollError::ServiceUnavailable(
                "Виртуальное устройство недоступно".to_string(),
            )),
        }
    }
}

/// Сколько щелчков низкого разрешения выдать после добавления `delta`
fn take_low_res_notches(residual: &mut i32, delta: i32) -> i32 {
    *residual = residual.saturating_add(delta);
    let notches = *residual / HI_RES_PER_NOTCH;
    *residual -= notches * HI_RES_PER_NOTCH;
    notches
}

fn axis_codes(axis: Axis) -> (RelativeAxisCode, RelativeAxisCode) {
    match axis {
        Axis::Vertical => (RelativeAxisCode::REL_WHEEL_HI_RES, RelativeAxisCode::REL_WHEEL),
        Axis::Horizontal => (RelativeAxisCode::REL_HWHEEL_HI_RES, RelativeAxisCode::REL_HWHEEL),
    }
}

impl VirtualMouse {
    fn emit_locked(&self, state: &mut MouseState, axis: Axis, delta: i32) -> Result<()> {
        let notches = take_low_res_notches(&mut state.low_res_residual[axis.index()], delta);

        if self.dry_run {
            crate::debug_if_enabled!(
                "[DRY RUN] Прокрутка {}: {:+} hi-res ({:+} щелчков)",
                axis,
                delta,
                notches
            );
            return Ok(());
        }

        let (hi_res, low_res) = axis_codes(axis);
        let mut batch: SmallVec<[InputEvent; 2]> = SmallVec::new();
        batch.push(InputEvent::new(EventType::RELATIVE.0, hi_res.0, delta));
        if notches != 0 {
            batch.push(InputEvent::new(EventType::RELATIVE.0, low_res.0, notches));
        }

        match state.device.as_mut() {
            Some(device) => device.emit(&batch).map_err(|e| {
                error!("Не удалось вывести прокрутку {}: {}", axis, e);
                ScrollError::Io(e)
            }),
            None => Err(ScrollError::ServiceUnavailable(
                "Виртуальное устройство недоступно".to_string(),
            )),
        }
    }
}

impl ScrollSink for VirtualMouse {
    fn emit(&self, axis: Axis, delta: i32) -> Result<()> {
        if delta == 0 {
            return Ok(());
        }
        let mut state = self.state.lock();
        self.emit_locked(&mut state, axis, delta)
    }

    fn try_emit(&self, axis: Axis, delta: i32, budget: Duration) -> Result<bool> {
        if delta == 0 {
            return Ok(true);
        }
        let Some(mut state) = self.state.try_lock_for(budget) else {
            return Ok(false);
        };
        self.emit_locked(&mut state, axis, delta).map(|()| true)
    }
}

impl Drop for VirtualMouse {
    fn drop(&mut self) {
        if !self.dry_run {
            info!("Закрытие виртуального устройства '{}'", self.device_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_res_notches_follow_accumulated_distance() {
        let mut residual = 0;
        assert_eq!(take_low_res_notches(&mut residual, 100), 0);
        assert_eq!(take_low_res_notches(&mut residual, 30), 1);
        assert_eq!(residual, 10);
        assert_eq!(take_low_res_notches(&mut residual, 250), 2);
        assert_eq!(residual, 20);
    }

    #[test]
    fn low_res_notches_handle_negative_direction() {
        let mut residual = 0;
        assert_eq!(take_low_res_notches(&mut residual, -119), 0);
        assert_eq!(take_low_res_notches(&mut residual, -1), -1);
        assert_eq!(residual, 0);
        // Разворот гасит накопленный остаток
        take_low_res_notches(&mut residual, 60);
        assert_eq!(take_low_res_notches(&mut residual, -60), 0);
        assert_eq!(residual, 0);
    }

    #[test]
    fn dry_run_sink_accepts_scroll() {
        let mouse = VirtualMouse::new("test mouse", true).unwrap();
        assert!(mouse.is_dry_run());
        assert!(mouse.emit(Axis::Vertical, 42).is_ok());
        assert!(mouse.emit(Axis::Horizontal, 0).is_ok());
        assert!(mouse.forward(&[]).is_ok());
    }

    #[test]
    fn bounded_output_gives_up_on_held_device() {
        let mouse = VirtualMouse::new("test mouse", true).unwrap();
        let frame = [InputEvent::new(EventType::KEY.0, KeyCode::BTN_LEFT.0, 1)];

        let held = mouse.state.lock();
        let started = std::time::Instant::now();
        assert!(!mouse
            .try_emit(Axis::Vertical, 120, Duration::from_millis(1))
            .unwrap());
        assert!(matches!(
            mouse.forward(&frame),
            Err(ScrollError::ServiceUnavailable(_))
        ));
        assert!(started.elapsed() < Duration::from_secs(1));
        drop(held);

        assert!(mouse
            .try_emit(Axis::Vertical, 120, Duration::from_millis(1))
            .unwrap());
        assert!(mouse.forward(&frame).is_ok());
        // Щелчок выдан только один раз
        assert_eq!(mouse.state.lock().low_res_residual[Axis::Vertical.index()], 0);
    }
}
