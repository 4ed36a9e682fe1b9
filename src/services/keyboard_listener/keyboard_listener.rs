use crate::config::Config;
use crate::error::{Result, ScrollError};
use crate::events::{KeyCode, KeyEvent, KeyState};
use crate::services::EngineContext;
use crate::utils::DeviceFinder;
use evdev::{Device, EventType, InputEvent};
use std::sync::Arc;
use tracing::{debug, info};

use super::modifier_state::ModifierState;
use super::r#trait::KeyboardListenerTrait;

pub struct RealKeyboardListener {
    context: Arc<EngineContext>,
    device: Device,
    modifier_state: ModifierState,
}

impl RealKeyboardListener {
    pub fn new(config: &Config, context: Arc<EngineContext>) -> Result<Self> {
        info!("Инициализация RealKeyboardListener");

        let device_path = DeviceFinder::find_keyboard_device(&config.input.keyboard_device_path)?;

        let device = Device::open(&device_path).map_err(|e| {
            ScrollError::DeviceNotFound(format!(
                "Не удалось открыть устройство {:?}: {}",
                device_path, e
            ))
        })?;

        info!(
            "Клавиатура: {} ({:?}), без эксклюзивного захвата",
            device.name().unwrap_or("Unknown"),
            device_path
        );

        Ok(Self {
            context,
            device,
            modifier_state: ModifierState::new(),
        })
    }

    async fn run_impl(self) -> Result<()> {
        let Self {
            context,
            device,
            mut modifier_state,
        } = self;

        match context.config().toggle_hotkey() {
            Some(hotkey) => info!("Горячая клавиша переключения: {}", hotkey),
            None => info!("Горячая клавиша переключения не задана"),
        }

        let mut stream = device.into_event_stream()?;
        info!("RealKeyboardListener запущен, начинаем чтение событий");

        loop {
            let event = stream.next_event().await.map_err(|e| {
                ScrollError::ServiceUnavailable(format!("Ошибка чтения клавиатуры: {}", e))
            })?;
            handle_event(&context, &mut modifier_state, event);
        }
    }
}

/// Обработка одного события клавиатуры; Some(новое состояние) при переключении движка
pub(super) fn handle_event(
    context: &EngineContext,
    modifier_state: &mut ModifierState,
    event: InputEvent,
) -> Option<bool> {
    if event.event_type() != EventType::KEY {
        return None;
    }

    let Some(state) = KeyState::from_value(event.value()) else {
        debug!("Неизвестное значение события: {}", event.value());
        return None;
    };

    let key = evdev::KeyCode::new(event.code());
    if modifier_state.update_key(key, state != KeyState::Released) {
        context.set_modifiers(modifier_state.to_modifiers());
        crate::trace_if_enabled!("Модификаторы: {}", modifier_state.to_modifiers());
        return None;
    }

    let hotkey = context.config().toggle_hotkey()?;
    let key_event = KeyEvent::new(KeyCode(event.code()), state, modifier_state.to_modifiers());
    if !hotkey.matches(&key_event) {
        return None;
    }

    let enabled = context.toggle();
    info!(
        "Плавная прокрутка {} ({})",
        if enabled { "включена" } else { "выключена" },
        hotkey
    );
    Some(enabled)
}

#[async_trait::async_trait]
impl KeyboardListenerTrait for RealKeyboardListener {
    async fn run(self: Box<Self>) -> Result<()> {
        (*self).run_impl().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: evdev::KeyCode, value: i32) -> InputEvent {
        InputEvent::new(EventType::KEY.0, code.code(), value)
    }

    #[test]
    fn hotkey_toggles_on_press_only() {
        let context = EngineContext::default();
        let mut state = ModifierState::new();
        assert!(context.is_enabled());

        handle_event(&context, &mut state, key(evdev::KeyCode::KEY_LEFTCTRL, 1));
        handle_event(&context, &mut state, key(evdev::KeyCode::KEY_RIGHTALT, 1));
        assert_eq!(
            handle_event(&context, &mut state, key(evdev::KeyCode::KEY_S, 1)),
            Some(false)
        );
        // Автоповтор не переключает повторно
        assert_eq!(handle_event(&context, &mut state, key(evdev::KeyCode::KEY_S, 2)), None);
        assert_eq!(handle_event(&context, &mut state, key(evdev::KeyCode::KEY_S, 0)), None);
        assert!(!context.is_enabled());

        assert_eq!(
            handle_event(&context, &mut state, key(evdev::KeyCode::KEY_S, 1)),
            Some(true)
        );
    }

    #[test]
    fn extra_modifier_prevents_toggle() {
        let context = EngineContext::default();
        let mut state = ModifierState::new();

        for code in [
            evdev::KeyCode::KEY_LEFTCTRL,
            evdev::KeyCode::KEY_LEFTALT,
            evdev::KeyCode::KEY_LEFTSHIFT,
        ] {
            handle_event(&context, &mut state, key(code, 1));
        }
        assert_eq!(handle_event(&context, &mut state, key(evdev::KeyCode::KEY_S, 1)), None);
        assert!(context.is_enabled());
    }

    #[test]
    fn modifiers_are_published_to_context() {
        let context = EngineContext::default();
        let mut state = ModifierState::new();

        handle_event(&context, &mut state, key(evdev::KeyCode::KEY_RIGHTSHIFT, 1));
        assert!(context.modifiers().shift);
        handle_event(&context, &mut state, key(evdev::KeyCode::KEY_RIGHTSHIFT, 0));
        assert!(context.modifiers().is_empty());
    }
}
