use crate::events::Modifiers;
use evdev::KeyCode;

const LEFT_CTRL: u8 = 1 << 0;
const RIGHT_CTRL: u8 = 1 << 1;
const LEFT_ALT: u8 = 1 << 2;
const RIGHT_ALT: u8 = 1 << 3;
const LEFT_SHIFT: u8 = 1 << 4;
const RIGHT_SHIFT: u8 = 1 << 5;
const LEFT_META: u8 = 1 << 6;
const RIGHT_META: u8 = 1 << 7;

/// Зажатые клавиши-модификаторы с раздельным учётом левых и правых
#[derive(Debug, Default)]
pub struct ModifierState {
    pressed: u8,
}

impl ModifierState {
    pub fn new() -> Self {
        Self::default()
    }

    fn bit(key: KeyCode) -> Option<u8> {
        match key {
            KeyCode::KEY_LEFTCTRL => Some(LEFT_CTRL),
            KeyCode::KEY_RIGHTCTRL => Some(RIGHT_CTRL),
            KeyCode::KEY_LEFTALT => Some(LEFT_ALT),
            KeyCode::KEY_RIGHTALT => Some(RIGHT_ALT),
            KeyCode::KEY_LEFTSHIFT => Some(LEFT_SHIFT),
            KeyCode::KEY_RIGHTSHIFT => Some(RIGHT_SHIFT),
            KeyCode::KEY_LEFTMETA => Some(LEFT_META),
            KeyCode::KEY_RIGHTMETA => Some(RIGHT_META),
            _ => None,
        }
    }

    pub fn is_modifier(key: KeyCode) -> bool {
        Self::bit(key).is_some()
    }

    /// Обновить состояние; true - набор модификаторов изменился
    pub fn update_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        let Some(bit) = Self::bit(key) else {
            return false;
        };
        let before = self.pressed;
        if pressed {
            self.pressed |= bit;
        } else {
            self.pressed &= !bit;
        }
        before != self.pressed
    }

    pub fn to_modifiers(&self) -> Modifiers {
        Modifiers {
            ctrl: self.pressed & (LEFT_CTRL | RIGHT_CTRL) != 0,
            alt: self.pressed & (LEFT_ALT | RIGHT_ALT) != 0,
            shift: self.pressed & (LEFT_SHIFT | RIGHT_SHIFT) != 0,
            super_key: self.pressed & (LEFT_META | RIGHT_META) != 0,
        }
    }
}
