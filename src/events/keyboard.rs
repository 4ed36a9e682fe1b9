use serde::{Deserialize, Serialize};
use std::fmt;

/// Состояние клавиши
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyState {
    Pressed,
    Released,
    Repeat,
}

impl KeyState {
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(KeyState::Released),
            1 => Some(KeyState::Pressed),
            2 => Some(KeyState::Repeat),
            _ => None,
        }
    }
}

/// Код клавиши (evdev коды)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KEY_{}", self.0)
    }
}

/// Модификаторы клавиш
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub super_key: bool,
}

const CTRL_BIT: u8 = 0b0001;
const ALT_BIT: u8 = 0b0010;
const SHIFT_BIT: u8 = 0b0100;
const SUPER_BIT: u8 = 0b1000;

impl Modifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ctrl(mut self, ctrl: bool) -> Self {
        self.ctrl = ctrl;
        self
    }

    pub fn with_alt(mut self, alt: bool) -> Self {
        self.alt = alt;
        self
    }

    pub fn with_shift(mut self, shift: bool) -> Self {
        self.shift = shift;
        self
    }

    pub fn with_super(mut self, super_key: bool) -> Self {
        self.super_key = super_key;
        self
    }

    pub fn is_empty(&self) -> bool {
        !self.ctrl && !self.alt && !self.shift && !self.super_key
    }

    /// Все модификаторы из `required` зажаты (пустой набор ничего не требует)
    pub fn contains(&self, required: Modifiers) -> bool {
        !required.is_empty() && self.to_bits() & required.to_bits() == required.to_bits()
    }

    /// Упаковка в биты для хранения в атомике
    pub fn to_bits(&self) -> u8 {
        let mut bits = 0;
        if self.ctrl { bits |= CTRL_BIT; }
        if self.alt { bits |= ALT_BIT; }
        if self.shift { bits |= SHIFT_BIT; }
        if self.super_key { bits |= SUPER_BIT; }
        bits
    }

    pub fn from_bits(bits: u8) -> Self {
        Self {
            ctrl: bits & CTRL_BIT != 0,
            alt: bits & ALT_BIT != 0,
            shift: bits & SHIFT_BIT != 0,
            super_key: bits & SUPER_BIT != 0,
        }
    }

    pub fn to_vec(&self) -> Vec<&'static str> {
        let mut result = Vec::new();
        if self.ctrl { result.push("ctrl"); }
        if self.alt { result.push("alt"); }
        if self.shift { result.push("shift"); }
        if self.super_key { result.push("super"); }
        result
    }

    /// Разбор имени модификатора из конфигурации
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "ctrl" | "control" => Some(Self::new().with_ctrl(true)),
            "alt" | "menu" => Some(Self::new().with_alt(true)),
            "shift" => Some(Self::new().with_shift(true)),
            "super" | "win" | "windows" | "meta" => Some(Self::new().with_super(true)),
            _ => None,
        }
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modifiers = self.to_vec();
        if modifiers.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", modifiers.join("+"))
        }
    }
}

/// Событие клавиатуры
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key_code: KeyCode,
    pub state: KeyState,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key_code: KeyCode, state: KeyState, modifiers: Modifiers) -> Self {
        Self {
            key_code,
            state,
            modifiers,
        }
    }
}

/// Горячая клавиша переключения движка: модификаторы + основная клавиша
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key_code: KeyCode,
}

impl Hotkey {
    /// Срабатывает только на фронте нажатия при точном совпадении модификаторов
    pub fn matches(&self, event: &KeyEvent) -> bool {
        event.state == KeyState::Pressed
            && event.key_code == self.key_code
            && event.modifiers == self.modifiers
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key_code)
        } else {
            write!(f, "{}+{}", self.modifiers, self.key_code)
        }
    }
}
