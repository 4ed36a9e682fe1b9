use crate::events::{Hotkey, KeyCode, Modifiers};
use evdev::KeyCode as Evdev;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Имена клавиш конфигурации → коды evdev
static KEY_NAME_TO_CODE: Lazy<HashMap<&'static str, Evdev>> = Lazy::new(|| {
    let mut map = HashMap::new();

    // Буквенные клавиши
    for (name, code) in [
        ("a", Evdev::KEY_A), ("b", Evdev::KEY_B), ("c", Evdev::KEY_C), ("d", Evdev::KEY_D),
        ("e", Evdev::KEY_E), ("f", Evdev::KEY_F), ("g", Evdev::KEY_G), ("h", Evdev::KEY_H),
        ("i", Evdev::KEY_I), ("j", Evdev::KEY_J), ("k", Evdev::KEY_K), ("l", Evdev::KEY_L),
        ("m", Evdev::KEY_M), ("n", Evdev::KEY_N), ("o", Evdev::KEY_O), ("p", Evdev::KEY_P),
        ("q", Evdev::KEY_Q), ("r", Evdev::KEY_R), ("s", Evdev::KEY_S), ("t", Evdev::KEY_T),
        ("u", Evdev::KEY_U), ("v", Evdev::KEY_V), ("w", Evdev::KEY_W), ("x", Evdev::KEY_X),
        ("y", Evdev::KEY_Y), ("z", Evdev::KEY_Z),
    ] {
        map.insert(name, code);
    }

    // Цифровые клавиши (верхний ряд)
    for (name, code) in [
        ("1", Evdev::KEY_1), ("2", Evdev::KEY_2), ("3", Evdev::KEY_3), ("4", Evdev::KEY_4),
        ("5", Evdev::KEY_5), ("6", Evdev::KEY_6), ("7", Evdev::KEY_7), ("8", Evdev::KEY_8),
        ("9", Evdev::KEY_9), ("0", Evdev::KEY_0),
    ] {
        map.insert(name, code);
    }

    // Функциональные клавиши
    for (name, code) in [
        ("f1", Evdev::KEY_F1), ("f2", Evdev::KEY_F2), ("f3", Evdev::KEY_F3),
        ("f4", Evdev::KEY_F4), ("f5", Evdev::KEY_F5), ("f6", Evdev::KEY_F6),
        ("f7", Evdev::KEY_F7), ("f8", Evdev::KEY_F8), ("f9", Evdev::KEY_F9),
        ("f10", Evdev::KEY_F10), ("f11", Evdev::KEY_F11), ("f12", Evdev::KEY_F12),
    ] {
        map.insert(name, code);
    }

    // Специальные клавиши и навигация
    map.insert("space", Evdev::KEY_SPACE);
    map.insert("enter", Evdev::KEY_ENTER);
    map.insert("tab", Evdev::KEY_TAB);
    map.insert("esc", Evdev::KEY_ESC);
    map.insert("escape", Evdev::KEY_ESC);
    map.insert("backspace", Evdev::KEY_BACKSPACE);
    map.insert("home", Evdev::KEY_HOME);
    map.insert("end", Evdev::KEY_END);
    map.insert("insert", Evdev::KEY_INSERT);
    map.insert("delete", Evdev::KEY_DELETE);
    map.insert("pageup", Evdev::KEY_PAGEUP);
    map.insert("pagedown", Evdev::KEY_PAGEDOWN);
    map.insert("up", Evdev::KEY_UP);
    map.insert("down", Evdev::KEY_DOWN);
    map.insert("left", Evdev::KEY_LEFT);
    map.insert("right", Evdev::KEY_RIGHT);
    map.insert("pause", Evdev::KEY_PAUSE);
    map.insert("capslock", Evdev::KEY_CAPSLOCK);
    map.insert("numlock", Evdev::KEY_NUMLOCK);
    map.insert("scrolllock", Evdev::KEY_SCROLLLOCK);

    map
});

/// Преобразование строки горячей клавиши ("ctrl+alt+s") в коды evdev
pub struct KeyNames;

impl KeyNames {
    /// Получить evdev код клавиши по её имени
    pub fn key_code(key_name: &str) -> Result<KeyCode, String> {
        let normalized = key_name.trim().to_lowercase();
        KEY_NAME_TO_CODE
            .get(normalized.as_str())
            .map(|code| KeyCode(code.code()))
            .ok_or_else(|| format!("Unknown key: {}", key_name))
    }

    /// Получить имя клавиши по её коду
    pub fn key_name(key_code: KeyCode) -> Option<&'static str> {
        KEY_NAME_TO_CODE
            .iter()
            .filter(|(_, code)| code.code() == key_code.value())
            .map(|(name, _)| *name)
            .min_by_key(|name| name.len())
    }

    /// Разобрать комбинацию: любые модификаторы и ровно одна основная клавиша
    pub fn parse_hotkey(text: &str) -> Result<Hotkey, String> {
        let mut modifiers = Modifiers::new();
        let mut key_code = None;

        for part in text.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            if let Some(modifier) = Modifiers::from_name(part) {
                modifiers = Modifiers::from_bits(modifiers.to_bits() | modifier.to_bits());
                continue;
            }

            if key_code.is_some() {
                return Err(format!("Горячая клавиша '{}' содержит больше одной основной клавиши", text));
            }
            key_code = Some(Self::key_code(part)?);
        }

        let key_code = key_code
            .ok_or_else(|| format!("Горячая клавиша '{}' не содержит основной клавиши", text))?;

        Ok(Hotkey { modifiers, key_code })
    }
}
