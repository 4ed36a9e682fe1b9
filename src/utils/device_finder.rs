use crate::error::{Result, ScrollError};
use evdev::{Device, KeyCode, RelativeAxisCode};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Возможности устройства, по которым выбирается мышь или клавиатура
#[derive(Debug, Clone, Default)]
pub struct DeviceProfile {
    pub name: String,
    pub has_wheel: bool,
    pub has_left_button: bool,
    pub has_typing_keys: bool,
    pub key_count: usize,
}

impl DeviceProfile {
    fn read(device: &Device) -> Self {
        let keys = device.supported_keys();
        let axes = device.supported_relative_axes();

        Self {
            name: device.name().unwrap_or("Unknown").to_string(),
            has_wheel: axes.is_some_and(|axes| axes.contains(RelativeAxisCode::REL_WHEEL)),
            has_left_button: keys.is_some_and(|keys| keys.contains(KeyCode::BTN_LEFT)),
            has_typing_keys: keys.is_some_and(|keys| {
                keys.contains(KeyCode::KEY_A)
                    && keys.contains(KeyCode::KEY_SPACE)
                    && keys.contains(KeyCode::KEY_ENTER)
            }),
            key_count: keys.map_or(0, |keys| keys.iter().count()),
        }
    }

    /// Мышь с колесом; собственное виртуальное устройство исключается
    pub fn is_wheel_mouse(&self, exclude_name: &str) -> bool {
        self.has_wheel && self.has_left_button && self.name != exclude_name
    }

    pub fn is_keyboard(&self) -> bool {
        let name = self.name.to_lowercase();
        if ["mouse", "touchpad", "trackpoint"]
            .iter()
            .any(|marker| name.contains(marker))
        {
            return false;
        }
        // У настоящей клавиатуры много клавиш
        self.has_typing_keys && self.key_count > 20
    }
}

pub struct DeviceFinder;

impl DeviceFinder {
    /// Найти физическую мышь с колесом
    pub fn find_mouse_device(device_path: &str, exclude_name: &str) -> Result<PathBuf> {
        if device_path != "auto" {
            return Self::explicit_path(device_path);
        }

        info!("Начинаем автопоиск мыши с колесом...");
        let found = Self::scan_by_id(|name| name.ends_with("event-mouse"))
            .into_iter()
            .chain(Self::scan_event_devices())
            .find(|path| {
                Self::profile(path).is_some_and(|profile| profile.is_wheel_mouse(exclude_name))
            });

        match found {
            Some(path) => {
                info!("Найдена мышь: {:?}", path);
                Ok(path)
            }
            None => ScrollError::device_not_found(
                "Не удалось найти мышь с колесом. \
                 Убедитесь, что пользователь добавлен в группу 'input'",
            ),
        }
    }

    /// Найти подходящее клавиатурное устройство
    pub fn find_keyboard_device(device_path: &str) -> Result<PathBuf> {
        if device_path != "auto" {
            return Self::explicit_path(device_path);
        }

        info!("Начинаем автопоиск клавиатурного устройства...");
        let mut by_id: Vec<(PathBuf, u32)> =
            Self::scan_by_id(|name| name.contains("kbd") || name.contains("keyboard"))
                .into_iter()
                .filter_map(|path| {
                    let name = path.file_name()?.to_str()?.to_string();
                    let priority = if name.ends_with("event-kbd") { 100 } else { 10 };
                    Some((path, priority))
                })
                .collect();
        by_id.sort_by(|a, b| b.1.cmp(&a.1));

        let found = by_id
            .into_iter()
            .map(|(path, _)| path)
            .chain(Self::scan_event_devices())
            .find(|path| Self::profile(path).is_some_and(|profile| profile.is_keyboard()));

        match found {
            Some(path) => {
                info!("Найдена клавиатура: {:?}", path);
                Ok(path)
            }
            None => ScrollError::device_not_found(
                "Не удалось найти подходящее клавиатурное устройство. \
                 Убедитесь, что пользователь добавлен в группу 'input'",
            ),
        }
    }

    fn explicit_path(device_path: &str) -> Result<PathBuf> {
        let path = PathBuf::from(device_path);
        if path.exists() {
            info!("Используется указанное устройство: {:?}", path);
            Ok(path)
        } else {
            ScrollError::device_not_found(format!("Указанное устройство не найдено: {:?}", path))
        }
    }

    /// Ссылки /dev/input/by-id, имя которых подходит под фильтр
    fn scan_by_id(filter: impl Fn(&str) -> bool) -> Vec<PathBuf> {
        let by_id_dir = Path::new("/dev/input/by-id");
        let entries = match fs::read_dir(by_id_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Нет доступа к {:?}: {}", by_id_dir, e);
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| name.contains("event") && filter(name))
            })
            .collect()
    }

    /// Все /dev/input/event* в порядке номеров
    fn scan_event_devices() -> Vec<PathBuf> {
        let input_dir = Path::new("/dev/input");
        let entries = match fs::read_dir(input_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Нет доступа к {:?}: {}", input_dir, e);
                return Vec::new();
            }
        };

        let mut devices: Vec<(u32, PathBuf)> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter_map(|path| {
                let number = path
                    .file_name()?
                    .to_str()?
                    .strip_prefix("event")?
                    .parse()
                    .ok()?;
                Some((number, path))
            })
            .collect();
        devices.sort_by_key(|(number, _)| *number);
        devices.into_iter().map(|(_, path)| path).collect()
    }

    fn profile(device_path: &Path) -> Option<DeviceProfile> {
        match Device::open(device_path) {
            Ok(device) => {
                let profile = DeviceProfile::read(&device);
                debug!("Устройство {:?}: {:?}", device_path, profile);
                Some(profile)
            }
            Err(e) => {
                debug!("Не удалось открыть устройство {:?}: {}", device_path, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mouse(name: &str) -> DeviceProfile {
        DeviceProfile {
            name: name.to_string(),
            has_wheel: true,
            has_left_button: true,
            ..Default::default()
        }
    }

    #[test]
    fn wheel_mouse_requires_wheel_and_button() {
        assert!(mouse("Logitech USB Optical Mouse").is_wheel_mouse("Smooth-Scroll Virtual Mouse"));

        let touchpad = DeviceProfile {
            has_wheel: false,
            ..mouse("SynPS/2 Touchpad")
        };
        assert!(!touchpad.is_wheel_mouse("Smooth-Scroll Virtual Mouse"));
    }

    #[test]
    fn own_virtual_mouse_is_excluded() {
        let own = mouse("Smooth-Scroll Virtual Mouse");
        assert!(!own.is_wheel_mouse("Smooth-Scroll Virtual Mouse"));
    }

    #[test]
    fn keyboard_detection_rejects_mice_with_keys() {
        let keyboard = DeviceProfile {
            name: "AT Translated Set 2 keyboard".to_string(),
            has_typing_keys: true,
            key_count: 100,
            ..Default::default()
        };
        assert!(keyboard.is_keyboard());

        let gaming_mouse = DeviceProfile {
            name: "Razer DeathAdder Mouse".to_string(),
            ..keyboard.clone()
        };
        assert!(!gaming_mouse.is_keyboard());

        let power_button = DeviceProfile {
            name: "Power Button".to_string(),
            has_typing_keys: false,
            key_count: 1,
            ..Default::default()
        };
        assert!(!power_button.is_keyboard());
    }

    #[test]
    fn missing_explicit_path_is_reported() {
        let result = DeviceFinder::find_mouse_device("/non/existent/path", "x");
        assert!(matches!(result, Err(ScrollError::DeviceNotFound(_))));
        assert!(DeviceFinder::find_keyboard_device("/non/existent/path").is_err());
    }
}
