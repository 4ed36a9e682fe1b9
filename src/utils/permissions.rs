use crate::error::{Result, ScrollError};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::{info, warn};

const INPUT_DIR: &str = "/dev/input";
const UINPUT_DEVICE: &str = "/dev/uinput";

/// Проверить доступ к устройствам ввода и uinput
pub fn check_permissions() -> Result<()> {
    info!("Проверка прав доступа...");

    check_input_devices_access()?;
    check_uinput_access()?;
    check_not_root();

    info!("Проверка прав доступа завершена успешно");
    Ok(())
}

fn check_input_devices_access() -> Result<()> {
    if !Path::new(INPUT_DIR).exists() {
        return Err(ScrollError::Permission(format!(
            "Директория {} не существует",
            INPUT_DIR
        )));
    }

    fs::read_dir(INPUT_DIR).map_err(|e| {
        ScrollError::Permission(format!(
            "Нет доступа к {}: {}. Добавьте пользователя в группу 'input'",
            INPUT_DIR, e
        ))
    })?;
    info!("Доступ к {} подтвержден", INPUT_DIR);
    Ok(())
}

fn check_uinput_access() -> Result<()> {
    if !Path::new(UINPUT_DEVICE).exists() {
        // Модуль может быть загружен позже; создание виртуальной мыши сообщит точную ошибку
        warn!("{} не существует, возможно модуль uinput не загружен", UINPUT_DEVICE);
        return Ok(());
    }

    let metadata = fs::metadata(UINPUT_DEVICE).map_err(|e| {
        ScrollError::Permission(format!(
            "Не удалось проверить права доступа к {}: {}",
            UINPUT_DEVICE, e
        ))
    })?;

    if !uinput_mode_allows_access(metadata.permissions().mode()) {
        return Err(ScrollError::Permission(format!(
            "Нет прав доступа к {}. Добавьте пользователя в группу 'uinput' или 'input'",
            UINPUT_DEVICE
        )));
    }

    info!("Доступ к {} подтвержден", UINPUT_DEVICE);
    Ok(())
}

/// Доступ через группу или для всех (обычно 660 или 666)
fn uinput_mode_allows_access(mode: u32) -> bool {
    mode & 0o006 != 0 || mode & 0o060 != 0
}

fn check_not_root() {
    match std::env::var("USER") {
        Ok(user) if user == "root" => {
            warn!("Приложение запущено от имени root!");
            warn!("Рекомендуется запускать от обычного пользователя в группах 'input' и 'uinput'");
        }
        Ok(user) => info!("Приложение запущено от имени пользователя: {}", user),
        Err(_) => warn!("Не удалось определить пользователя"),
    }
}

/// Команды для настройки прав доступа
pub fn setup_commands() -> &'static [&'static str] {
    &[
        "sudo usermod -a -G input,uinput $USER",
        "sudo modprobe uinput",
        "echo 'uinput' | sudo tee /etc/modules-load.d/uinput.conf",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_commands_cover_groups_and_module() {
        let commands = setup_commands();
        assert!(commands.iter().any(|cmd| cmd.contains("usermod")));
        assert!(commands.iter().any(|cmd| cmd.contains("modprobe")));
    }

    #[test]
    fn uinput_mode_check() {
        assert!(uinput_mode_allows_access(0o660));
        assert!(uinput_mode_allows_access(0o666));
        assert!(!uinput_mode_allows_access(0o600));
    }
}
