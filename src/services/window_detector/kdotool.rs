use super::r#trait::WindowSource;
use super::xdotool::parse_pid;
use crate::error::{Result, ScrollError};
use crate::events::WindowInfo;
use std::collections::HashMap;
use std::process::Command;
use tracing::debug;

/// kdotool (KWin, в том числе Wayland). Идентификаторы окон - UUID.
pub struct KdotoolDetector;

/// При запуске через sudo kdotool должен видеть сессию исходного пользователя
fn build_env_overrides() -> HashMap<String, String> {
    let mut env_vars = HashMap::new();

    if std::env::var("USER").unwrap_or_default() == "root" {
        if let Ok(sudo_user) = std::env::var("SUDO_USER") {
            if let Ok(output) = Command::new("id").args(["-u", &sudo_user]).output() {
                if let Ok(uid_str) = String::from_utf8(output.stdout) {
                    let uid = uid_str.trim();
                    let user_runtime_dir = format!("/run/user/{}", uid);
                    let dbus_address = format!("unix:path={}/bus", user_runtime_dir);

                    debug!("Подставляем переменные окружения для пользователя {}: uid={}", sudo_user, uid);
                    env_vars.insert("DBUS_SESSION_BUS_ADDRESS".to_string(), dbus_address);
                    env_vars.insert("XDG_RUNTIME_DIR".to_string(), user_runtime_dir);
                    env_vars.insert("USER".to_string(), sudo_user);
                }
            }
        }
    }

    env_vars
}

impl KdotoolDetector {
    pub fn new() -> Self {
        Self
    }

    fn create_command(args: &[&str]) -> Command {
        let mut cmd = if let Ok(sudo_user) = std::env::var("SUDO_USER") {
            let mut cmd = Command::new("sudo");
            cmd.args(["-E", "-u", &sudo_user, "kdotool"]);
            cmd.args(args);
            cmd
        } else {
            let mut cmd = Command::new("kdotool");
            cmd.args(args);
            cmd
        };

        for (key, value) in build_env_overrides() {
            cmd.env(key, value);
        }

        cmd
    }

    fn run(args: &[&str]) -> Result<String> {
        let output = Self::create_command(args).output().map_err(|e| {
            ScrollError::ServiceUnavailable(format!("kdotool не найден: {}", e))
        })?;

        if !output.status.success() {
            debug!(
                "kdotool {} failed: {}",
                args[0],
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(ScrollError::ServiceUnavailable(format!(
                "kdotool {} failed",
                args[0]
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl WindowSource for KdotoolDetector {
    fn name(&self) -> &'static str {
        "kdotool"
    }

    fn active_window(&self) -> Result<WindowInfo> {
        let uuid = Self::run(&["getactivewindow"])?;
        if uuid.is_empty() {
            return Err(ScrollError::ServiceUnavailable(
                "kdotool вернул пустой id окна".to_string(),
            ));
        }

        let title = Self::run(&["getwindowname", &uuid]).unwrap_or_default();
        let class = Self::run(&["getwindowclassname", &uuid]).unwrap_or_default();
        let mut window = WindowInfo::new(WindowInfo::id_from_str(&uuid), title).with_class(class);

        if let Some(pid) = Self::run(&["getwindowpid", &uuid])
            .ok()
            .as_deref()
            .and_then(parse_pid)
        {
            window = window.with_pid(pid);
        }

        Ok(window)
    }
}
