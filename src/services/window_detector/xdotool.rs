use super::r#trait::WindowSource;
use crate::error::{Result, ScrollError};
use crate::events::WindowInfo;
use std::process::Command;
use tracing::debug;

pub struct XdotoolDetector;

impl XdotoolDetector {
    pub fn new() -> Self {
        Self
    }

    fn run(args: &[&str]) -> Result<String> {
        let output = Command::new("xdotool").args(args).output().map_err(|e| {
            debug!("xdotool не найден или не работает: {}", e);
            ScrollError::ServiceUnavailable(format!("xdotool не найден: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("xdotool {} вернул ошибку: {}", args[0], stderr.trim());
            return Err(ScrollError::ServiceUnavailable(format!(
                "xdotool {} вернул ошибку",
                args[0]
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Идентификатор X11 окна из вывода `getactivewindow`
pub fn parse_window_id(output: &str) -> Option<u64> {
    output.trim().parse().ok()
}

pub fn parse_pid(output: &str) -> Option<u32> {
    output.trim().parse().ok().filter(|&pid| pid > 0)
}

impl WindowSource for XdotoolDetector {
    fn name(&self) -> &'static str {
        "xdotool"
    }

    fn active_window(&self) -> Result<WindowInfo> {
        let raw_id = Self::run(&["getactivewindow"])?;
        let id = parse_window_id(&raw_id).ok_or_else(|| {
            ScrollError::ServiceUnavailable("xdotool вернул некорректный id окна".to_string())
        })?;

        let title = Self::run(&["getwindowname", &raw_id]).unwrap_or_default();
        let class = Self::run(&["getwindowclassname", &raw_id]).unwrap_or_default();
        let mut window = WindowInfo::new(id, title).with_class(class);

        // У окон без _NET_WM_PID процесс не определить
        if let Some(pid) = Self::run(&["getwindowpid", &raw_id])
            .ok()
            .as_deref()
            .and_then(parse_pid)
        {
            window = window.with_pid(pid);
        }

        Ok(window)
    }
}
