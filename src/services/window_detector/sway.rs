use super::r#trait::WindowSource;
use crate::error::{Result, ScrollError};
use crate::events::WindowInfo;
use serde_json::Value;
use std::process::Command;

/// Sway (и совместимые с i3 IPC композиторы)
pub struct SwayDetector;

impl SwayDetector {
    pub fn new() -> Self {
        Self
    }
}

/// Найти сфокусированное окно в дереве `swaymsg -t get_tree`
pub fn focused_window(tree: &Value) -> Option<WindowInfo> {
    let is_window = tree.get("pid").is_some() || tree.get("window").is_some_and(|w| !w.is_null());
    if tree.get("focused").and_then(Value::as_bool) == Some(true) && is_window {
        let id = tree.get("id").and_then(Value::as_u64)?;
        let title = tree
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let class = tree
            .get("app_id")
            .and_then(Value::as_str)
            .or_else(|| {
                tree.get("window_properties")
                    .and_then(|props| props.get("class"))
                    .and_then(Value::as_str)
            })
            .unwrap_or_default()
            .to_string();

        let mut window = WindowInfo::new(id, title).with_class(class);
        if let Some(pid) = tree
            .get("pid")
            .and_then(Value::as_u64)
            .and_then(|pid| u32::try_from(pid).ok())
        {
            window = window.with_pid(pid);
        }
        return Some(window);
    }

    ["nodes", "floating_nodes"]
        .iter()
        .filter_map(|key| tree.get(*key).and_then(Value::as_array))
        .flatten()
        .find_map(focused_window)
}

impl WindowSource for SwayDetector {
    fn name(&self) -> &'static str {
        "sway"
    }

    fn active_window(&self) -> Result<WindowInfo> {
        let output = Command::new("swaymsg")
            .args(["-t", "get_tree"])
            .output()
            .map_err(|e| ScrollError::ServiceUnavailable(format!("swaymsg не найден: {}", e)))?;

        if !output.status.success() {
            return Err(ScrollError::ServiceUnavailable(
                "swaymsg вернул ошибку".to_string(),
            ));
        }

        let tree: Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            ScrollError::ServiceUnavailable(format!("Некорректный ответ swaymsg: {}", e))
        })?;

        focused_window(&tree).ok_or_else(|| {
            ScrollError::ServiceUnavailable("Активное окно в Sway не найдено".to_string())
        })
    }
}
