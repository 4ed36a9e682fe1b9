use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Информация об активном окне
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowInfo {
    /// Идентификатор окна в оконной системе (X11 id, id узла sway, хеш UUID KWin)
    pub id: u64,
    pub pid: Option<u32>,
    pub title: String,
    pub class: String,
}

impl WindowInfo {
    pub fn new(id: u64, title: String) -> Self {
        Self {
            id,
            pid: None,
            title,
            class: String::new(),
        }
    }

    pub fn with_class(mut self, class: String) -> Self {
        self.class = class;
        self
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Стабильный числовой id для оконных систем со строковыми идентификаторами
    pub fn id_from_str(raw: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        raw.hash(&mut hasher);
        hasher.finish()
    }

    /// Смена фокуса: другое окно или другой владелец
    pub fn is_same_focus(&self, other: &WindowInfo) -> bool {
        self.id == other.id && self.pid == other.pid
    }
}

impl fmt::Display for WindowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pid {
            Some(pid) => write!(f, "window#{:x} (pid {})", self.id, pid),
            None => write!(f, "window#{:x}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_info_creation() {
        let window = WindowInfo::new(7, "Test Window".to_string())
            .with_class("TestApp".to_string())
            .with_pid(1234);

        assert_eq!(window.title, "Test Window");
        assert_eq!(window.class, "TestApp");
        assert_eq!(window.pid, Some(1234));
        // Заголовок не попадает в Display - он уходит в логи
        assert_eq!(window.to_string(), "window#7 (pid 1234)");
    }

    #[test]
    fn test_focus_comparison_ignores_title() {
        let a = WindowInfo::new(1, "a".to_string()).with_pid(10);
        let b = WindowInfo::new(1, "b".to_string()).with_pid(10);
        let c = WindowInfo::new(2, "a".to_string()).with_pid(10);
        assert!(a.is_same_focus(&b));
        assert!(!a.is_same_focus(&c));
    }

    #[test]
    fn test_id_from_str_is_stable() {
        let uuid = "{0c3ad6b4-4a58-4a4d-9b5e-6f1d2c7f8e90}";
        assert_eq!(WindowInfo::id_from_str(uuid), WindowInfo::id_from_str(uuid));
        assert_ne!(WindowInfo::id_from_str(uuid), WindowInfo::id_from_str("{other}"));
    }
}
