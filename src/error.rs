use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrollError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Устройство не найдено: {0}")]
    DeviceNotFound(String),

    #[error("Недостаточно прав доступа: {0}")]
    Permission(String),

    /// Перехват колеса не удалось установить при старте - без него движок не работает
    #[error("Не удалось зарегистрировать перехват колеса: {0}")]
    HookRegistration(String),

    /// Перехват был снят извне (устройство отключено, grab отозван)
    #[error("Перехват колеса неожиданно снят: {0}")]
    HookRemoved(String),

    #[error("Не удалось определить процесс pid={pid}: {reason}")]
    ProcessResolution { pid: u32, reason: String },

    #[error("Сбой потока анимации ({axis}): {reason}")]
    AnimatorThread { axis: &'static str, reason: String },

    #[error("Сервис недоступен: {0}")]
    ServiceUnavailable(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl ScrollError {
    pub fn device_not_found<T>(msg: impl Into<String>) -> Result<T> {
        Err(ScrollError::DeviceNotFound(msg.into()))
    }

    /// Ошибки, после которых движок продолжает работу в штатном или деградированном режиме
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ScrollError::HookRegistration(_) | ScrollError::Permission(_) | ScrollError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScrollError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! scroll_error {
    (device_not_found, $($arg:tt)*) => {
        $crate::error::ScrollError::DeviceNotFound(format!($($arg)*))
    };
    (permission, $($arg:tt)*) => {
        $crate::error::ScrollError::Permission(format!($($arg)*))
    };
    (hook_registration, $($arg:tt)*) => {
        $crate::error::ScrollError::HookRegistration(format!($($arg)*))
    };
    (hook_removed, $($arg:tt)*) => {
        $crate::error::ScrollError::HookRemoved(format!($($arg)*))
    };
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::ScrollError::ServiceUnavailable(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::ScrollError::Internal(format!($($arg)*))
    };
}
