use crate::config::Config;
use crate::error::Result;
use crate::events::{Modifiers, WindowInfo};
use arc_swap::{ArcSwap, ArcSwapOption};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::info;

/// Общее состояние движка, передаваемое всем компонентам явно.
///
/// Только дешёвые чтения на горячем пути:
/// - конфигурация - атомарно заменяемый снимок (`ArcSwap`);
/// - флаги включения, остановки и деградации перехвата - атомики;
/// - зажатые модификаторы - битовая маска, которую публикует слушатель клавиатуры;
/// - активное окно - публикует детектор окон.
///
/// Никаких решений о прокрутке здесь не принимается.
pub struct EngineContext {
    config: ArcSwap<Config>,
    enabled: AtomicBool,
    modifiers: AtomicU8,
    foreground: ArcSwapOption<WindowInfo>,
    shutdown: AtomicBool,
    hook_degraded: AtomicBool,
}

impl EngineContext {
    pub fn new(config: Config) -> Self {
        let enabled = config.enabled;
        Self {
            config: ArcSwap::from_pointee(config),
            enabled: AtomicBool::new(enabled),
            modifiers: AtomicU8::new(0),
            foreground: ArcSwapOption::empty(),
            shutdown: AtomicBool::new(false),
            hook_degraded: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.load_full()
    }

    /// Проверяет новый снимок конфигурации и атомарно подменяет текущий
    pub fn update_config(&self, mut config: Config) -> Result<()> {
        config.validate()?;
        config.build_optimization_indexes();
        self.config.store(Arc::new(config));
        info!("Конфигурация обновлена");
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Возвращает предыдущее значение
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::AcqRel)
    }

    /// Переключает движок и возвращает новое состояние
    pub fn toggle(&self) -> bool {
        !self.enabled.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn modifiers(&self) -> Modifiers {
        Modifiers::from_bits(self.modifiers.load(Ordering::Acquire))
    }

    pub fn set_modifiers(&self, modifiers: Modifiers) {
        self.modifiers.store(modifiers.to_bits(), Ordering::Release);
    }

    pub fn foreground(&self) -> Option<Arc<WindowInfo>> {
        self.foreground.load_full()
    }

    /// Публикует активное окно; true, если фокус сменился
    pub fn set_foreground(&self, window: Option<WindowInfo>) -> bool {
        let changed = match (self.foreground.load().as_deref(), window.as_ref()) {
            (Some(old), Some(new)) => !old.is_same_focus(new),
            (None, None) => false,
            _ => true,
        };
        self.foreground.store(window.map(Arc::new));
        changed
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_hook_degraded(&self) -> bool {
        self.hook_degraded.load(Ordering::Acquire)
    }

    pub fn set_hook_degraded(&self, degraded: bool) {
        self.hook_degraded.store(degraded, Ordering::Release);
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
