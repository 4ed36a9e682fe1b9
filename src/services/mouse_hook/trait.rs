use crate::config::Config;
use crate::error::Result;
use crate::services::{EngineContext, HookDispatcher, VirtualMouse};
use std::sync::Arc;
use tokio::sync::watch;

/// Перехват колеса мыши на уровне ОС
#[async_trait::async_trait]
pub trait MouseHookTrait: Send {
    /// Установить перехват. Вызывается синхронно до запуска цикла обработки.
    fn install(&mut self) -> Result<()>;

    /// Цикл обработки событий; завершается по сигналу остановки или при
    /// окончательной потере перехвата
    async fn pump(
        self: Box<Self>,
        dispatcher: Arc<HookDispatcher>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()>;
}

/// Factory function to create an appropriate mouse hook based on the dry_run flag
pub fn create_mouse_hook(
    config: &Config,
    context: Arc<EngineContext>,
    virtual_mouse: Arc<VirtualMouse>,
    dry_run: bool,
) -> Result<Box<dyn MouseHookTrait>> {
    if dry_run {
        Ok(Box::new(super::dry_mouse_hook::DryRunMouseHook::new()))
    } else {
        Ok(Box::new(super::mouse_hook::RealMouseHook::new(
            config,
            context,
            virtual_mouse,
        )?))
    }
}
