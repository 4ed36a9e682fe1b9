use crate::error::Result;
use crate::services::EngineContext;
use std::sync::Arc;
use tracing::{debug, info};

use super::r#trait::KeyboardListenerTrait;

pub struct DryRunKeyboardListener {
    context: Arc<EngineContext>,
}

impl DryRunKeyboardListener {
    pub fn new(context: Arc<EngineContext>) -> Self {
        info!("Инициализация DryRunKeyboardListener");
        Self { context }
    }

    async fn run_impl(self) -> Result<()> {
        info!("Dry-run режим - KeyboardListener работает в режиме эмуляции");
        if let Some(hotkey) = self.context.config().toggle_hotkey() {
            info!("Горячая клавиша переключения (dry-run): {}", hotkey);
        }

        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
            debug!(
                "KeyboardListener работает в dry-run режиме (движок {})",
                if self.context.is_enabled() { "включён" } else { "выключен" }
            );
        }
    }
}

#[async_trait::async_trait]
impl KeyboardListenerTrait for DryRunKeyboardListener {
    async fn run(self: Box<Self>) -> Result<()> {
        (*self).run_impl().await
    }
}
