use crate::error::Result;
use crate::events::{Axis, ScrollEvent, WheelInput};
use crate::services::HookDispatcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

use super::r#trait::MouseHookTrait;

const FAKE_NOTCH_INTERVAL: Duration = Duration::from_secs(2);

/// Эмуляция перехвата: каждые две секунды через диспетчер проходит щелчок колеса
#[derive(Default)]
pub struct DryRunMouseHook {
    notches_sent: u64,
}

impl DryRunMouseHook {
    pub fn new() -> Self {
        Self::default()
    }

    async fn run_impl(
        mut self,
        dispatcher: Arc<HookDispatcher>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        info!("Dry-run режим - перехват колеса работает в режиме эмуляции");
        let mut interval = tokio::time::interval(FAKE_NOTCH_INTERVAL);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("[DRY RUN] Эмуляция колеса остановлена ({} щелчков)", self.notches_sent);
                        return Ok(());
                    }
                }
                _ = interval.tick() => {
                    // Три щелчка вниз, три вверх
                    let delta = if (self.notches_sent / 3) % 2 == 0 { -1 } else { 1 };
                    let event = ScrollEvent::new(Axis::Vertical, delta);
                    let decision = dispatcher.on_wheel_event(WheelInput::Genuine(event));
                    self.notches_sent += 1;
                    info!("[DRY RUN] Щелчок колеса {} → {:?}", event, decision);
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl MouseHookTrait for DryRunMouseHook {
    fn install(&mut self) -> Result<()> {
        info!("[DRY RUN] Перехват колеса не устанавливается");
        Ok(())
    }

    async fn pump(
        self: Box<Self>,
        dispatcher: Arc<HookDispatcher>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        (*self).run_impl(dispatcher, shutdown).await
    }
}
