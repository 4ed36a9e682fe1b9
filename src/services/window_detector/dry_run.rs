use crate::error::Result;
use crate::events::WindowInfo;
use crate::services::EngineContext;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::info;

use super::r#trait::WindowDetectorTrait;

pub struct DryRunDetector {
    context: Arc<EngineContext>,
}

impl DryRunDetector {
    pub fn new(context: Arc<EngineContext>) -> Self {
        Self { context }
    }

    /// Набор фальшивых окон; последнее принадлежит самому процессу, чтобы
    /// через /proc разрешалось настоящее имя программы
    fn fake_windows() -> Vec<WindowInfo> {
        vec![
            WindowInfo::new(1, "Terminal - dry_run".to_string()).with_class("DryRun".to_string()),
            WindowInfo::new(2, "Browser - dry_run".to_string()).with_class("DryRun".to_string()),
            WindowInfo::new(3, "smooth-scroll - dry_run".to_string())
                .with_class("DryRun".to_string())
                .with_pid(std::process::id()),
        ]
    }

    async fn run_impl(self) -> Result<()> {
        info!("Dry-run режим - WindowDetector работает в режиме эмуляции");

        let fake_windows = Self::fake_windows();
        let mut window_index = 0;
        let mut interval = interval(Duration::from_secs(10));

        loop {
            interval.tick().await;

            let fake_window = fake_windows[window_index].clone();
            info!("Dry-run: эмулируем смену окна на: {}", fake_window.title);
            self.context.set_foreground(Some(fake_window));

            window_index = (window_index + 1) % fake_windows.len();
        }
    }
}

#[async_trait::async_trait]
impl WindowDetectorTrait for DryRunDetector {
    async fn run(self: Box<Self>) -> Result<()> {
        (*self).run_impl().await
    }
}
