use crate::config::Config;
use crate::error::Result;
use crate::events::WindowInfo;
use crate::services::EngineContext;
use std::sync::Arc;

/// Trait for window detectors that can run in different modes
#[async_trait::async_trait]
pub trait WindowDetectorTrait {
    /// Run the window detector
    async fn run(self: Box<Self>) -> Result<()>;
}

/// Источник активного окна (внешняя утилита оконной системы).
///
/// Вызовы блокирующие - детектор выполняет их через `spawn_blocking`.
pub trait WindowSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn active_window(&self) -> Result<WindowInfo>;
}

/// Factory function to create an appropriate window detector based on the dry_run flag
pub fn create_window_detector(
    config: &Config,
    context: Arc<EngineContext>,
    dry_run: bool,
) -> Result<Box<dyn WindowDetectorTrait + Send>> {
    if dry_run {
        Ok(Box::new(super::dry_run::DryRunDetector::new(context)))
    } else {
        Ok(Box::new(super::window_detector::RealWindowDetector::new(
            config, context,
        )?))
    }
}
