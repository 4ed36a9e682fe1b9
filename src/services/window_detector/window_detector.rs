use crate::config::Config;
use crate::error::{Result, ScrollError};
use crate::events::WindowInfo;
use crate::services::EngineContext;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use super::kdotool::KdotoolDetector;
use super::r#trait::{WindowDetectorTrait, WindowSource};
use super::sway::SwayDetector;
use super::xdotool::XdotoolDetector;

/// Пауза, если ни один источник не работает
const ALL_FAILED_BACKOFF: Duration = Duration::from_secs(10);

/// Источники для метода детекции в порядке опроса
pub fn sources_for_method(method: &str) -> Vec<Arc<dyn WindowSource>> {
    match method {
        "kdotool" => vec![Arc::new(KdotoolDetector::new())],
        "xdotool" => vec![Arc::new(XdotoolDetector::new())],
        "sway" => vec![Arc::new(SwayDetector::new())],
        "none" => Vec::new(),
        _ => vec![
            Arc::new(KdotoolDetector::new()),
            Arc::new(XdotoolDetector::new()),
            Arc::new(SwayDetector::new()),
        ],
    }
}

/// Однократный запрос активного окна первым сработавшим источником
pub fn query_foreground_once(method: &str) -> Result<WindowInfo> {
    for source in sources_for_method(method) {
        match source.active_window() {
            Ok(window) => {
                debug!("{}: {}", source.name(), window);
                return Ok(window);
            }
            Err(e) => debug!("{} недоступен: {}", source.name(), e),
        }
    }
    Err(ScrollError::ServiceUnavailable(
        "Ни один метод детекции окон не работает".to_string(),
    ))
}

async fn query_source(source: Arc<dyn WindowSource>) -> Result<WindowInfo> {
    tokio::task::spawn_blocking(move || source.active_window())
        .await
        .map_err(|e| ScrollError::Internal(format!("Задача детекции окна прервана: {}", e)))?
}

pub struct RealWindowDetector {
    context: Arc<EngineContext>,
    polling_interval: Duration,
    sources: Vec<Arc<dyn WindowSource>>,
    working_source: Option<Arc<dyn WindowSource>>,
}

impl RealWindowDetector {
    pub fn new(config: &Config, context: Arc<EngineContext>) -> Result<Self> {
        info!(
            "Инициализация RealWindowDetector (метод: {})",
            config.window.detection_method
        );

        Ok(Self {
            context,
            polling_interval: Duration::from_millis(config.window.polling_interval_ms),
            sources: sources_for_method(&config.window.detection_method),
            working_source: None,
        })
    }

    async fn detect_working_source(&self) -> Option<Arc<dyn WindowSource>> {
        info!("Определяем рабочий метод детекции окон...");

        for source in &self.sources {
            match query_source(Arc::clone(source)).await {
                Ok(_) => {
                    info!("Используем {}", source.name());
                    return Some(Arc::clone(source));
                }
                Err(e) => debug!("{} не работает: {}", source.name(), e),
            }
        }
        None
    }

    async fn run_impl(mut self) -> Result<()> {
        if self.sources.is_empty() {
            info!("Детекция окон отключена - чёрный список и настройки программ неактивны");
            return Ok(());
        }

        let mut ticker = interval(self.polling_interval);
        info!("RealWindowDetector запущен (интервал {:?})", self.polling_interval);

        loop {
            ticker.tick().await;

            let source = match self.working_source.clone() {
                Some(source) => source,
                None => match self.detect_working_source().await {
                    Some(source) => {
                        self.working_source = Some(source.clone());
                        source
                    }
                    None => {
                        error!(
                            "Ни один метод детекции окон не работает. Приостанавливаем детекцию на {:?}",
                            ALL_FAILED_BACKOFF
                        );
                        self.context.set_foreground(None);
                        tokio::time::sleep(ALL_FAILED_BACKOFF).await;
                        continue;
                    }
                },
            };

            match query_source(source.clone()).await {
                Ok(window) => self.publish(window),
                Err(e) => {
                    warn!(
                        "Рабочий метод {} перестал работать: {}. Переопределяем...",
                        source.name(),
                        e
                    );
                    self.working_source = None;
                    self.context.set_foreground(None);
                }
            }
        }
    }

    fn publish(&self, window: WindowInfo) {
        let description = window.to_string();
        let title = window.title.clone();
        if self.context.set_foreground(Some(window)) {
            info!("Смена активного окна: {}", description);
            debug!("Заголовок окна: {}", title);
        }
    }
}

impl Drop for RealWindowDetector {
    fn drop(&mut self) {
        info!("RealWindowDetector завершает работу");
    }
}

#[async_trait::async_trait]
impl WindowDetectorTrait for RealWindowDetector {
    async fn run(self: Box<Self>) -> Result<()> {
        (*self).run_impl().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(WindowInfo);

    impl WindowSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn active_window(&self) -> Result<WindowInfo> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn method_selects_sources() {
        let names = |method: &str| -> Vec<&'static str> {
            sources_for_method(method).iter().map(|s| s.name()).collect()
        };
        assert_eq!(names("auto"), vec!["kdotool", "xdotool", "sway"]);
        assert_eq!(names("sway"), vec!["sway"]);
        assert!(names("none").is_empty());
    }

    #[tokio::test]
    async fn detector_publishes_focused_window() {
        let context = Arc::new(EngineContext::default());
        let window = WindowInfo::new(5, "Editor".to_string()).with_pid(321);
        let detector = RealWindowDetector {
            context: context.clone(),
            polling_interval: Duration::from_millis(5),
            sources: vec![Arc::new(FixedSource(window.clone()))],
            working_source: None,
        };

        let task = tokio::spawn(Box::new(detector).run());
        for _ in 0..200 {
            if context.foreground().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        task.abort();

        assert_eq!(context.foreground().as_deref(), Some(&window));
    }
}
