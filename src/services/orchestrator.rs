use crate::config::Config;
use crate::error::{Result, ScrollError};
use crate::services::blacklist::{ProcFsResolver, ProcessResolver};
use crate::services::keyboard_listener::KeyboardListenerTrait;
use crate::services::mouse_hook::MouseHookTrait;
use crate::services::window_detector::WindowDetectorTrait;
use crate::services::{
    create_keyboard_listener, create_mouse_hook, create_window_detector, EngineContext,
    HookDispatcher, ScrollSink, VirtualMouse,
};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{error, info, warn};

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Собранные, но ещё не запущенные части движка
pub struct EngineComponents {
    pub context: Arc<EngineContext>,
    pub sink: Arc<dyn ScrollSink>,
    pub resolver: Arc<dyn ProcessResolver>,
    pub mouse_hook: Box<dyn MouseHookTrait>,
    pub keyboard_listener: Box<dyn KeyboardListenerTrait + Send>,
    pub window_detector: Box<dyn WindowDetectorTrait + Send>,
}

impl EngineComponents {
    /// Создаёт единую виртуальную мышь и передаёт её перехвату и аниматорам
    pub fn build(config: Config, dry_run: bool) -> Result<Self> {
        let context = Arc::new(EngineContext::new(config));
        let config = context.config();

        let virtual_mouse = Arc::new(VirtualMouse::new(
            &config.input.virtual_device_name,
            dry_run,
        )?);
        let mouse_hook = create_mouse_hook(&config, context.clone(), virtual_mouse.clone(), dry_run)?;
        let keyboard_listener = create_keyboard_listener(&config, context.clone(), dry_run)?;
        let window_detector = create_window_detector(&config, context.clone(), dry_run)?;

        info!("Все компоненты инициализированы");

        Ok(Self {
            context,
            sink: virtual_mouse,
            resolver: Arc::new(ProcFsResolver::new()),
            mouse_hook,
            keyboard_listener,
            window_detector,
        })
    }
}

/// Запущенный движок: поток перехвата колеса, задачи клавиатуры и детекции окон
pub struct ScrollEngine {
    context: Arc<EngineContext>,
    dispatcher: Arc<HookDispatcher>,
    shutdown_tx: watch::Sender<bool>,
    pump_thread: Option<JoinHandle<()>>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl ScrollEngine {
    /// Устанавливает перехват синхронно и запускает остальные сервисы.
    /// Должен вызываться внутри tokio runtime.
    pub fn start(components: EngineComponents) -> Result<Self> {
        let EngineComponents {
            context,
            sink,
            resolver,
            mut mouse_hook,
            keyboard_listener,
            window_detector,
        } = components;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ScrollError::Internal(format!("Нет активного tokio runtime: {}", e)))?;

        mouse_hook.install()?;

        let dispatcher = Arc::new(HookDispatcher::new(context.clone(), sink, resolver));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let pump_dispatcher = dispatcher.clone();
        let pump_thread = thread::Builder::new()
            .name("scroll-pump".into())
            .spawn(move || Self::run_pump(mouse_hook, pump_dispatcher, shutdown_rx))
            .map_err(|e| ScrollError::Internal(format!("Не удалось запустить поток перехвата: {}", e)))?;

        let keyboard_handle = runtime.spawn(async move {
            if let Err(e) = keyboard_listener.run().await {
                error!("Ошибка в KeyboardListener: {}", e);
            }
        });
        let window_handle = runtime.spawn(async move {
            if let Err(e) = window_detector.run().await {
                error!("Ошибка в WindowDetector: {}", e);
            }
        });

        info!("Все сервисы запущены");

        Ok(Self {
            context,
            dispatcher,
            shutdown_tx,
            pump_thread: Some(pump_thread),
            tasks: vec![keyboard_handle, window_handle],
        })
    }

    /// Цикл перехвата живёт в собственном однопоточном runtime
    fn run_pump(
        hook: Box<dyn MouseHookTrait>,
        dispatcher: Arc<HookDispatcher>,
        shutdown_rx: watch::Receiver<bool>,
    ) {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("Не удалось создать runtime потока перехвата: {}", e);
                return;
            }
        };

        if let Err(e) = runtime.block_on(hook.pump(dispatcher, shutdown_rx)) {
            error!("Ошибка в цикле перехвата колеса: {}", e);
        }
    }

    pub fn context(&self) -> &Arc<EngineContext> {
        &self.context
    }

    pub fn dispatcher(&self) -> &Arc<HookDispatcher> {
        &self.dispatcher
    }

    pub fn is_enabled(&self) -> bool {
        self.context.is_enabled()
    }

    /// Возвращает предыдущее состояние
    pub fn set_enabled(&self, enabled: bool) -> bool {
        let previous = self.context.set_enabled(enabled);
        if previous != enabled {
            info!("Плавная прокрутка {}", if enabled { "включена" } else { "выключена" });
        }
        previous
    }

    /// Возвращает новое состояние
    pub fn toggle(&self) -> bool {
        let enabled = self.context.toggle();
        info!("Плавная прокрутка {}", if enabled { "включена" } else { "выключена" });
        enabled
    }

    pub fn update_config(&self, config: Config) -> Result<()> {
        self.context.update_config(config)
    }

    /// Имя программы активного окна в нижнем регистре
    pub fn foreground_program_name(&self) -> Option<String> {
        self.dispatcher.foreground_process().map(|name| name.to_string())
    }

    pub fn is_hook_degraded(&self) -> bool {
        self.context.is_hook_degraded()
    }

    /// Останавливает все сервисы. `false` - что-то не завершилось за `timeout`.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        let Some(pump_thread) = self.pump_thread.take() else {
            return true;
        };
        info!("Завершение работы движка...");
        let deadline = Instant::now() + timeout;

        self.context.request_shutdown();
        // Получатель мог уже завершиться вместе с циклом перехвата
        let _ = self.shutdown_tx.send(true);
        self.dispatcher.cancel_all();

        for task in self.tasks.drain(..) {
            task.abort();
        }

        let pump_stopped = Self::join_until(pump_thread, deadline);
        let animators_stopped = self.dispatcher.join_animators(deadline);

        if pump_stopped && animators_stopped {
            info!("Все сервисы завершили работу корректно");
        } else {
            warn!("Таймаут при завершении сервисов");
        }
        pump_stopped && animators_stopped
    }

    fn join_until(handle: JoinHandle<()>, deadline: Instant) -> bool {
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!("Поток перехвата не завершился вовремя");
                return false;
            }
            thread::sleep(JOIN_POLL_INTERVAL);
        }

        if handle.join().is_err() {
            error!("Поток перехвата завершился паникой");
        }
        true
    }
}

impl Drop for ScrollEngine {
    fn drop(&mut self) {
        if self.pump_thread.is_some() {
            self.stop(Duration::from_secs(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Axis, ScrollEvent, WheelInput, WindowInfo};
    use crate::services::mouse_hook::DryRunMouseHook;
    use crate::services::test_support::{FakeResolver, RecordingSink};

    /// Детектор, который ничего не публикует: фокус задаёт сам тест
    struct IdleDetector;

    #[async_trait::async_trait]
    impl WindowDetectorTrait for IdleDetector {
        async fn run(self: Box<Self>) -> Result<()> {
            std::future::pending().await
        }
    }

    fn components(sink: Arc<RecordingSink>, resolver: Arc<FakeResolver>) -> EngineComponents {
        let mut config = Config::default();
        config.scroll.animation_time_ms = 20;
        config.blacklist = vec!["kate".to_string()];
        config.build_optimization_indexes();
        let context = Arc::new(EngineContext::new(config));
        let config = context.config();

        EngineComponents {
            context: context.clone(),
            sink,
            resolver,
            mouse_hook: Box::new(DryRunMouseHook::new()),
            keyboard_listener: create_keyboard_listener(&config, context.clone(), true).unwrap(),
            window_detector: Box::new(IdleDetector),
        }
    }

    #[test]
    fn start_outside_runtime_is_an_error() {
        let sink = Arc::new(RecordingSink::default());
        let resolver = Arc::new(FakeResolver::default());
        let result = ScrollEngine::start(components(sink, resolver));
        assert!(matches!(result, Err(ScrollError::Internal(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn engine_toggles_and_stops() {
        let sink = Arc::new(RecordingSink::default());
        let resolver = Arc::new(FakeResolver::default());
        let mut engine = ScrollEngine::start(components(sink, resolver)).unwrap();

        assert!(engine.is_enabled());
        assert!(!engine.toggle());
        assert!(!engine.set_enabled(true));
        assert!(engine.is_enabled());

        assert!(engine.stop(Duration::from_secs(5)));
        assert!(engine.context().is_shutdown());
        // Повторная остановка ничего не делает
        assert!(engine.stop(Duration::from_secs(1)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn foreground_program_name_is_lowercased() {
        let sink = Arc::new(RecordingSink::default());
        let resolver = Arc::new(FakeResolver::default());
        resolver.add(42, "Kate", 7);
        let mut engine = ScrollEngine::start(components(sink, resolver)).unwrap();

        engine
            .context()
            .set_foreground(Some(WindowInfo::new(900, String::new()).with_pid(42)));
        assert_eq!(engine.foreground_program_name().as_deref(), Some("kate"));

        let decision = engine
            .dispatcher()
            .on_wheel_event(WheelInput::Genuine(ScrollEvent::new(Axis::Vertical, 1)));
        assert_eq!(decision, crate::events::HookDecision::Forward);

        assert!(engine.stop(Duration::from_secs(5)));
    }
}
