use crate::config::Config;
use crate::error::{Result, ScrollError};
use crate::scroll_error;
use crate::services::{EngineContext, HookDispatcher, VirtualMouse};
use crate::utils::DeviceFinder;
use evdev::{Device, EventType, InputEvent, SynchronizationCode};
use smallvec::SmallVec;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::r#trait::MouseHookTrait;
use super::wheel_frame::WheelFrameDecoder;

/// Первая пауза перед повторным захватом, далее удваивается
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_REINSTALL_ATTEMPTS: u32 = 5;

/// Перехват колеса через эксклюзивный захват (EVIOCGRAB) физической мыши.
///
/// Все события мыши, кроме поглощённых щелчков колеса, пробрасываются через
/// виртуальную мышь без изменений.
pub struct RealMouseHook {
    device_path: PathBuf,
    device: Option<Device>,
    context: Arc<EngineContext>,
    virtual_mouse: Arc<VirtualMouse>,
    synthetic: bool,
}

impl RealMouseHook {
    pub fn new(
        config: &Config,
        context: Arc<EngineContext>,
        virtual_mouse: Arc<VirtualMouse>,
    ) -> Result<Self> {
        info!("Инициализация RealMouseHook");

        let device_path = DeviceFinder::find_mouse_device(
            &config.input.mouse_device_path,
            virtual_mouse.device_name(),
        )?;

        Ok(Self {
            device_path,
            device: None,
            context,
            virtual_mouse,
            synthetic: false,
        })
    }

    fn open_and_grab(device_path: &Path) -> Result<Device> {
        let mut device = Device::open(device_path).map_err(|e| {
            scroll_error!(
                hook_registration,
                "Не удалось открыть устройство {:?}: {}",
                device_path,
                e
            )
        })?;

        if let Err(e) = device.grab() {
            Self::log_grab_error(device_path, &e);
            return Err(scroll_error!(
                hook_registration,
                "Не удалось захватить устройство эксклюзивно: {}",
                e
            ));
        }

        Self::log_grabbed_device(&device);
        Ok(device)
    }

    async fn run(
        mut self,
        dispatcher: Arc<HookDispatcher>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut device = match self.device.take() {
            Some(device) => device,
            None => Self::open_and_grab(&self.device_path)?,
        };
        let mut decoder = WheelFrameDecoder::new(self.synthetic);

        info!("RealMouseHook запущен, начинаем чтение событий");

        loop {
            match self
                .pump_device(device, &dispatcher, &mut decoder, &mut shutdown)
                .await
            {
                Ok(()) => {
                    info!("Освобождение захваченной мыши");
                    return Ok(());
                }
                Err(e) if e.is_recoverable() => {
                    warn!("Перехват колеса неожиданно снят: {}", e);
                    let restored = regrab_with_backoff(&self.context, &mut shutdown, || {
                        Self::open_and_grab(&self.device_path)
                    })
                    .await?;
                    match restored {
                        Some(restored) => device = restored,
                        None => return Ok(()),
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Чтение кадров до SYN_REPORT; ошибка чтения означает потерю перехвата
    async fn pump_device(
        &self,
        device: Device,
        dispatcher: &HookDispatcher,
        decoder: &mut WheelFrameDecoder,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        let mut stream = device
            .into_event_stream()
            .map_err(|e| ScrollError::HookRemoved(e.to_string()))?;
        let mut frame: SmallVec<[InputEvent; 16]> = SmallVec::new();

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(());
                    }
                }
                event = stream.next_event() => {
                    let event = event.map_err(|e| ScrollError::HookRemoved(e.to_string()))?;

                    if event.event_type() != EventType::SYNCHRONIZATION {
                        frame.push(event);
                    } else if event.code() == SynchronizationCode::SYN_REPORT.0 {
                        self.flush_frame(&frame, dispatcher, decoder);
                        frame.clear();
                    } else if event.code() == SynchronizationCode::SYN_DROPPED.0 {
                        // Ядро потеряло часть событий - незавершённый кадр недостоверен
                        frame.clear();
                    }
                }
            }
        }
    }

    fn flush_frame(&self, frame: &[InputEvent], dispatcher: &HookDispatcher, decoder: &mut WheelFrameDecoder) {
        let forward = decoder.decode(
            frame,
            |input| dispatcher.on_wheel_event(input),
            || dispatcher.bypass_reason().is_some(),
        );

        if forward.is_empty() {
            return;
        }
        if let Err(e) = self.virtual_mouse.forward(&forward) {
            warn!("Не удалось пробросить события мыши: {}", e);
        }
    }

    fn log_grabbed_device(device: &Device) {
        info!("Мышь: {}", device.name().unwrap_or("Unknown"));
        info!("Физический путь: {:?}", device.physical_path());
        info!("Устройство захвачено эксклюзивно");
    }

    fn log_grab_error(device_path: &Path, e: &std::io::Error) {
        warn!(
            "Не удалось захватить устройство {}: {}",
            device_path.display(),
            e
        );
        warn!("Возможно, мышь уже захвачена другой программой (другой экземпляр smooth-scroll?)");
        warn!("Проверьте членство в группе input: sudo usermod -a -G input $USER");
    }
}

/// Повторный захват с экспоненциальной паузой; None - пришёл сигнал остановки
async fn regrab_with_backoff<T>(
    context: &EngineContext,
    shutdown: &mut watch::Receiver<bool>,
    mut grab: impl FnMut() -> Result<T>,
) -> Result<Option<T>> {
    let mut delay = INITIAL_BACKOFF;

    for attempt in 1..=MAX_REINSTALL_ATTEMPTS {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => return Ok(None),
        }

        match grab() {
            Ok(device) => {
                info!("Перехват колеса восстановлен (попытка {})", attempt);
                context.set_hook_degraded(false);
                return Ok(Some(device));
            }
            Err(e) => {
                warn!(
                    "Попытка {}/{} восстановить перехват не удалась: {}",
                    attempt, MAX_REINSTALL_ATTEMPTS, e
                );
                delay *= 2;
            }
        }
    }

    context.set_hook_degraded(true);
    error!("Перехват колеса потерян, прокрутка работает без сглаживания");
    Err(scroll_error!(hook_removed, "попытки восстановления исчерпаны"))
}

#[async_trait::async_trait]
impl MouseHookTrait for RealMouseHook {
    fn install(&mut self) -> Result<()> {
        let device = Self::open_and_grab(&self.device_path)?;
        self.synthetic = device.name() == Some(self.virtual_mouse.device_name());
        if self.synthetic {
            warn!("Захвачено собственное виртуальное устройство - события колеса будут пробрасываться");
        }
        self.device = Some(device);
        Ok(())
    }

    async fn pump(
        self: Box<Self>,
        dispatcher: Arc<HookDispatcher>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        (*self).run(dispatcher, shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn busy() -> ScrollError {
        scroll_error!(hook_registration, "устройство занято")
    }

    #[tokio::test(start_paused = true)]
    async fn regrab_gives_up_after_doubling_pauses() {
        let context = EngineContext::default();
        let (_shutdown_tx, mut shutdown) = watch::channel(false);
        let started = Instant::now();
        let mut attempts = 0;

        let result = regrab_with_backoff(&context, &mut shutdown, || {
            attempts += 1;
            Err::<(), _>(busy())
        })
        .await;

        assert!(matches!(result, Err(ScrollError::HookRemoved(_))));
        assert_eq!(attempts, MAX_REINSTALL_ATTEMPTS);
        assert!(context.is_hook_degraded());
        // 100 + 200 + 400 + 800 + 1600 мс
        assert!(started.elapsed() >= Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn regrab_success_clears_degraded_flag() {
        let context = EngineContext::default();
        context.set_hook_degraded(true);
        let (_shutdown_tx, mut shutdown) = watch::channel(false);
        let mut attempts = 0;

        let result = regrab_with_backoff(&context, &mut shutdown, || {
            attempts += 1;
            if attempts < 3 {
                Err(busy())
            } else {
                Ok(attempts)
            }
        })
        .await;

        assert!(matches!(result, Ok(Some(3))));
        assert_eq!(attempts, 3);
        assert!(!context.is_hook_degraded());
    }

    #[tokio::test(start_paused = true)]
    async fn regrab_stops_on_shutdown() {
        let context = EngineContext::default();
        let (shutdown_tx, mut shutdown) = watch::channel(false);
        shutdown_tx.send(true).unwrap();
        let mut attempts = 0;

        let result = regrab_with_backoff(&context, &mut shutdown, || {
            attempts += 1;
            Err::<(), _>(busy())
        })
        .await;

        assert!(matches!(result, Ok(None)));
        assert_eq!(attempts, 0);
        assert!(!context.is_hook_degraded());
    }
}
