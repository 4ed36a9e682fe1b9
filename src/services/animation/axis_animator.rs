use super::axis_motion::{AxisMotion, StartOutcome};
use crate::config::AnimationParams;
use crate::error::{Result, ScrollError};
use crate::events::Axis;
use crate::services::{EngineContext, ScrollSink};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Период такта анимации (240 Гц)
pub const TICK_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 240);

/// Сколько диспетчер готов ждать блокировку оси
pub const LOCK_BUDGET: Duration = Duration::from_micros(500);

/// Результат передачи шага аниматору
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Accepted(StartOutcome),
    /// Блокировка оси не получена за отведённое время
    Busy,
    /// Рабочий поток не запустился, ось помечена деградированной
    Failed,
}

/// Аниматор одной оси: владеет состоянием движения и рабочими потоками.
pub struct AxisAnimator {
    axis: Axis,
    motion: Arc<Mutex<AxisMotion>>,
    sink: Arc<dyn ScrollSink>,
    context: Arc<EngineContext>,
    degraded: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl AxisAnimator {
    pub fn new(axis: Axis, sink: Arc<dyn ScrollSink>, context: Arc<EngineContext>) -> Self {
        Self {
            axis,
            motion: Arc::new(Mutex::new(AxisMotion::new())),
            sink,
            context,
            degraded: Arc::new(AtomicBool::new(false)),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.motion.lock().is_running()
    }

    /// Добавить шаг к анимации оси (старт, продление или смена направления)
    pub fn push(&self, increment: f64, now: Instant, params: AnimationParams) -> PushOutcome {
        let Some(mut motion) = self.motion.try_lock_for(LOCK_BUDGET) else {
            return PushOutcome::Busy;
        };

        let outcome = motion.start(increment, now, params);
        if outcome != StartOutcome::Started {
            return PushOutcome::Accepted(outcome);
        }

        let generation = motion.generation();
        drop(motion);

        match self.spawn_worker(generation) {
            Ok(()) => PushOutcome::Accepted(outcome),
            Err(e) => {
                error!("Не удалось запустить поток анимации {}: {}", self.axis, e);
                let mut motion = self.motion.lock();
                self.degraded.store(true, Ordering::Release);
                if motion.generation() == generation {
                    motion.cancel();
                }
                PushOutcome::Failed
            }
        }
    }

    fn spawn_worker(&self, generation: u64) -> Result<()> {
        let worker = Worker {
            axis: self.axis,
            generation,
            motion: Arc::clone(&self.motion),
            sink: Arc::clone(&self.sink),
            context: Arc::clone(&self.context),
        };
        let degraded = Arc::clone(&self.degraded);

        let handle = thread::Builder::new()
            .name(format!("scroll-{}", self.axis))
            .spawn(move || worker.run_isolated(&degraded))?;

        let mut workers = self.workers.lock();
        workers.retain(|handle| !handle.is_finished());
        workers.push(handle);
        Ok(())
    }

    /// Остановить движение без досылки остатка
    pub fn cancel(&self) {
        let mut motion = self.motion.lock();
        if motion.is_running() {
            debug!("Анимация {} отменена", self.axis);
        }
        motion.cancel();
    }

    /// Дождаться завершения рабочих потоков до `deadline`; false - не успели
    pub fn join(&self, deadline: Instant) -> bool {
        let mut workers = std::mem::take(&mut *self.workers.lock());

        while !workers.is_empty() {
            let (finished, pending): (Vec<_>, Vec<_>) =
                workers.into_iter().partition(|handle| handle.is_finished());
            for handle in finished {
                let _ = handle.join();
            }
            workers = pending;

            if workers.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                warn!(
                    "Потоки анимации {} не завершились вовремя ({} осталось)",
                    self.axis,
                    workers.len()
                );
                self.workers.lock().extend(workers);
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

/// Рабочий поток анимации одного запуска
struct Worker {
    axis: Axis,
    generation: u64,
    motion: Arc<Mutex<AxisMotion>>,
    sink: Arc<dyn ScrollSink>,
    context: Arc<EngineContext>,
}

impl Worker {
    /// Сбой потока не выходит за пределы оси: ось переходит на вывод без анимации
    fn run_isolated(self, degraded: &AtomicBool) {
        let axis = self.axis;
        let generation = self.generation;
        let motion = Arc::clone(&self.motion);

        let failure = match panic::catch_unwind(AssertUnwindSafe(|| self.run())) {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(_) => Some(ScrollError::AnimatorThread {
                axis: axis.name(),
                reason: "паника в потоке анимации".to_string(),
            }),
        };

        if let Some(e) = failure {
            error!("{}; ось переведена в режим без анимации", e);
            let mut motion = motion.lock();
            degraded.store(true, Ordering::Release);
            // Ось могла уже начать новый запуск со своим потоком
            if motion.generation() == generation {
                motion.cancel();
            }
        }
    }

    fn run(&self) -> Result<()> {
        debug!("Поток анимации {} запущен (запуск #{})", self.axis, self.generation);

        loop {
            thread::sleep(TICK_INTERVAL);

            let tick = {
                let mut motion = self.motion.lock();
                if motion.generation() != self.generation || !motion.is_running() {
                    return Ok(());
                }
                if self.context.is_shutdown() || !self.context.is_enabled() {
                    motion.cancel();
                    return Ok(());
                }
                motion.tick(Instant::now())
            };

            if tick.delta != 0 {
                self.sink
                    .emit(self.axis, tick.delta)
                    .map_err(|e| ScrollError::AnimatorThread {
                        axis: self.axis.name(),
                        reason: e.to_string(),
                    })?;
            }

            if tick.finished {
                crate::trace_if_enabled!("Анимация {} завершена", self.axis);
                return Ok(());
            }
        }
    }
}
