use crate::config::{Config, ScrollParams};
use crate::debug_if_enabled;
use crate::events::{direction_of, Axis, HookDecision, ScrollEvent, WheelInput};
use crate::services::animation::{AccelerationState, AxisAnimator, PushOutcome, LOCK_BUDGET};
use crate::services::blacklist::{BlacklistMatcher, ProcessResolver};
use crate::services::{EngineContext, ScrollSink};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Порог, после которого обработка события считается медленной
const SLOW_DISPATCH: Duration = Duration::from_millis(1);

/// Почему событие колеса пропускается без сглаживания
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    Disabled,
    ZoomModifier,
    Blacklisted,
}

impl fmt::Display for BypassReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            BypassReason::Disabled => "движок выключен",
            BypassReason::ZoomModifier => "зажат модификатор масштабирования",
            BypassReason::Blacklisted => "программа в чёрном списке",
        };
        f.write_str(reason)
    }
}

/// Точка входа для каждого события колеса.
///
/// Вызывается синхронно из потока перехвата и никогда не блокируется дольше
/// бюджета блокировки оси: при любой заминке событие пробрасывается как есть.
pub struct HookDispatcher {
    context: Arc<EngineContext>,
    blacklist: BlacklistMatcher,
    animators: [AxisAnimator; 2],
    acceleration: [Mutex<AccelerationState>; 2],
    sink: Arc<dyn ScrollSink>,
}

impl HookDispatcher {
    pub fn new(
        context: Arc<EngineContext>,
        sink: Arc<dyn ScrollSink>,
        resolver: Arc<dyn ProcessResolver>,
    ) -> Self {
        let animators = Axis::ALL.map(|axis| AxisAnimator::new(axis, sink.clone(), context.clone()));

        Self {
            blacklist: BlacklistMatcher::new(context.clone(), resolver),
            animators,
            acceleration: [
                Mutex::new(AccelerationState::new()),
                Mutex::new(AccelerationState::new()),
            ],
            context,
            sink,
        }
    }

    pub fn context(&self) -> &Arc<EngineContext> {
        &self.context
    }

    pub fn animator(&self, axis: Axis) -> &AxisAnimator {
        &self.animators[axis.index()]
    }

    /// Имя активной программы в нижнем регистре
    pub fn foreground_process(&self) -> Option<Arc<str>> {
        self.blacklist.foreground_process()
    }

    pub fn on_wheel_event(&self, input: WheelInput) -> HookDecision {
        let started = Instant::now();
        let decision = self.dispatch(input);

        let elapsed = started.elapsed();
        if elapsed > SLOW_DISPATCH {
            warn!("Медленная обработка события колеса: {:?} ({})", elapsed, input.event());
        }
        decision
    }

    /// Причина не перехватывать колесо прямо сейчас (None - перехватывать)
    pub fn bypass_reason(&self) -> Option<BypassReason> {
        let config = self.context.config();
        self.quick_bypass(&config).or_else(|| {
            self.blacklist
                .is_blacklisted()
                .then_some(BypassReason::Blacklisted)
        })
    }

    /// Проверки, не требующие определения процесса
    fn quick_bypass(&self, config: &Config) -> Option<BypassReason> {
        if !self.context.is_enabled() {
            return Some(BypassReason::Disabled);
        }
        if self.context.modifiers().contains(config.zoom_modifiers()) {
            return Some(BypassReason::ZoomModifier);
        }
        None
    }

    fn dispatch(&self, input: WheelInput) -> HookDecision {
        let event = match input {
            WheelInput::Synthetic(_) => return HookDecision::Forward,
            WheelInput::Genuine(event) => event,
        };

        let config = self.context.config();
        if let Some(reason) = self.quick_bypass(&config) {
            debug_if_enabled!("Проброс {}: {}", event, reason);
            return HookDecision::Forward;
        }

        let process = self.blacklist.foreground_process();
        if config.has_blacklist()
            && process.as_deref().is_some_and(|name| config.is_blacklisted(name))
        {
            debug_if_enabled!("Проброс {}: {}", event, BypassReason::Blacklisted);
            return HookDecision::Forward;
        }

        if event.raw_delta == 0 {
            return HookDecision::Forward;
        }

        let axis = self.target_axis(&event, &config);
        let raw_delta = if config.scroll.reverse_direction {
            -event.raw_delta
        } else {
            event.raw_delta
        };

        let params = config.scroll_params_for(process.as_deref());
        let Some(amount) = self.scaled_amount(axis, raw_delta, event.timestamp, &params) else {
            return HookDecision::Forward;
        };

        let animator = &self.animators[axis.index()];
        let unanimated = (axis == Axis::Horizontal && !config.scroll.horizontal_smoothing)
            || animator.is_degraded();
        if unanimated {
            return self.emit_immediately(axis, amount);
        }

        match animator.push(amount, Instant::now(), params.animation) {
            PushOutcome::Accepted(outcome) => {
                debug_if_enabled!("{} → {} {:+.1} ({:?})", event, axis, amount, outcome);
                HookDecision::Suppress
            }
            PushOutcome::Busy => {
                debug_if_enabled!("Ось {} занята, проброс {}", axis, event);
                HookDecision::Forward
            }
            PushOutcome::Failed => self.emit_immediately(axis, amount),
        }
    }

    /// Shift превращает вертикальную прокрутку в горизонтальную
    fn target_axis(&self, event: &ScrollEvent, config: &Config) -> Axis {
        if event.axis == Axis::Vertical
            && config.scroll.shift_horizontal
            && self.context.modifiers().shift
        {
            Axis::Horizontal
        } else {
            event.axis
        }
    }

    /// Шаг с учётом ускорения: |raw| × направление × step × множитель
    fn scaled_amount(
        &self,
        axis: Axis,
        raw_delta: i32,
        timestamp: Instant,
        params: &ScrollParams,
    ) -> Option<f64> {
        let direction = direction_of(f64::from(raw_delta));
        let multiplier = self.acceleration[axis.index()]
            .try_lock_for(LOCK_BUDGET)?
            .compute_multiplier(timestamp, direction, &params.acceleration);

        Some(f64::from(raw_delta.unsigned_abs()) * f64::from(direction) * params.step_size * multiplier)
    }

    fn emit_immediately(&self, axis: Axis, amount: f64) -> HookDecision {
        match self.sink.try_emit(axis, amount.round() as i32, LOCK_BUDGET) {
            Ok(true) => HookDecision::Suppress,
            Ok(false) => {
                debug_if_enabled!("Устройство вывода занято, проброс прокрутки {}", axis);
                HookDecision::Forward
            }
            Err(e) => {
                warn!("Не удалось вывести прокрутку {} без анимации: {}", axis, e);
                HookDecision::Forward
            }
        }
    }

    /// Остановить все анимации без досылки остатка
    pub fn cancel_all(&self) {
        for animator in &self.animators {
            animator.cancel();
        }
    }

    /// Дождаться потоков анимации обеих осей
    pub fn join_animators(&self, deadline: Instant) -> bool {
        self.animators
            .iter()
            .fold(true, |all, animator| animator.join(deadline) && all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Modifiers, WindowInfo};
    use crate::services::test_support::{BusySink, FailingSink, FakeResolver, RecordingSink};
    use std::thread;

    struct Fixture {
        context: Arc<EngineContext>,
        sink: Arc<RecordingSink>,
        resolver: Arc<FakeResolver>,
        dispatcher: HookDispatcher,
    }

    fn fixture_with(configure: impl FnOnce(&mut Config)) -> Fixture {
        let mut config = Config::default();
        config.scroll.animation_time_ms = 20;
        config.scroll.tail_head_ratio = 0.0;
        configure(&mut config);
        config.build_optimization_indexes();

        let context = Arc::new(EngineContext::new(config));
        let sink = Arc::new(RecordingSink::default());
        let resolver = Arc::new(FakeResolver::default());
        let dispatcher = HookDispatcher::new(context.clone(), sink.clone(), resolver.clone());
        Fixture {
            context,
            sink,
            resolver,
            dispatcher,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(|_| {})
    }

    fn notch(axis: Axis, delta: i32) -> WheelInput {
        WheelInput::Genuine(ScrollEvent::new(axis, delta))
    }

    fn settle(dispatcher: &HookDispatcher) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Axis::ALL.iter().any(|&axis| dispatcher.animator(axis).is_running())
            && Instant::now() < deadline
        {
            thread::sleep(Duration::from_millis(2));
        }
        assert!(dispatcher.join_animators(deadline));
    }

    #[test]
    fn synthetic_input_is_forwarded() {
        let f = fixture();
        let input = WheelInput::Synthetic(ScrollEvent::new(Axis::Vertical, 1));
        assert_eq!(f.dispatcher.on_wheel_event(input), HookDecision::Forward);
        settle(&f.dispatcher);
        assert!(f.sink.is_empty());
    }

    #[test]
    fn genuine_notch_is_smoothed() {
        let f = fixture();
        assert_eq!(
            f.dispatcher.on_wheel_event(notch(Axis::Vertical, 1)),
            HookDecision::Suppress
        );
        settle(&f.dispatcher);
        assert_eq!(f.sink.total(Axis::Vertical), 100);
    }

    #[test]
    fn disabled_engine_forwards() {
        let f = fixture();
        f.context.set_enabled(false);
        assert_eq!(
            f.dispatcher.on_wheel_event(notch(Axis::Vertical, 1)),
            HookDecision::Forward
        );
        assert_eq!(f.dispatcher.bypass_reason(), Some(BypassReason::Disabled));
    }

    #[test]
    fn zoom_modifier_forwards_without_synthetic_output() {
        let f = fixture();
        f.context.set_modifiers(Modifiers::new().with_ctrl(true));

        for _ in 0..5 {
            assert_eq!(
                f.dispatcher.on_wheel_event(notch(Axis::Vertical, -1)),
                HookDecision::Forward
            );
        }
        settle(&f.dispatcher);
        assert!(f.sink.is_empty());
        assert_eq!(f.dispatcher.bypass_reason(), Some(BypassReason::ZoomModifier));
    }

    #[test]
    fn blacklisted_program_forwards() {
        let f = fixture_with(|config| config.blacklist = vec!["notepad.exe".to_string()]);
        f.resolver.add(42, "NOTEPAD.EXE", 1);
        f.context
            .set_foreground(Some(WindowInfo::new(1, "Untitled".to_string()).with_pid(42)));

        assert_eq!(
            f.dispatcher.on_wheel_event(notch(Axis::Vertical, 1)),
            HookDecision::Forward
        );
        assert_eq!(f.dispatcher.bypass_reason(), Some(BypassReason::Blacklisted));
        settle(&f.dispatcher);
        assert!(f.sink.is_empty());
    }

    #[test]
    fn shift_redirects_vertical_to_horizontal() {
        let f = fixture();
        f.context.set_modifiers(Modifiers::new().with_shift(true));

        f.dispatcher.on_wheel_event(notch(Axis::Vertical, 1));
        settle(&f.dispatcher);
        assert_eq!(f.sink.total(Axis::Horizontal), 100);
        assert_eq!(f.sink.total(Axis::Vertical), 0);
    }

    #[test]
    fn reverse_direction_flips_sign() {
        let f = fixture_with(|config| config.scroll.reverse_direction = true);
        f.dispatcher.on_wheel_event(notch(Axis::Vertical, 1));
        settle(&f.dispatcher);
        assert_eq!(f.sink.total(Axis::Vertical), -100);
    }

    #[test]
    fn horizontal_without_smoothing_is_emitted_at_once() {
        let f = fixture_with(|config| config.scroll.horizontal_smoothing = false);
        assert_eq!(
            f.dispatcher.on_wheel_event(notch(Axis::Horizontal, -2)),
            HookDecision::Suppress
        );
        // Без анимации - одно событие сразу, без ожидания потоков
        assert_eq!(f.sink.events(), vec![(Axis::Horizontal, -200)]);
    }

    #[test]
    fn failed_unanimated_emit_forwards() {
        let mut config = Config::default();
        config.scroll.horizontal_smoothing = false;
        let context = Arc::new(EngineContext::new(config));
        let dispatcher = HookDispatcher::new(
            context,
            Arc::new(FailingSink),
            Arc::new(FakeResolver::default()),
        );
        assert_eq!(
            dispatcher.on_wheel_event(notch(Axis::Horizontal, 1)),
            HookDecision::Forward
        );
    }

    #[test]
    fn busy_output_device_forwards_instead_of_waiting() {
        let mut config = Config::default();
        config.scroll.horizontal_smoothing = false;
        let context = Arc::new(EngineContext::new(config));
        let sink = Arc::new(BusySink::default());
        let dispatcher = HookDispatcher::new(context, sink.clone(), Arc::new(FakeResolver::default()));

        assert_eq!(
            dispatcher.on_wheel_event(notch(Axis::Horizontal, 1)),
            HookDecision::Forward
        );
        assert_eq!(sink.budgets(), vec![LOCK_BUDGET]);
    }

    #[test]
    fn app_override_changes_step() {
        let f = fixture_with(|config| {
            config.apps.push(crate::config::AppOverride {
                name: "Firefox".to_string(),
                step_size: Some(60),
                ..Default::default()
            })
        });
        f.resolver.add(7, "firefox", 1);
        f.context
            .set_foreground(Some(WindowInfo::new(3, String::new()).with_pid(7)));

        f.dispatcher.on_wheel_event(notch(Axis::Vertical, 1));
        settle(&f.dispatcher);
        assert_eq!(f.sink.total(Axis::Vertical), 60);
    }

    #[test]
    fn zero_delta_is_forwarded() {
        let f = fixture();
        assert_eq!(
            f.dispatcher.on_wheel_event(notch(Axis::Vertical, 0)),
            HookDecision::Forward
        );
        assert_eq!(f.dispatcher.bypass_reason(), None);
    }
}
