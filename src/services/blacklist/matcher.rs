use super::process_resolver::ProcessResolver;
use crate::debug_if_enabled;
use crate::services::EngineContext;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Предельный размер кэша; при заполнении вытесняется половина записей
pub const CACHE_CAPACITY: usize = 128;

#[derive(Debug, Clone)]
struct CacheEntry {
    /// Имя в нижнем регистре; None - процесс определить не удалось
    name: Option<Arc<str>>,
    start_time: Option<u64>,
    /// Окно, при котором запись проверялась последний раз
    window_id: u64,
}

/// Проверка активной программы по чёрному списку.
///
/// Имена кэшируются по pid. Пока фокус остаётся на том же окне, резолвер не
/// вызывается вовсе; при смене окна запись сверяется по времени старта
/// процесса, чтобы не принять переиспользованный pid за старый процесс.
pub struct BlacklistMatcher {
    context: Arc<EngineContext>,
    resolver: Arc<dyn ProcessResolver>,
    cache: DashMap<u32, CacheEntry>,
}

impl BlacklistMatcher {
    pub fn new(context: Arc<EngineContext>, resolver: Arc<dyn ProcessResolver>) -> Self {
        Self {
            context,
            resolver,
            cache: DashMap::with_capacity(CACHE_CAPACITY),
        }
    }

    /// Активная программа в чёрном списке. Ошибка определения - "не в списке".
    pub fn is_blacklisted(&self) -> bool {
        let config = self.context.config();
        if !config.has_blacklist() {
            return false;
        }

        self.foreground_process()
            .is_some_and(|name| config.is_blacklisted(&name))
    }

    /// Имя исполняемого файла активной программы в нижнем регистре
    pub fn foreground_process(&self) -> Option<Arc<str>> {
        let window = self.context.foreground()?;
        let pid = window.pid?;
        self.lookup(pid, window.id)
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    fn lookup(&self, pid: u32, window_id: u64) -> Option<Arc<str>> {
        let cached = self
            .cache
            .get(&pid)
            .map(|entry| (entry.name.clone(), entry.start_time, entry.window_id));

        if let Some((name, start_time, cached_window)) = cached {
            if cached_window == window_id {
                return name;
            }

            if let Some(start_time) = start_time {
                if self.resolver.start_time(pid).ok() == Some(start_time) {
                    if let Some(mut entry) = self.cache.get_mut(&pid) {
                        entry.window_id = window_id;
                    }
                    return name;
                }
                debug_if_enabled!("pid {} переиспользован, запись кэша сброшена", pid);
            }
        }

        let entry = self.resolve_entry(pid, window_id);
        let name = entry.name.clone();
        self.insert(pid, entry);
        name
    }

    fn resolve_entry(&self, pid: u32, window_id: u64) -> CacheEntry {
        match self.resolver.resolve(pid) {
            Ok(identity) => CacheEntry {
                name: Some(Arc::from(identity.name.to_lowercase())),
                start_time: Some(identity.start_time),
                window_id,
            },
            Err(e) => {
                debug!("{}", e);
                CacheEntry {
                    name: None,
                    start_time: None,
                    window_id,
                }
            }
        }
    }

    fn insert(&self, pid: u32, entry: CacheEntry) {
        if self.cache.len() >= CACHE_CAPACITY && !self.cache.contains_key(&pid) {
            let victims: Vec<u32> = self
                .cache
                .iter()
                .map(|entry| *entry.key())
                .take(CACHE_CAPACITY / 2)
                .collect();
            for victim in victims {
                self.cache.remove(&victim);
            }
            debug_if_enabled!("Кэш процессов переполнен, вытеснено {} записей", CACHE_CAPACITY / 2);
        }
        self.cache.insert(pid, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::events::WindowInfo;
    use crate::services::test_support::FakeResolver;

    fn setup(blacklist: &[&str]) -> (Arc<EngineContext>, Arc<FakeResolver>, BlacklistMatcher) {
        let mut config = Config::default();
        config.blacklist = blacklist.iter().map(|s| s.to_string()).collect();
        config.build_optimization_indexes();

        let context = Arc::new(EngineContext::new(config));
        let resolver = Arc::new(FakeResolver::default());
        let matcher = BlacklistMatcher::new(context.clone(), resolver.clone());
        (context, resolver, matcher)
    }

    fn focus(context: &EngineContext, window_id: u64, pid: u32) {
        context.set_foreground(Some(WindowInfo::new(window_id, String::new()).with_pid(pid)));
    }

    #[test]
    fn blacklist_is_case_insensitive() {
        let (context, resolver, matcher) = setup(&["notepad.exe"]);
        resolver.add(100, "NOTEPAD.EXE", 1);
        focus(&context, 1, 100);

        assert!(matcher.is_blacklisted());
        assert_eq!(matcher.foreground_process().as_deref(), Some("notepad.exe"));
    }

    #[test]
    fn same_window_never_reinvokes_resolver() {
        let (context, resolver, matcher) = setup(&["kate"]);
        resolver.add(100, "firefox", 1);
        focus(&context, 1, 100);

        for _ in 0..50 {
            assert!(!matcher.is_blacklisted());
        }
        assert_eq!(resolver.resolve_calls(), 1);
        assert_eq!(resolver.start_time_calls(), 0);
    }

    #[test]
    fn window_change_checks_start_time_only() {
        let (context, resolver, matcher) = setup(&["kate"]);
        resolver.add(100, "firefox", 1);
        focus(&context, 1, 100);
        matcher.is_blacklisted();

        // Другое окно того же процесса
        focus(&context, 2, 100);
        assert!(!matcher.is_blacklisted());
        assert!(!matcher.is_blacklisted());
        assert_eq!(resolver.resolve_calls(), 1);
        assert_eq!(resolver.start_time_calls(), 1);
    }

    #[test]
    fn reused_pid_is_resolved_again() {
        let (context, resolver, matcher) = setup(&["kate"]);
        resolver.add(100, "firefox", 1);
        focus(&context, 1, 100);
        assert!(!matcher.is_blacklisted());

        // Процесс завершился, pid достался другой программе
        resolver.add(100, "Kate", 2);
        focus(&context, 2, 100);
        assert!(matcher.is_blacklisted());
        assert_eq!(resolver.resolve_calls(), 2);
    }

    #[test]
    fn resolution_failure_is_not_blacklisted_and_not_retried() {
        let (context, resolver, matcher) = setup(&["kate"]);
        focus(&context, 1, 777);

        assert!(!matcher.is_blacklisted());
        assert!(!matcher.is_blacklisted());
        assert_eq!(matcher.foreground_process(), None);
        assert_eq!(resolver.resolve_calls(), 1);

        // Смена окна - повторная попытка
        focus(&context, 2, 777);
        assert!(!matcher.is_blacklisted());
        assert_eq!(resolver.resolve_calls(), 2);
    }

    #[test]
    fn no_foreground_or_pid_is_not_blacklisted() {
        let (context, resolver, matcher) = setup(&["kate"]);
        assert!(!matcher.is_blacklisted());

        context.set_foreground(Some(WindowInfo::new(1, String::new())));
        assert!(!matcher.is_blacklisted());
        assert_eq!(resolver.resolve_calls(), 0);
    }

    #[test]
    fn cache_is_bounded() {
        let (context, resolver, matcher) = setup(&["kate"]);
        for pid in 0..(CACHE_CAPACITY as u32 * 3) {
            resolver.add(pid, "app", 1);
            focus(&context, u64::from(pid), pid);
            matcher.foreground_process();
            assert!(matcher.cached_entries() <= CACHE_CAPACITY);
        }
    }
}
