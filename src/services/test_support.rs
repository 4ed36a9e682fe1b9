//! Тестовые заглушки вывода прокрутки и резолвера процессов.

use crate::error::{Result, ScrollError};
use crate::events::Axis;
use crate::services::blacklist::{ProcessIdentity, ProcessResolver};
use crate::services::ScrollSink;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Запоминает всё, что вывели аниматоры
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(Axis, i32)>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<(Axis, i32)> {
        self.events.lock().clone()
    }

    pub fn total(&self, axis: Axis) -> i32 {
        self.events
            .lock()
            .iter()
            .filter(|(a, _)| *a == axis)
            .map(|(_, delta)| delta)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl ScrollSink for RecordingSink {
    fn emit(&self, axis: Axis, delta: i32) -> Result<()> {
        self.events.lock().push((axis, delta));
        Ok(())
    }
}

pub struct FailingSink;

impl ScrollSink for FailingSink {
    fn emit(&self, _axis: Axis, _delta: i32) -> Result<()> {
        Err(ScrollError::Internal("uinput недоступен".to_string()))
    }
}

/// Устройство, занятое дольше любого бюджета ожидания
#[derive(Default)]
pub struct BusySink {
    budgets: Mutex<Vec<Duration>>,
}

impl BusySink {
    pub fn budgets(&self) -> Vec<Duration> {
        self.budgets.lock().clone()
    }
}

impl ScrollSink for BusySink {
    fn emit(&self, _axis: Axis, _delta: i32) -> Result<()> {
        panic!("неограниченное ожидание занятого устройства");
    }

    fn try_emit(&self, _axis: Axis, _delta: i32, budget: Duration) -> Result<bool> {
        self.budgets.lock().push(budget);
        Ok(false)
    }
}

pub struct PanickingSink;

impl ScrollSink for PanickingSink {
    fn emit(&self, _axis: Axis, _delta: i32) -> Result<()> {
        panic!("сбой вывода прокрутки");
    }
}

/// Резолвер с таблицей процессов в памяти и счётчиками обращений
#[derive(Default)]
pub struct FakeResolver {
    processes: Mutex<HashMap<u32, (String, u64)>>,
    resolve_calls: AtomicUsize,
    start_time_calls: AtomicUsize,
}

impl FakeResolver {
    pub fn add(&self, pid: u32, name: &str, start_time: u64) {
        self.processes
            .lock()
            .insert(pid, (name.to_string(), start_time));
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn start_time_calls(&self) -> usize {
        self.start_time_calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, pid: u32) -> Result<(String, u64)> {
        self.processes
            .lock()
            .get(&pid)
            .cloned()
            .ok_or_else(|| ScrollError::ProcessResolution {
                pid,
                reason: "процесс не найден".to_string(),
            })
    }
}

impl ProcessResolver for FakeResolver {
    fn resolve(&self, pid: u32) -> Result<ProcessIdentity> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let (name, start_time) = self.lookup(pid)?;
        Ok(ProcessIdentity { name, start_time })
    }

    fn start_time(&self, pid: u32) -> Result<u64> {
        self.start_time_calls.fetch_add(1, Ordering::SeqCst);
        self.lookup(pid).map(|(_, start_time)| start_time)
    }
}
