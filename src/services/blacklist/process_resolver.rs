use crate::error::{Result, ScrollError};
use std::fs;
use std::path::{Path, PathBuf};

/// Имя исполняемого файла процесса и его время старта
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub name: String,
    /// Время старта в тиках с загрузки системы; отличает переиспользованный pid
    pub start_time: u64,
}

/// Определение процесса по pid
pub trait ProcessResolver: Send + Sync {
    fn resolve(&self, pid: u32) -> Result<ProcessIdentity>;

    /// Дешёвая проверка идентичности без чтения имени
    fn start_time(&self, pid: u32) -> Result<u64>;
}

/// Резолвер на основе /proc
pub struct ProcFsResolver {
    root: PathBuf,
}

impl Default for ProcFsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcFsResolver {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn process_dir(&self, pid: u32) -> PathBuf {
        self.root.join(pid.to_string())
    }

    fn image_name(dir: &Path) -> Option<String> {
        let exe = fs::read_link(dir.join("exe")).ok()?;
        let name = exe.file_name()?.to_string_lossy();
        let name = name.strip_suffix(" (deleted)").unwrap_or(&*name).trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    fn comm_name(dir: &Path) -> Option<String> {
        let comm = fs::read_to_string(dir.join("comm")).ok()?;
        let comm = comm.trim();
        (!comm.is_empty()).then(|| comm.to_string())
    }
}

impl ProcessResolver for ProcFsResolver {
    fn resolve(&self, pid: u32) -> Result<ProcessIdentity> {
        let start_time = self.start_time(pid)?;
        let dir = self.process_dir(pid);

        // exe недоступен для чужих процессов - тогда имя из comm
        let name = Self::image_name(&dir)
            .or_else(|| Self::comm_name(&dir))
            .ok_or_else(|| ScrollError::ProcessResolution {
                pid,
                reason: "имя процесса недоступно".to_string(),
            })?;

        Ok(ProcessIdentity { name, start_time })
    }

    fn start_time(&self, pid: u32) -> Result<u64> {
        let stat = fs::read_to_string(self.process_dir(pid).join("stat")).map_err(|e| {
            ScrollError::ProcessResolution {
                pid,
                reason: e.to_string(),
            }
        })?;

        parse_start_time(&stat).ok_or_else(|| ScrollError::ProcessResolution {
            pid,
            reason: "неожиданный формат stat".to_string(),
        })
    }
}

/// Поле 22 (starttime) из /proc/<pid>/stat.
///
/// Имя процесса в скобках может содержать пробелы и скобки, поэтому
/// счёт полей идёт от последней `)`.
pub fn parse_start_time(stat: &str) -> Option<u64> {
    let after_comm = &stat[stat.rfind(')')? + 1..];
    // После comm идёт поле 3 (state), значит starttime - 20-е по счёту
    after_comm.split_whitespace().nth(19)?.parse().ok()
}
