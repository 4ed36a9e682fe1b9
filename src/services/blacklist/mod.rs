//! Определение активной программы и проверка по чёрному списку.

mod matcher;
mod process_resolver;

pub use matcher::{BlacklistMatcher, CACHE_CAPACITY};
pub use process_resolver::{parse_start_time, ProcFsResolver, ProcessIdentity, ProcessResolver};
