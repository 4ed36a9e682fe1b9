//! Системная плавная прокрутка колесом мыши для Linux.
//!
//! Физическая мышь захватывается через evdev, события колеса проходят через
//! [`services::HookDispatcher`], а сглаженное движение синтезируется
//! аниматорами осей и выводится через виртуальное uinput-устройство.

pub mod config;
pub mod error;
pub mod events;
pub mod mappings;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{Result, ScrollError};
pub use services::{EngineComponents, EngineContext, HookDispatcher, ScrollEngine};
