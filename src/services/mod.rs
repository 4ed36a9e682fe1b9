pub mod animation;
pub mod blacklist;
pub mod engine_context;
pub mod hook_dispatcher;
pub mod keyboard_listener;
pub mod mouse_hook;
pub mod orchestrator;
pub mod virtual_device;
pub mod window_detector;

#[cfg(test)]
pub(crate) mod test_support;

pub use engine_context::EngineContext;
pub use hook_dispatcher::{BypassReason, HookDispatcher};
pub use keyboard_listener::create_keyboard_listener;
pub use mouse_hook::create_mouse_hook;
pub use orchestrator::{EngineComponents, ScrollEngine};
pub use virtual_device::{ScrollSink, VirtualMouse, HI_RES_PER_NOTCH};
pub use window_detector::create_window_detector;
