pub mod keyboard;
pub mod wheel;
pub mod window;

pub use keyboard::{Hotkey, KeyCode, KeyEvent, KeyState, Modifiers};
pub use wheel::{direction_of, Axis, HookDecision, ScrollEvent, WheelInput};
pub use window::WindowInfo;
