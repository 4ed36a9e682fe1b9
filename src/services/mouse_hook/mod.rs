mod dry_mouse_hook;
mod mouse_hook;
mod r#trait;
mod wheel_frame;

pub use self::dry_mouse_hook::DryRunMouseHook;
pub use self::r#trait::{create_mouse_hook, MouseHookTrait};
pub use self::wheel_frame::{EventBatch, WheelFrameDecoder};
