//! Слушатель клавиатуры: публикует зажатые модификаторы и переключает
//! движок горячей клавишей. Клавиатура не захватывается - события
//! продолжают идти в систему как обычно.

mod dry_keyboard_listener;
mod keyboard_listener;
mod modifier_state;
mod r#trait;

pub use self::modifier_state::ModifierState;
pub use self::r#trait::{create_keyboard_listener, KeyboardListenerTrait};
