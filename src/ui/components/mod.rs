mod command_input;
mod confirm;
mod form;
mod input;
mod key_result;
mod picker;
mod prompt;
mod search_input;
mod toast;

pub use command_input::{CommandEvent, CommandInput};
pub use confirm::{ConfirmDialog, ConfirmEvent};
pub use form::{FieldKind, Form, FormEvent, FormValues, ValidationError};
pub use key_result::KeyResult;
pub use picker::{Picker, PickerEvent};
pub use prompt::{Prompt, PromptEvent};
pub use search_input::SearchInput;
pub use toast::Notifier;
