pub mod console;
pub mod dialogs;
pub mod shortcuts;

pub use console::{render_event_log, ConsoleAction, ConsoleWindow};
pub use dialogs::FileDialogs;
pub use shortcuts::{AboutDialog, ShortcutAction, ShortcutManager};
