//! CLI command handlers. Each command is in its own file.

mod add;
mod clear;
mod lock;
mod remove;
mod restart;
mod run;
mod status;

pub use add::run_add;
pub use clear::run_clear;
pub use lock::{run_lock, run_unlock};
pub use remove::run_remove;
pub use restart::run_restart;
pub use run::run_run;
pub use status::run_status;
