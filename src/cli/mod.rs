mod command;
mod runner;
mod util;

pub use command::Command;
pub use runner::{OutputMode, RunOutput, run, run_with_format};
pub use util::{parse_output_mode, password_from_env, read_message, resolve_password};
