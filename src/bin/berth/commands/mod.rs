//! Command implementations

pub mod add;
pub mod check;
pub mod completions;
pub mod develop;
pub mod fmt;
pub mod init;
pub mod inputs;
pub mod lock;
pub mod print_dev_env;
pub mod remove;
pub mod show;
pub mod update;
