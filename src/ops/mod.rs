//! High-level operations.
//!
//! This module contains the implementation of Berth commands.

pub mod berth_add;
pub mod berth_develop;
pub mod berth_fmt;
pub mod berth_init;
pub mod berth_update;
pub mod evaluate;
pub mod inputs;
pub mod lockfile;
pub mod resolve;

pub use berth_add::{add_input, parse_follows, remove_input, AddOptions};
pub use berth_develop::{dev_shell, develop, format_dev_env, shell_env, DevelopOptions};
pub use berth_fmt::{check, fmt, FmtOptions};
pub use berth_init::{init_project, InitOptions};
pub use berth_update::{diff_lockfiles, update, LockChange, UpdateOptions, UpdateResult};
pub use evaluate::{evaluate, evaluate_with_progress, EvalOptions, EvalProgress};
pub use inputs::{format_input_tree, input_tree_json};
pub use lockfile::{load_lockfile, save_lockfile};
pub use resolve::{resolve_workspace, resolve_workspace_with_opts, Resolution, ResolveOptions};
