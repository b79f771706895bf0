//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module   | Commands handled          |
//! |----------|---------------------------|
//! | `build`  | `Build`                   |
//! | `names`  | `CheckName`, `Resolve`    |
//! | `probe`  | `Probe`                   |
//! | `config` | `Config`                  |

pub mod build;
pub mod config;
pub mod names;
pub mod probe;

pub use build::{BuildArgs, cmd_build};
pub use config::cmd_config;
pub use names::{cmd_check_name, cmd_resolve};
pub use probe::cmd_probe;
