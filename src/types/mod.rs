// QuietShell shared type definitions
// Each submodule defines types used across the application.

pub mod errors;
pub mod frame;
pub mod settings;
pub mod signal;
