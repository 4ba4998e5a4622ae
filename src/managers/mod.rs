// QuietShell state managers
// Managers handle stateful bookkeeping: loaded frames and what has been installed into them.

pub mod frame_registry;
