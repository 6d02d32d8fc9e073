mod runner;
mod shutdown;

pub use runner::{bootstrap, run, Bootstrapped, DbFactory, DbOptions, RunOptions, ShutdownOptions};
pub use shutdown::wait_for_shutdown;
