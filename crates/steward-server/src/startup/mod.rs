//! Server startup: logging, service assembly and shutdown handling

mod logging;
mod services;
mod shutdown;

pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};
pub use services::{StewardServices, build_services};
pub use shutdown::shutdown_signal;
