//! Built-in handlers and their registration.

mod execute;
#[cfg(test)]
mod execute_test;
mod log;

use crate::handler::HandlerCatalog;
use crate::registry::{HandlerRegistry, Provides};

pub use execute::ExecuteHandler;
pub use log::LogHandler;

pub const LOG_HANDLER: &str = "log";
pub const EXECUTE_HANDLER: &str = "execute";

/// Registers the built-in handlers as canonical entries for their unit types
/// and adds their implementations to `catalog`. Hosts lock the registry
/// afterwards.
pub fn register_builtins(registry: &mut HandlerRegistry, catalog: &mut HandlerCatalog) {
  registry.register(Provides::new("log", LOG_HANDLER).canonical(true));
  registry.register(Provides::new("execute", EXECUTE_HANDLER).canonical(true));
  catalog.insert(LOG_HANDLER, LogHandler);
  catalog.insert(EXECUTE_HANDLER, ExecuteHandler);
}
