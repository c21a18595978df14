// All cleaning logic is in fundscrub-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod config_locator;

// Re-export core types for convenience
pub use fundscrub_core::*;

// Re-export CLI utilities
pub use config_locator::{ConfigLocator, ConfigSource};
