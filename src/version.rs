// Build-time identity reported by GET /version

/// Crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name from Cargo.toml.
pub const NAME: &str = env!("CARGO_PKG_NAME");
