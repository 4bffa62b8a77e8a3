// Build-time version from Cargo.toml

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Dashboard title line, e.g. ` dockdash 0.4.0`.
pub fn title() -> String {
    format!(" {NAME} {VERSION}")
}
