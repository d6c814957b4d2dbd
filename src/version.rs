/// Reported by `--version`: `APP_VERSION` when set at build time, the package version otherwise.
pub const VERSION: &str = match option_env!("APP_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};
