pub mod agent_modules;
pub mod web;

/// Build version, taken from `APP_VERSION` at compile time when the release pipeline sets it.
pub const VERSION: &str = match option_env!("APP_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};
