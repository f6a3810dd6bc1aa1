//! Cross-platform time utilities.
//!
//! This module provides time utilities that work on both native and WASM targets.

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Returns the current system time.
///
/// Uses `std::time::SystemTime::now()` on native and `web_time::SystemTime::now().to_std()`
/// on WASM.
#[cfg(not(target_arch = "wasm32"))]
pub fn now() -> SystemTime {
    SystemTime::now()
}

/// Returns the current system time.
///
/// Uses `std::time::SystemTime::now()` on native and `web_time::SystemTime::now().to_std()`
/// on WASM.
#[cfg(target_arch = "wasm32")]
pub fn now() -> SystemTime {
    use web_time::web::SystemTimeExt;
    web_time::SystemTime::now().to_std()
}
