use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BASE_MAP_SVG: &str = "assets/world.svg";
pub const DEFAULT_BROADCAST_BUFFER: usize = 256;
pub const DEFAULT_DOCUMENT_RELOAD_SECS: u64 = 5;
pub const SSE_KEEPALIVE_SECS: u64 = 15;

pub fn server_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_PORT)
}

/// Path of the base map document.
pub fn base_map_svg() -> PathBuf {
    std::env::var("BASE_MAP_SVG")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_MAP_SVG))
}

/// Optional JSON object of country code -> display name.
pub fn country_names_path() -> Option<PathBuf> {
    std::env::var("COUNTRY_NAMES_PATH")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

pub fn sse_broadcast_buffer() -> usize {
    std::env::var("SSE_BROADCAST_BUFFER")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_BROADCAST_BUFFER)
}

pub fn document_reload_interval() -> Duration {
    std::env::var("DOCUMENT_RELOAD_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_DOCUMENT_RELOAD_SECS))
}
