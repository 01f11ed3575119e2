//! Human-scaled rendering of telemetry values

/// Bandwidth units, one step per factor of 1000
pub const BANDWIDTH_UNITS: [&str; 4] = ["bit", "Kbit", "Mbit", "Gbit"];

/// Time units, one step per factor of 1000
pub const TIME_UNITS: [&str; 3] = ["us", "ms", "s"];

/// Divide by 1000 while the value stays at or above 1000 and a larger
/// unit exists, then print with three decimals.
pub fn scale(value: f64, units: &[&str]) -> String {
    let mut value = value;
    let mut idx = 0;
    while value >= 1000.0 && idx + 1 < units.len() {
        value /= 1000.0;
        idx += 1;
    }
    format!("{:.3}{}", value, units.get(idx).copied().unwrap_or_default())
}

/// Bandwidth in bits per second, human-scaled
pub fn visual_bandwidth(bits_per_sec: u64) -> String {
    scale(bits_per_sec as f64, &BANDWIDTH_UNITS)
}

/// Duration in microseconds, human-scaled
pub fn visual_time(micros: u64) -> String {
    scale(micros as f64, &TIME_UNITS)
}
