pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const CONFIDENCE: &str = "confidence";
pub const ACQ_DATE: &str = "acq_date";
pub const ACQ_TIME: &str = "acq_time";
pub const SATELLITE: &str = "satellite";
pub const VERSION: &str = "version";

pub const BRIGHTNESS_A: &str = "brightness_a";
pub const BRIGHTNESS_B: &str = "brightness_b";
pub const ACQ_DATETIME: &str = "acq_datetime";
pub const HIGH_CONFIDENCE: &str = "high_confidence";
pub const DAYS_AGO: &str = "days_ago";

pub const REQUIRED_COLUMNS: [&str; 4] = [CONFIDENCE, ACQ_DATE, ACQ_TIME, SATELLITE];

/// Source columns typed as floats; every other column is carried as text.
pub const FLOAT_COLUMNS: [&str; 11] = [
    LATITUDE,
    LONGITUDE,
    "brightness",
    "bright_t31",
    "bright_ti4",
    "bright_ti5",
    BRIGHTNESS_A,
    BRIGHTNESS_B,
    "scan",
    "track",
    "frp",
];

pub fn is_float_column(name: &str) -> bool {
    FLOAT_COLUMNS.contains(&name)
}
