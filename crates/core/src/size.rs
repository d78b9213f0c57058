//! Human-readable byte sizes
//!
//! Sizes are rendered as a whole number of the largest binary unit that the
//! value reaches; the remainder is truncated, so 1536 bytes is `1 KiB`.

const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Format a byte count, e.g. `1023 B`, `1 KiB`, `4 GiB`
pub fn human_size(bytes: u64) -> String {
    let mut value = bytes;
    let mut unit = 0;

    // u64::MAX is just under 16 EiB, so the table never runs out
    while unit + 1 < UNITS.len() && value >> 10 != 0 {
        value >>= 10;
        unit += 1;
    }

    format!("{value} {}", UNITS[unit])
}
