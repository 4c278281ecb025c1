//! Humanized sizes for the long listing format

use std::fmt;

/// A byte count displayed with binary-unit suffixes, e.g. `64.00B`, `1.50K`.
pub struct ByteSize(pub u64);

const KB: f64 = 1024.0;
const MB: f64 = KB * 1024.0;
const GB: f64 = MB * 1024.0;
const TB: f64 = GB * 1024.0;
const PB: f64 = TB * 1024.0;
const EB: f64 = PB * 1024.0;
const ZB: f64 = EB * 1024.0;
const YB: f64 = ZB * 1024.0;

const UNITS: [(f64, &str); 8] = [
    (YB, "Y"),
    (ZB, "Z"),
    (EB, "E"),
    (PB, "P"),
    (TB, "T"),
    (GB, "G"),
    (MB, "M"),
    (KB, "K"),
];

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0 as f64;
        for (scale, suffix) in UNITS {
            if value >= scale {
                return write!(f, "{:.2}{}", value / scale, suffix);
            }
        }
        write!(f, "{value:.2}B")
    }
}
