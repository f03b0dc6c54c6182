// Short human-readable numbers for status output.

const UNITS: [(u64, &str); 4] = [
    (1_000_000_000_000, "T"),
    (1_000_000_000, "B"),
    (1_000_000, "M"),
    (1_000, "K"),
];

/// `1234` → `1.2K`, `2_500_000` → `2.5M`.
pub fn format_short(n: u64) -> String {
    for (scale, suffix) in UNITS {
        if n >= scale {
            return format!("{:.1}{}", n as f64 / scale as f64, suffix);
        }
    }
    n.to_string()
}

/// Integer-only variant: `1234` → `1K`.
pub fn format_compact(n: u64) -> String {
    for (scale, suffix) in UNITS {
        if n >= scale {
            return format!("{}{}", n / scale, suffix);
        }
    }
    n.to_string()
}
