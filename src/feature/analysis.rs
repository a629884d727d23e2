//! Human-readable labels for analysis names

use regex::Regex;
use std::sync::LazyLock;

pub const TOP_ACTIVATIONS: &str = "top_activations";

static SUBSAMPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^subsample-([0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)$")
        .expect("subsample pattern is valid")
});

/// Map an analysis name to its tab label.
///
/// Returns `None` for names that are neither `top_activations` nor
/// `subsample-<fraction>`, and for fractions whose percentage overflows.
pub fn analysis_label(analysis_name: &str) -> Option<String> {
    if analysis_name == TOP_ACTIVATIONS {
        return Some("Top Activations".to_string());
    }

    let fraction: f64 = SUBSAMPLE.captures(analysis_name)?[1].parse().ok()?;
    let percent = fraction * 100.0;
    if !percent.is_finite() {
        return None;
    }
    Some(format!("Subsample {}%", number_text(percent)))
}

/// Shortest round-trip text of a finite number, switching to exponent
/// notation below `1e-6` and from `1e21` up, with an explicit `+` on
/// positive exponents.
fn number_text(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-6..1e21).contains(&magnitude) {
        let text = format!("{value:e}");
        return match text.split_once('e') {
            Some((digits, exp)) if !exp.starts_with('-') => format!("{digits}e+{exp}"),
            _ => text,
        };
    }
    value.to_string()
}
