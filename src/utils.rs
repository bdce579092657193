// src/utils.rs

/// `numerator / denominator`, or 0 when the quotient is not finite.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    let q = numerator / denominator;
    if q.is_finite() {
        q
    } else {
        0.0
    }
}

/// Harmonic mean of precision and recall, 0 when both are 0.
pub fn f1(precision: f64, recall: f64) -> f64 {
    safe_div(2.0 * precision * recall, precision + recall)
}

pub fn mean(values: &[f64]) -> f64 {
    safe_div(values.iter().sum(), values.len() as f64)
}

/// Formats `value` to at most `digits` significant digits, without trailing
/// zeros.
pub fn format_significant(value: f64, digits: u32) -> String {
    if value == 0.0 || !value.is_finite() {
        return if value.is_finite() { "0".to_string() } else { value.to_string() };
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = digits as i32 - 1 - magnitude;
    if decimals <= 0 {
        let scale = 10f64.powi(-decimals);
        return format!("{}", (value / scale).round() * scale);
    }
    let formatted = format!("{:.*}", decimals as usize, value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Cache key of a row selection: the ascending indexes joined by commas.
/// Independent of the order the selection is given in.
pub fn selection_signature(selection: &[usize]) -> String {
    let mut sorted = selection.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
