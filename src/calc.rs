use crate::model::{Calculations, SystemConfiguration};

/// Prices a system configuration.
///
/// System size is rounded to 2 decimals; the three currency figures to whole
/// rupees, ties away from zero. The payable total is rounded from the raw
/// total, not reassembled from the already-rounded parts.
pub fn calculate_system_metrics(config: &SystemConfiguration) -> Calculations {
    let system_size = (config.watt_peak * f64::from(config.number_of_panels)) / 1000.0; // kW
    let total_base_price = system_size * config.base_price_per_kw;
    let gst_amount = total_base_price * config.gst_percentage / 100.0;
    let total_payable_amount =
        total_base_price + gst_amount + config.cleaning_charges - config.subsidy;

    Calculations {
        system_size: (system_size * 100.0).round() / 100.0,
        total_base_price: total_base_price.round(),
        gst_amount: gst_amount.round(),
        total_payable_amount: total_payable_amount.round(),
    }
}

/// Indian digit grouping: last three digits, then groups of two.
/// 609520 -> "6,09,520".
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<String> = Vec::new();
    let mut i = head.len();
    while i > 0 {
        let start = i.saturating_sub(2);
        groups.push(head[start..i].to_string());
        i = start;
    }
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}

pub fn format_currency(amount: f64) -> String {
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let grouped = group_indian(&format!("{:.0}", rounded.abs()));
    if negative {
        format!("-₹{}", grouped)
    } else {
        format!("₹{}", grouped)
    }
}

pub fn format_number(num: f64) -> String {
    // Whole and decimal parts come from the same rounded rendering, so a
    // value like 1.999 shows as "2" rather than a truncated "1".
    let rendered = format!("{:.2}", num.abs());
    let (whole, dec) = rendered.split_once('.').unwrap_or((&rendered, ""));
    let mut out = group_indian(whole);
    let dec = dec.trim_end_matches('0');
    if !dec.is_empty() {
        out.push('.');
        out.push_str(dec);
    }
    if num < 0.0 { format!("-{}", out) } else { out }
}
