//! Extended support cost model.
//!
//! Yearly cost = Σ(count × normalization factor) over every node role
//! × price per normalized instance hour × 24 × 365.

/// Billable hours in a year (no leap-year adjustment)
pub const HOURS_PER_YEAR: f64 = 24.0 * 365.0;

/// Projected yearly extended support cost
pub fn yearly_extended_support_cost(normalized_capacity: f64, price_per_nih: f64) -> f64 {
    normalized_capacity * (price_per_nih * HOURS_PER_YEAR)
}

/// Format an amount as US dollars with thousands separators, e.g. `$1,234.56`
pub fn format_usd(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RoleCapacity;

    #[test]
    fn test_hours_per_year() {
        assert_eq!(HOURS_PER_YEAR, 8760.0);
    }

    #[test]
    fn test_yearly_cost_data_and_master_nodes() {
        let roles = [
            RoleCapacity::new("r6g.xlarge.search", 3, 4.0),
            RoleCapacity::new("m6g.large.search", 3, 2.0),
            RoleCapacity::absent(),
            RoleCapacity::absent(),
        ];
        let capacity: f64 = roles.iter().map(RoleCapacity::normalized_units).sum();
        assert_eq!(capacity, 18.0);

        let cost = yearly_extended_support_cost(capacity, 0.10);
        assert!((cost - 15_768.0).abs() < 1e-6, "cost was {cost}");
        assert_eq!(format_usd(cost), "$15,768.00");
    }

    #[test]
    fn test_yearly_cost_zero_capacity() {
        assert_eq!(yearly_extended_support_cost(0.0, 0.0065), 0.0);
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(5.5), "$5.50");
        assert_eq!(format_usd(999.999), "$1,000.00");
        assert_eq!(format_usd(1234.56), "$1,234.56");
        assert_eq!(format_usd(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_usd(-42.0), "-$42.00");
    }
}
