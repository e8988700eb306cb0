//! Salary text parsing.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Salary, SalaryType};

/// Money amounts such as `$18.50`, `52,000`, `1 200.00`.
static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,3}(?:[,\u{a0} ]\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?").unwrap());

/// Period keywords, checked in order. `biweekly` must win over `weekly`.
static PERIODS: LazyLock<Vec<(Regex, SalaryType)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?i)\b(bi-?weekly|every two weeks)\b").unwrap(),
            SalaryType::Biweekly,
        ),
        (
            Regex::new(r"(?i)\b(hour|hourly|hr)\b").unwrap(),
            SalaryType::Hourly,
        ),
        (Regex::new(r"(?i)\b(day|daily)\b").unwrap(), SalaryType::Daily),
        (Regex::new(r"(?i)\b(week|weekly)\b").unwrap(), SalaryType::Weekly),
        (
            Regex::new(r"(?i)\b(month|monthly)\b").unwrap(),
            SalaryType::Monthly,
        ),
        (
            Regex::new(r"(?i)\b(year|yearly|annual|annually|annum)\b").unwrap(),
            SalaryType::Annual,
        ),
    ]
});

/// Classify the pay period mentioned in salary text.
pub fn salary_type(text: &str) -> SalaryType {
    PERIODS
        .iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|(_, kind)| *kind)
        .unwrap_or_default()
}

/// Extract min/max amounts and the pay period.
///
/// The first amount is the minimum, the second (if present) the maximum.
/// A single amount sets both.
pub fn parse_salary(text: &str) -> Salary {
    let mut amounts = AMOUNT
        .find_iter(text)
        .filter_map(|m| {
            m.as_str()
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect::<String>()
                .parse::<f64>()
                .ok()
        })
        .take(2);

    let min = amounts.next();
    let max = amounts.next().or(min);

    Salary {
        min,
        max,
        salary_type: salary_type(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hourly_range() {
        let salary = parse_salary("$18.50 to $22.00 hourly");
        assert_eq!(salary.min, Some(18.5));
        assert_eq!(salary.max, Some(22.0));
        assert_eq!(salary.salary_type, SalaryType::Hourly);
    }

    #[test]
    fn single_annual_amount_with_separators() {
        let salary = parse_salary("$52,000 annually");
        assert_eq!(salary.min, Some(52000.0));
        assert_eq!(salary.max, Some(52000.0));
        assert_eq!(salary.salary_type, SalaryType::Annual);
    }

    #[test]
    fn biweekly_is_not_weekly() {
        assert_eq!(salary_type("$2,100 bi-weekly"), SalaryType::Biweekly);
        assert_eq!(salary_type("$900 per week"), SalaryType::Weekly);
        assert_eq!(salary_type("$4,000 / month"), SalaryType::Monthly);
        assert_eq!(salary_type("$200 per day"), SalaryType::Daily);
    }

    #[test]
    fn text_without_amounts() {
        let salary = parse_salary("Salary to be negotiated");
        assert_eq!(salary, Salary::default());
    }
}
