use std::sync::OnceLock;

use regex::Regex;

/// Index of the all-time row among a store page's review summary rows
/// (the first row covers recent reviews only).
pub const ALL_TIME_SUMMARY_ROW: usize = 1;

fn percent_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)%").expect("static percent regex"))
}

/// First `NN%` in a review summary, e.g. "All Reviews:Very Positive(1,234)- 87% of the
/// 1,234 user reviews for this game are positive." -> 87.
pub fn review_percentage(summary: &str) -> Option<u8> {
    let caps = percent_pattern().captures(summary)?;
    let value: u32 = caps.get(1)?.as_str().parse().ok()?;
    u8::try_from(value).ok().filter(|pct| *pct <= 100)
}

/// Positive-review percentage from the all-time summary row, if the page has one.
pub fn all_time_rating<S: AsRef<str>>(rows: &[S]) -> Option<u8> {
    rows.get(ALL_TIME_SUMMARY_ROW)
        .and_then(|row| review_percentage(row.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_percentage() {
        assert_eq!(
            review_percentage(
                "All Reviews:Very Positive(12,345)- 91% of the 12,345 user reviews are positive."
            ),
            Some(91)
        );
        assert_eq!(review_percentage("0% of 3 reviews"), Some(0));
    }

    #[test]
    fn rejects_missing_or_out_of_range_values() {
        assert_eq!(review_percentage("No user reviews"), None);
        assert_eq!(review_percentage("250% hype"), None);
    }

    #[test]
    fn reads_the_all_time_row() {
        let rows = [
            "Recent Reviews:Mixed- 55% of the 120 user reviews in the last 30 days",
            "All Reviews:Mostly Positive- 78% of the 4,000 user reviews",
        ];
        assert_eq!(all_time_rating(&rows), Some(78));
        assert_eq!(all_time_rating(&rows[..1]), None);
        assert_eq!(all_time_rating::<&str>(&[]), None);
    }
}
