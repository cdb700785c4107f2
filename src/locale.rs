use chrono::{Datelike, NaiveDate};

pub const MONTHS_TR: [&str; 12] = [
    "Ocak", "Şubat", "Mart", "Nisan", "Mayıs", "Haziran", "Temmuz", "Ağustos", "Eylül", "Ekim",
    "Kasım", "Aralık",
];

pub const WEEKDAYS_TR: [&str; 7] = ["Pzt", "Sal", "Çar", "Per", "Cum", "Cmt", "Paz"];

pub fn month_name(month: u32) -> &'static str {
    MONTHS_TR[(month.clamp(1, 12) - 1) as usize]
}

pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// "2025-12-25" becomes "25 Aralık"; anything unparseable is shown as typed.
pub fn due_display(due_sort: &str) -> String {
    match parse_iso_date(due_sort) {
        Some(date) => day_month(date),
        None => due_sort.to_string(),
    }
}

pub fn day_month(date: NaiveDate) -> String {
    format!("{} {}", date.day(), month_name(date.month()))
}

pub fn month_title(year: i32, month: u32) -> String {
    format!("{} {year}", month_name(month))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_display_uses_turkish_month() {
        assert_eq!(due_display("2025-12-25"), "25 Aralık");
        assert_eq!(due_display("2026-02-01"), "1 Şubat");
    }

    #[test]
    fn due_display_keeps_raw_input_when_unparseable() {
        assert_eq!(due_display("yarın"), "yarın");
        assert_eq!(due_display("2025-13-01"), "2025-13-01");
        assert_eq!(due_display(""), "");
    }

    #[test]
    fn month_title_formats_name_and_year() {
        assert_eq!(month_title(2025, 12), "Aralık 2025");
        assert_eq!(month_title(2026, 1), "Ocak 2026");
    }
}
