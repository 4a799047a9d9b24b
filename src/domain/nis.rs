//! NIS (Nomor Induk Santri) utilities
//!
//! Roll numbers use the format YYNNN: the last two digits of the intake year
//! followed by a zero-padded three-digit sequence number, e.g. 25001, 25002.
//! Consumed by the student-intake flow when registering a new santri; the
//! promotion endpoints only carry the NIS through as display data.

/// Compute the next NIS for the given year, continuing from the highest NIS
/// already issued with that year's prefix (pass `None` for the first intake).
pub fn next_nis(year: i32, last_nis: Option<&str>) -> String {
    let prefix = year_prefix(year);

    let mut next_number = 1u32;
    if let Some(last) = last_nis {
        if last.starts_with(&prefix) && last.len() == 5 {
            if let Ok(number) = last[2..].parse::<u32>() {
                next_number = number + 1;
            }
        }
    }

    format!("{}{:03}", prefix, next_number)
}

/// Whether a string is a well-formed NIS (exactly five ASCII digits).
pub fn is_valid_nis(nis: &str) -> bool {
    nis.len() == 5 && nis.bytes().all(|b| b.is_ascii_digit())
}

/// Extract the full intake year from a NIS, assuming the 2000s.
pub fn year_from_nis(nis: &str) -> Option<i32> {
    if !is_valid_nis(nis) {
        return None;
    }
    nis[..2].parse::<i32>().ok().map(|two_digit| 2000 + two_digit)
}

fn year_prefix(year: i32) -> String {
    format!("{:02}", year.rem_euclid(100))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_nis_of_a_year() {
        assert_eq!(next_nis(2025, None), "25001");
    }

    #[test]
    fn test_continues_sequence_within_year() {
        assert_eq!(next_nis(2025, Some("25007")), "25008");
        assert_eq!(next_nis(2025, Some("25099")), "25100");
    }

    #[test]
    fn test_restarts_sequence_on_year_rollover() {
        // Highest stored NIS is from a previous intake.
        assert_eq!(next_nis(2026, Some("25123")), "26001");
    }

    #[test]
    fn test_malformed_last_nis_is_ignored() {
        assert_eq!(next_nis(2025, Some("25-07")), "25001");
        assert_eq!(next_nis(2025, Some("250001")), "25001");
    }

    #[test]
    fn test_is_valid_nis() {
        assert!(is_valid_nis("25001"));
        assert!(!is_valid_nis("2501"));
        assert!(!is_valid_nis("25.01"));
        assert!(!is_valid_nis("abcde"));
    }

    #[test]
    fn test_year_from_nis() {
        assert_eq!(year_from_nis("25001"), Some(2025));
        assert_eq!(year_from_nis("0x001"), None);
    }
}
