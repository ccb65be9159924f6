#[must_use]
pub(super) fn read_non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[must_use]
pub(super) fn read_env_usize(name: &str, default_value: usize, min_value: usize) -> usize {
    parse_usize(std::env::var(name).ok().as_deref(), default_value, min_value)
}

#[must_use]
pub(super) fn read_env_u64(name: &str, default_value: u64, min_value: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|value| *value >= min_value)
        .unwrap_or(default_value)
}

#[must_use]
pub(super) fn parse_usize(raw: Option<&str>, default_value: usize, min_value: usize) -> usize {
    raw.and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|value| *value >= min_value)
        .unwrap_or(default_value)
}

#[must_use]
pub(super) fn parse_enabled_default_true(raw: Option<&str>) -> bool {
    !matches!(
        raw.map(|value| value.trim().to_ascii_lowercase())
            .as_deref(),
        Some("off" | "none" | "0" | "false" | "no")
    )
}

#[must_use]
pub(super) fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_usize_applies_default_and_floor() {
        assert_eq!(parse_usize(None, 20, 1), 20);
        assert_eq!(parse_usize(Some(" 7 "), 20, 1), 7);
        assert_eq!(parse_usize(Some("0"), 20, 1), 20);
        assert_eq!(parse_usize(Some("many"), 20, 1), 20);
    }

    #[test]
    fn enabled_flag_defaults_to_true() {
        assert!(parse_enabled_default_true(None));
        assert!(parse_enabled_default_true(Some("yes")));
        assert!(!parse_enabled_default_true(Some("FALSE")));
        assert!(!parse_enabled_default_true(Some(" off ")));
    }

    #[test]
    fn split_csv_drops_blank_entries() {
        assert_eq!(
            split_csv("Author, ,Published At,"),
            vec!["Author".to_string(), "Published At".to_string()]
        );
    }
}
