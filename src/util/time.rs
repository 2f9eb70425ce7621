use chrono::Duration;

// Parse a duration string like "3600", "90s", "45m", "2h" or "3d".
// Bare numbers are seconds. Returns None if unparseable or non-positive.
pub fn parse_duration_str(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (digits, unit): (&str, fn(i64) -> Duration) = match s.chars().last() {
        Some('s') => (&s[..s.len() - 1], Duration::seconds),
        Some('m') => (&s[..s.len() - 1], Duration::minutes),
        Some('h') => (&s[..s.len() - 1], Duration::hours),
        Some('d') => (&s[..s.len() - 1], Duration::days),
        _ => (s, Duration::seconds),
    };
    match digits.parse::<i64>() {
        Ok(n) if n > 0 => Some(unit(n)),
        _ => None,
    }
}
