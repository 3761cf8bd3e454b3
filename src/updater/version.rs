use std::cmp::Ordering;

/// True when `latest` is strictly newer than `current`.
pub fn is_newer(latest: &str, current: &str) -> bool {
    compare_versions(latest, current) == Ordering::Greater
}

/// Compare dotted numeric versions.
///
/// Each dot-separated part keeps only its ASCII digits (`"3-beta"` is 3,
/// `"rc"` is 0). The shorter list is padded with zeros, so `1.2` equals
/// `1.2.0`. Parts too large for `u64` saturate.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let mut left = parse_parts(left);
    let mut right = parse_parts(right);
    let len = left.len().max(right.len());
    left.resize(len, 0);
    right.resize(len, 0);
    left.cmp(&right)
}

fn parse_parts(version: &str) -> Vec<u64> {
    version
        .trim()
        .split('.')
        .map(|part| {
            part.chars()
                .filter(char::is_ascii_digit)
                .fold(0u64, |acc, digit| {
                    acc.saturating_mul(10)
                        .saturating_add(u64::from(digit as u8 - b'0'))
                })
        })
        .collect()
}
