//! Byte-signature search over a module image.
//!
//! Patterns are sequences of `Option<u8>` where `None` is a wildcard byte.

use memchr::memchr;

/// Find the first match of a wildcard pattern in `haystack`.
///
/// Candidates are found by searching for the first literal byte of the
/// pattern, wherever it sits. When a candidate window does not match, the
/// scan skips `max(1, len / 2)` bytes past the candidate instead of
/// restarting at the next byte. This is faster on large images, but a match
/// that overlaps the first half of a rejected candidate window is not found.
///
/// # Example
///
/// ```
/// use mapassist_core::process::pattern::find_signature;
///
/// let image = [0x90, 0x48, 0x8D, 0x0D, 0x10, 0x20, 0x30, 0x40];
/// let pattern = [Some(0x48), Some(0x8D), Some(0x0D), None, None, None, None];
/// assert_eq!(find_signature(&image, &pattern), Some(1));
/// ```
pub fn find_signature(haystack: &[u8], pattern: &[Option<u8>]) -> Option<usize> {
    if pattern.is_empty() || pattern.len() > haystack.len() {
        return None;
    }

    // All wildcards: the first window matches.
    let Some((anchor, anchor_byte)) = pattern
        .iter()
        .enumerate()
        .find_map(|(index, byte)| byte.map(|value| (index, value)))
    else {
        return Some(0);
    };

    let last_start = haystack.len() - pattern.len();
    let skip = (pattern.len() / 2).max(1);
    let mut pos = 0;

    while pos <= last_start {
        let hit = memchr(anchor_byte, &haystack[pos + anchor..=last_start + anchor])?;
        let candidate = pos + hit;

        if window_matches(&haystack[candidate..candidate + pattern.len()], pattern) {
            return Some(candidate);
        }

        pos = candidate + skip;
    }

    None
}

fn window_matches(window: &[u8], pattern: &[Option<u8>]) -> bool {
    window
        .iter()
        .zip(pattern)
        .all(|(&byte, expected)| expected.is_none_or(|value| value == byte))
}
