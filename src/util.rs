// src/util.rs — Shared text helpers

use std::borrow::Cow;

/// Longest prefix of `s` that fits in `max_len` bytes without splitting a
/// character.
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Like `truncate_str`, but says how much was dropped so a reader of the
/// evidence knows the program output continued.
pub fn clip(s: &str, max_len: usize) -> Cow<'_, str> {
    let kept = truncate_str(s, max_len);
    if kept.len() == s.len() {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(format!("{kept}... [{} more bytes]", s.len() - kept.len()))
    }
}
