/// Characters that must be backslash-escaped in Telegram MarkdownV2 text
const SPECIAL: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Marks text cut short by [`escape_markdown_truncated`]
const ELLIPSIS: char = '…';

/// Escape free text for interpolation into a MarkdownV2 message
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Length as Telegram counts it, in UTF-16 code units
pub fn message_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Escape `text`, cutting it so the result is at most `max_len` long.
///
/// A cut result ends in an ellipsis and never splits an escape sequence.
/// Returns an empty string when not even one character fits.
pub fn escape_markdown_truncated(text: &str, max_len: usize) -> String {
    let escaped = escape_markdown(text);
    if message_len(&escaped) <= max_len {
        return escaped;
    }

    let budget = max_len.saturating_sub(ELLIPSIS.len_utf16());
    let mut cut = String::new();
    let mut used = 0;
    for c in text.chars() {
        let special = SPECIAL.contains(&c);
        let width = c.len_utf16() + usize::from(special);
        if used + width > budget {
            break;
        }
        if special {
            cut.push('\\');
        }
        cut.push(c);
        used += width;
    }

    // Escaped characters are never whitespace, so trimming cannot orphan a backslash
    cut.truncate(cut.trim_end().len());
    if cut.is_empty() {
        return cut;
    }
    cut.push(ELLIPSIS);
    cut
}
