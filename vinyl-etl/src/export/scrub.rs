use std::borrow::Cow;

/// Placeholder substituted for characters that are not legal in XML text.
const REPLACEMENT: char = '?';

fn is_illegal(c: char) -> bool {
    matches!(
        c,
        '\u{00}'..='\u{08}' | '\u{0b}' | '\u{0c}' | '\u{0e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}'
    )
}

/// Substitutes XML-illegal characters in a free-text field.
///
/// C0 control characters other than tab, line feed and carriage return, and
/// the non-characters U+FFFE/U+FFFF, are replaced with `?`. Surrogate code
/// points cannot occur in a Rust `str` in the first place. This is data
/// hygiene applied before structured export, never an error path.
pub fn scrub_xml_text(input: &str) -> Cow<'_, str> {
    if !input.chars().any(is_illegal) {
        return Cow::Borrowed(input);
    }

    Cow::Owned(
        input
            .chars()
            .map(|c| if is_illegal(c) { REPLACEMENT } else { c })
            .collect(),
    )
}
