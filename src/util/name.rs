//! XML `Name` validation.
//!
//! Element and attribute names must match the `Name` production of
//! XML 1.0 §2.3. Namespaces are not interpreted, so a colon is accepted
//! anywhere the `Name` production accepts it.

/// Returns `true` if `c` is a valid `NameStartChar` per XML 1.0 §2.3 `[4]`.
#[must_use]
pub fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z' |
        '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}' |
        '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' |
        '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}' |
        '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}' |
        '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' |
        '\u{10000}'..='\u{EFFFF}'
    )
}

/// Returns `true` if `c` is a valid `NameChar` per XML 1.0 §2.3 `[4a]`.
#[must_use]
pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' |
            '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
        )
}

/// Returns `true` if `name` is a non-empty XML `Name`.
///
/// # Examples
///
/// ```
/// use xmlbuilder::util::name::is_valid_name;
///
/// assert!(is_valid_name("child"));
/// assert!(is_valid_name("x:item-2"));
/// assert!(!is_valid_name("2nd"));
/// assert!(!is_valid_name(""));
/// ```
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_name_start_char(first) => chars.all(is_name_char),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_names() {
        assert!(is_valid_name("root"));
        assert!(is_valid_name("_private"));
        assert!(is_valid_name("a.b-c_d"));
        assert!(is_valid_name("A1"));
    }

    #[test]
    fn test_colon_is_name_char() {
        assert!(is_valid_name("xml:lang"));
        assert!(is_valid_name(":leading"));
    }

    #[test]
    fn test_non_ascii_names() {
        assert!(is_valid_name("\u{e9}l\u{e9}ment"));
        assert!(is_valid_name("\u{540d}\u{524d}"));
    }

    #[test]
    fn test_invalid_start_chars() {
        assert!(!is_valid_name("1abc"));
        assert!(!is_valid_name("-abc"));
        assert!(!is_valid_name(".abc"));
        assert!(!is_valid_name("\u{B7}abc"));
    }

    #[test]
    fn test_invalid_inner_chars() {
        assert!(!is_valid_name("has space"));
        assert!(!is_valid_name("a<b"));
        assert!(!is_valid_name("a&b"));
        assert!(!is_valid_name("quote\""));
    }

    #[test]
    fn test_empty_name() {
        assert!(!is_valid_name(""));
    }
}
