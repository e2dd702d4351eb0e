//! JSON Pointer (RFC 6901) rendering for error locations.

use std::borrow::Cow;

/// One step of a location inside a JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

/// Escapes a pointer component: `~` becomes `~0`, `/` becomes `~1`.
pub fn escape_component(component: &str) -> Cow<'_, str> {
    if !component.contains('/') && !component.contains('~') {
        return Cow::Borrowed(component);
    }
    // `~` first, otherwise the `~` introduced by `~1` would be escaped again
    Cow::Owned(component.replace('~', "~0").replace('/', "~1"))
}

/// Formats steps as a JSON Pointer. The empty path is `""` (the whole document).
pub fn format_pointer(steps: &[PathStep]) -> String {
    let mut out = String::new();
    for step in steps {
        out.push('/');
        match step {
            PathStep::Key(key) => out.push_str(&escape_component(key)),
            PathStep::Index(i) => out.push_str(&i.to_string()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_reserved_characters() {
        assert_eq!(escape_component("a~b"), "a~0b");
        assert_eq!(escape_component("c/d"), "c~1d");
        assert_eq!(escape_component("~1"), "~01");
        assert_eq!(escape_component("plain"), "plain");
    }

    #[test]
    fn formats_mixed_steps() {
        let steps = vec![
            PathStep::Key("items".into()),
            PathStep::Index(2),
            PathStep::Key("a/b".into()),
        ];
        assert_eq!(format_pointer(&steps), "/items/2/a~1b");
        assert_eq!(format_pointer(&[]), "");
    }
}
