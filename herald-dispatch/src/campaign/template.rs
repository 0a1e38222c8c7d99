//! `{{placeholder}}` substitution for message templates

use ahash::AHashMap;

const fn is_word(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Length of a `{{key}}` placeholder at the start of `s`, with the key
fn placeholder(s: &str) -> Option<(usize, &str)> {
    let rest = s.strip_prefix("{{")?;
    let key_len = rest.bytes().take_while(|b| is_word(*b)).count();
    if key_len == 0 || !rest[key_len..].starts_with("}}") {
        return None;
    }
    Some((key_len + 4, &rest[..key_len]))
}

/// Replace every `{{key}}` with `vars[key]`.
///
/// Keys are ASCII word characters. Unknown keys render as the empty string;
/// anything that is not a well-formed placeholder is copied through as-is.
#[must_use]
pub fn render(template: &str, vars: &AHashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        if let Some((len, key)) = placeholder(rest) {
            if let Some(value) = vars.get(key) {
                out.push_str(value);
            }
            rest = &rest[len..];
        } else {
            // Only the first brace is literal; a placeholder may start at the next one
            out.push('{');
            rest = &rest[1..];
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> AHashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_substitutes_known_keys() {
        let vars = vars(&[("name", "Ana"), ("day", "Monday")]);
        assert_eq!(
            render("Hi {{name}}, see you {{day}}!", &vars),
            "Hi Ana, see you Monday!"
        );
    }

    #[test]
    fn test_unknown_keys_render_empty() {
        assert_eq!(render("Hi {{name}}!", &AHashMap::new()), "Hi !");
    }

    #[test]
    fn test_empty_template() {
        assert_eq!(render("", &vars(&[("name", "Ana")])), "");
    }

    #[test]
    fn test_malformed_placeholders_are_literal() {
        let vars = vars(&[("name", "Ana")]);
        assert_eq!(render("{{ name }}", &vars), "{{ name }}");
        assert_eq!(render("{{name", &vars), "{{name");
        assert_eq!(render("{{}}", &vars), "{{}}");
        assert_eq!(render("{{{name}}}", &vars), "{Ana}");
    }

    #[test]
    fn test_non_ascii_text_is_preserved() {
        let vars = vars(&[("name", "José")]);
        assert_eq!(render("¡Hola {{name}}! 👋", &vars), "¡Hola José! 👋");
    }
}
