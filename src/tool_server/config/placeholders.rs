//! `${NAME}` placeholder expansion for environment values.

const OPEN: &str = "${";
const CLOSE: char = '}';

/// Replaces every `${NAME}` in `value` with `lookup(NAME)`.
///
/// Unset variables expand to the empty string. An opening `${` without a
/// closing brace is kept literally, together with the rest of the value.
pub(super) fn expand(value: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let mut expanded = String::with_capacity(value.len());
    let mut rest = value;

    while let Some((literal, tail)) = rest.split_once(OPEN) {
        expanded.push_str(literal);

        let Some((name, after)) = tail.split_once(CLOSE) else {
            expanded.push_str(OPEN);
            expanded.push_str(tail);
            return expanded;
        };

        expanded.push_str(&lookup(name).unwrap_or_default());
        rest = after;
    }

    expanded.push_str(rest);
    expanded
}
