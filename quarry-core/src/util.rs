pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Case-insensitive lookup of `name` in `labels`.
pub fn position_of<S: AsRef<str>>(labels: &[S], name: &str) -> Option<usize> {
    labels
        .iter()
        .position(|v| v.as_ref().eq_ignore_ascii_case(name))
}

/// Longest prefix of `value` not exceeding `len` bytes, without splitting a character.
pub fn truncated(value: &str, len: usize) -> &str {
    let mut end = len.min(value.len());
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].trim_end()
}

#[macro_export]
macro_rules! possibly_parenthesized {
    ($buff:ident, $cond:expr, $v:expr) => {
        if $cond {
            $buff.push('(');
            $v;
            $buff.push(')');
        } else {
            $v;
        }
    };
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            $crate::truncated(&$query, 497),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}
