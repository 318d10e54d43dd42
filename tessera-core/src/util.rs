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

/// Longest prefix of `value` not exceeding `max` bytes that ends on a char boundary.
pub fn truncated(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            $crate::truncated(&$query, 497).trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}

/// Builds a [`Values`](crate::Values) map, converting every value through `Into<Value>`.
///
/// ```rust
/// use tessera_core::{Value, values};
/// let values = values! { "email" => "tony@stark.com", "account_group_id" => 1 };
/// assert_eq!(values["account_group_id"], Value::Int32(Some(1)));
/// ```
#[macro_export]
macro_rules! values {
    () => { $crate::Values::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut values = $crate::Values::new();
        $(values.insert(::std::string::String::from($key), $crate::Value::from($value));)+
        values
    }};
}
