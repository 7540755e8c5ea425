//! Small string helpers used while validating requests.

/// Whether a string is empty once surrounding whitespace is removed.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Whether an address already names the `http` or `https` scheme.
///
/// The comparison ignores ASCII case, so `HTTPS://example.com` counts.
pub fn has_http_scheme(address: &str) -> bool {
    starts_with_ignore_case(address, "http://") || starts_with_ignore_case(address, "https://")
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Prefix `http://` onto addresses that carry no scheme.
pub fn with_default_scheme(address: &str) -> String {
    if has_http_scheme(address) {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}
