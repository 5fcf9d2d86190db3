/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Masks the middle of an identifier so that it can be shown to a wider audience, e.g. `628123456789` becomes
/// `628*****6789`. Identifiers of 4 characters or fewer are masked completely.
pub fn mask_identifier(value: &str) -> String {
    let chars = value.chars().collect::<Vec<char>>();
    let n = chars.len();
    if n <= 4 {
        return "*".repeat(n);
    }
    let keep_tail = 4.min(n / 3).max(1);
    let keep_head = 3.min(n - keep_tail - 1);
    let head = chars[..keep_head].iter().collect::<String>();
    let tail = chars[n - keep_tail..].iter().collect::<String>();
    format!("{head}{}{tail}", "*".repeat(n - keep_head - keep_tail))
}
