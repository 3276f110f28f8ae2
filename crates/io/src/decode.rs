// Decoding of obfuscated extract text: HTML entities plus UTF-7 style placeholders

use quick_xml::escape::resolve_html5_entity;

/// Placeholder some exporters write for a double quote.
const QUOTE_PLACEHOLDER: &str = "+ACI-";
/// Placeholder some exporters write for a hyphen.
const HYPHEN_PLACEHOLDER: &str = "+AC0-";

/// Longest entity name worth looking up (`&CounterClockwiseContourIntegral;`).
const MAX_ENTITY_LEN: usize = 32;

/// Resolve HTML character references. Unknown or unterminated references
/// are kept literally, so a bare `&` in a company name survives.
pub fn unescape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let resolved = after
            .find(';')
            .filter(|&end| end > 0 && end <= MAX_ENTITY_LEN)
            .and_then(|end| resolve_reference(&after[..end]).map(|text| (text, end)));
        match resolved {
            Some((text, end)) => {
                out.push_str(&text);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve_reference(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    resolve_html5_entity(name).map(str::to_string)
}

/// Decode a data value: entities, then the quote and hyphen placeholders.
pub fn decode_value(raw: &str) -> String {
    unescape_html(raw)
        .replace(QUOTE_PLACEHOLDER, "\"")
        .replace(HYPHEN_PLACEHOLDER, "-")
}

/// Decode a header name. Quotes are dropped entirely and the result is trimmed.
pub fn decode_header(raw: &str) -> String {
    decode_value(raw).replace('"', "").trim().to_string()
}

/// Make header names unique: the second `X` becomes `X.1`, the third `X.2`.
/// Returns the new names and whether anything was renamed.
pub fn dedup_headers(headers: Vec<String>) -> (Vec<String>, bool) {
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut renamed = false;
    let out = headers
        .into_iter()
        .map(|name| {
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name
            } else {
                renamed = true;
                format!("{name}.{count}")
            };
            *count += 1;
            unique
        })
        .collect();
    (out, renamed)
}
