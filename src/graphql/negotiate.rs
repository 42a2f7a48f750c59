//! Decides whether a client gets the explorer page or plain JSON.

use http::{header::ACCEPT, HeaderMap};

const TEXT_HTML: &str = "text/html";
const APPLICATION_JSON: &str = "application/json";

/// Media ranges from an `Accept` header, highest quality first.
///
/// Entries keep their header order when their quality is equal. A missing
/// header is read as `*/*`.
pub fn accepted_content_types(accept: Option<&str>) -> Vec<&str> {
    let mut qualified: Vec<(&str, f32)> = accept
        .unwrap_or("*/*")
        .split(',')
        .map(qualify)
        .collect();
    // `sort_by` is stable.
    qualified.sort_by(|(_, a), (_, b)| b.total_cmp(a));
    qualified.into_iter().map(|(media, _)| media).collect()
}

/// Splits a media range from its quality. Malformed or absent `q` means 1.
fn qualify(entry: &str) -> (&str, f32) {
    let mut parts = entry.splitn(2, ';');
    let media = parts.next().unwrap_or_default().trim();
    let quality = parts
        .next()
        .and_then(|params| {
            params
                .split(';')
                .filter_map(|param| param.trim().strip_prefix("q="))
                .next()
        })
        .and_then(parse_quality)
        .unwrap_or(1.0);
    (media, quality)
}

/// Accepts `0`, `1` and up to three decimals, as in RFC 9110's `qvalue`.
fn parse_quality(value: &str) -> Option<f32> {
    let (int, fraction) = match value.split_once('.') {
        Some((int, fraction)) => (int, fraction),
        None => (value, ""),
    };
    let well_formed = fraction.len() <= 3
        && fraction.chars().all(|c| c.is_ascii_digit())
        && match int {
            "0" => true,
            "1" => fraction.chars().all(|c| c == '0'),
            _ => false,
        };
    if well_formed {
        value.parse().ok()
    } else {
        None
    }
}

/// Whether the client prefers an HTML page over JSON.
///
/// Counts how often each media type is listed; a tie goes to JSON.
pub fn request_wants_html(headers: &HeaderMap) -> bool {
    let accept = headers.get(ACCEPT).and_then(|value| value.to_str().ok());
    let accepted = accepted_content_types(accept);
    let html = accepted.iter().filter(|media| **media == TEXT_HTML).count();
    let json = accepted
        .iter()
        .filter(|media| **media == APPLICATION_JSON)
        .count();
    html > json
}
