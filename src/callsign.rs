//! DX callsign extraction from decoded free text.
//!
//! This is a token heuristic, not a parse of the FT8/FT4 message grammar.
//! It takes the token after the first one:
//!
//! ```text
//! CQ K1ABC FN42        -> K1ABC
//! CQ DX K1ABC FN42     -> K1ABC   (two-letter CQ modifier skipped)
//! K1ABC W2DEF FN42     -> W2DEF
//! W2DEF K1ABC -12      -> K1ABC
//! ```
//!
//! Report lines whose second token happens to look like a callsign will
//! produce a false positive; lines with an unusual layout are missed.

/// Check if a character is valid in a callsign token.
fn is_callsign_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || c == '/'
}

/// Returns true for tokens of three or more `[A-Z0-9/]` characters.
pub fn looks_like_callsign(token: &str) -> bool {
    token.len() >= 3 && token.chars().all(is_callsign_char)
}

/// Extract the DX callsign from a decoded message.
///
/// Returns `None` for empty input, a bare `CQ`, or when the candidate
/// token does not look like a callsign.
pub fn extract_dx_call(message: &str) -> Option<&str> {
    let mut tokens = message.split_whitespace();
    let first = tokens.next()?;
    let second = tokens.next()?;

    if looks_like_callsign(second) {
        return Some(second);
    }

    // Directed CQ ("CQ DX", "CQ NA") puts the caller third.
    if first == "CQ" {
        return tokens.next().filter(|t| looks_like_callsign(t));
    }

    None
}
