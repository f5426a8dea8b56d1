//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

/// Agent rules: submit endpoint, credentials, termination token
pub const SYSTEM: &str = include_str!("../../prompts/system.pmt");

/// First user message of a run
pub const START: &str = include_str!("../../prompts/start.pmt");

/// Forced sentinel submission once the time budget is spent
pub const TIMEOUT: &str = include_str!("../../prompts/timeout.pmt");

/// Submit an operator-supplied answer
pub const MANUAL: &str = include_str!("../../prompts/manual.pmt");

/// Retry instruction after a malformed tool call
pub const CORRECTION: &str = include_str!("../../prompts/correction.pmt");

pub const NEXT_URL: &str = include_str!("../../prompts/next-url.pmt");

pub const TRIM_REMINDER: &str = include_str!("../../prompts/trim-reminder.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    match name {
        "system" => Some(SYSTEM),
        "start" => Some(START),
        "timeout" => Some(TIMEOUT),
        "manual" => Some(MANUAL),
        "correction" => Some(CORRECTION),
        "next-url" => Some(NEXT_URL),
        "trim-reminder" => Some(TRIM_REMINDER),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_system() {
        let system = get_embedded("system").unwrap();
        assert!(system.contains("{{submit_url}}"));
        assert!(system.contains("{{termination_token}}"));
    }

    #[test]
    fn test_correction_text() {
        assert!(CORRECTION.starts_with("SYSTEM ERROR: Your last tool call was Malformed (Invalid JSON)."));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
