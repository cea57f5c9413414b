//! Keyword-based crisis detection and the safety reply that replaces the
//! model's answer when it fires.
//!
//! Matching is broad on purpose; false positives are preferred over misses.

use std::sync::OnceLock;

use regex::Regex;

const CRISIS_PATTERN: &str = r"(?i)suicide|self[- ]?harm|kill myself|end my life";

/// Appended to every crisis-resources message.
pub const CLOSING_LINE: &str = "\n\nYou are not alone. Please reach out to someone you trust.";

const RESOURCES_EN: &str = "If you are in immediate danger or thinking about self-harm, please dial your local emergency number or call a crisis helpline such as 988 in the U.S.";
const RESOURCES_HI: &str = "यदि आप तत्काल खतरे में हैं या आत्म-हानि के बारे में सोच रहे हैं, तो कृपया अपने स्थानीय आपातकालीन नंबर पर कॉल करें।";

fn crisis_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(CRISIS_PATTERN).expect("crisis pattern is a valid regex"))
}

/// Whether the message contains self-harm indicator language.
pub fn detect(message: &str) -> bool {
    crisis_regex().is_match(message)
}

/// Localized crisis resources; unknown languages get English.
pub fn crisis_resources(language: &str) -> &'static str {
    match language {
        "hi" => RESOURCES_HI,
        _ => RESOURCES_EN,
    }
}

/// Full replacement reply: resources followed by the closing line.
pub fn crisis_reply(language: &str) -> String {
    format!("{}{}", crisis_resources(language), CLOSING_LINE)
}
