use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for language attributes of book documents
///
/// Text documents carry BCP 47 style tags (`da`, `da-DK`, `en_US`) in
/// `xml:lang` or `lang`. Aligners want an ISO 639 code, so tags are reduced
/// to their primary subtag and mapped through isolang.
/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-3 (3-letter) code
    Part3,
    /// ISO 639-2/B (3-letter) bibliographic code
    Part2B,
}

// @const: ISO 639-2/B codes that differ from their 639-3 counterpart
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("dut", "nld"),
    ("fre", "fra"),
    ("geo", "kat"),
    ("ger", "deu"),
    ("gre", "ell"),
    ("ice", "isl"),
    ("mac", "mkd"),
    ("may", "msa"),
    ("per", "fas"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

fn from_bibliographic(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

/// Primary subtag of a language tag, lowercased: `da-DK` gives `da`
pub fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn lookup(code: &str) -> Option<Language> {
    match code.len() {
        2 => Language::from_639_1(code),
        3 => Language::from_639_3(code)
            .or_else(|| from_bibliographic(code).and_then(Language::from_639_3)),
        _ => None,
    }
}

/// Validate the primary subtag of a language tag as an ISO 639 code
pub fn validate_language_code(tag: &str) -> Result<LanguageCodeType> {
    let code = primary_subtag(tag);

    if code.len() == 2 && Language::from_639_1(&code).is_some() {
        return Ok(LanguageCodeType::Part1);
    }
    if code.len() == 3 {
        if Language::from_639_3(&code).is_some() {
            return Ok(LanguageCodeType::Part3);
        }
        if from_bibliographic(&code).is_some() {
            return Ok(LanguageCodeType::Part2B);
        }
    }

    Err(anyhow!("Invalid language code: {}", tag))
}

/// Normalize a language tag to its ISO 639-3 (3-letter) code
pub fn normalize_to_part3(tag: &str) -> Result<String> {
    lookup(&primary_subtag(tag))
        .map(|lang| lang.to_639_3().to_string())
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", tag))
}

/// Language code handed to aligners: ISO 639-3 when known, else the tag itself
pub fn aligner_language(tag: &str) -> String {
    normalize_to_part3(tag).unwrap_or_else(|_| tag.trim().to_lowercase())
}

/// Check if two language tags name the same language
pub fn language_codes_match(tag1: &str, tag2: &str) -> bool {
    match (normalize_to_part3(tag1), normalize_to_part3(tag2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => primary_subtag(tag1) == primary_subtag(tag2),
    }
}
