//! Locale/style → voice id resolution.
//!
//! Resolution is pure and runs on every request, cache hits included, so it
//! never touches the network. Tiers, first match wins:
//!
//! 1. A non-empty explicit override is returned verbatim.
//! 2. Candidates for the exact locale: the locale's own bucket, then
//!    multi-locale entries declaring it, then entries misplaced in other
//!    buckets that declare it. Duplicates are dropped, first-seen order kept.
//! 3. First candidate carrying the requested style.
//! 4. First candidate.
//! 5. Any voice whose locales share the base language (`ES-AR` → `ES-`).

use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use super::catalog::{MULTI_LOCALE_BUCKET, VoiceCatalog, VoiceEntry};

/// Locale used when the request does not specify one.
pub const DEFAULT_LOCALE: &str = "EN-US";

/// Voice resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoiceError {
    #[error(
        "No voice supports locale '{0}'. Add one to the voice catalog or pass an explicit voice id."
    )]
    NoVoiceForLocale(String),
}

/// Upper-case and trim a locale, defaulting to [`DEFAULT_LOCALE`].
pub fn normalize_locale(locale: Option<&str>) -> String {
    match locale.map(str::trim) {
        Some(l) if !l.is_empty() => l.to_uppercase(),
        _ => DEFAULT_LOCALE.to_string(),
    }
}

/// Resolve the concrete voice id for a request.
pub fn resolve(
    catalog: &VoiceCatalog,
    locale: Option<&str>,
    style: Option<&str>,
    voice_override: Option<&str>,
) -> Result<String, VoiceError> {
    if let Some(explicit) = voice_override.filter(|v| !v.trim().is_empty()) {
        return Ok(explicit.to_string());
    }

    let want = normalize_locale(locale);
    let candidates = candidates_for_locale(catalog, &want);

    if let Some(style) = style.map(str::trim).filter(|s| !s.is_empty())
        && let Some(voice) = candidates.iter().find(|v| v.has_style(style))
    {
        debug!(locale = %want, style, voice_id = %voice.id, "Resolved voice by style");
        return Ok(voice.id.clone());
    }

    if let Some(voice) = candidates.first() {
        debug!(locale = %want, voice_id = %voice.id, "Resolved voice by locale");
        return Ok(voice.id.clone());
    }

    if let Some(voice) = base_language_fallback(catalog, &want) {
        debug!(locale = %want, voice_id = %voice.id, "Resolved voice by base language");
        return Ok(voice.id.clone());
    }

    Err(VoiceError::NoVoiceForLocale(
        locale
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LOCALE)
            .to_string(),
    ))
}

/// Exact-locale candidates in tier order, deduplicated by id.
fn candidates_for_locale<'a>(catalog: &'a VoiceCatalog, want: &str) -> Vec<&'a VoiceEntry> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    let direct = catalog.bucket(want).iter();
    let multi = catalog
        .multi_locale()
        .iter()
        .filter(|v| v.declares_locale(want));
    let misplaced = catalog
        .buckets()
        .filter(|(key, _)| *key != want && *key != MULTI_LOCALE_BUCKET)
        .flat_map(|(_, entries)| entries.iter())
        .filter(|v| v.declares_locale(want));

    for voice in direct.chain(multi).chain(misplaced) {
        if seen.insert(voice.id.as_str()) {
            out.push(voice);
        }
    }
    out
}

/// First voice speaking any region of the base language of `want`.
///
/// A voice listed under a regular bucket is treated as speaking that
/// bucket's locale even when it declares no locales itself.
fn base_language_fallback<'a>(catalog: &'a VoiceCatalog, want: &str) -> Option<&'a VoiceEntry> {
    let (base, _) = want.split_once('-')?;
    if base.is_empty() {
        return None;
    }
    let prefix = format!("{base}-");

    catalog.buckets().find_map(|(key, entries)| {
        let bucket_matches = key != MULTI_LOCALE_BUCKET && key.starts_with(&prefix);
        entries
            .iter()
            .find(|v| bucket_matches || v.declares_locale_prefix(&prefix))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(json: &str) -> VoiceCatalog {
        VoiceCatalog::from_json(json).unwrap()
    }

    fn sample() -> VoiceCatalog {
        catalog(
            r#"{
            "en-US": [
                { "id": "en-natalie", "styles": ["Promo"] },
                { "id": "en-ken", "styles": ["Conversational", "Calm"] }
            ],
            "fr-FR": [
                { "id": "fr-misplaced-en", "locales": ["en-US"] }
            ],
            "multi-locale": [
                { "id": "multi-ava", "locales": ["en-US", "de-DE"], "styles": ["Promo"] }
            ]
        }"#,
        )
    }

    #[test]
    fn test_override_wins_regardless_of_catalog() {
        let empty = VoiceCatalog::default();
        assert_eq!(
            resolve(&empty, Some("zz-ZZ"), Some("Promo"), Some("explicit-id")).unwrap(),
            "explicit-id"
        );
        assert_eq!(
            resolve(&sample(), Some("en-US"), None, Some("explicit-id")).unwrap(),
            "explicit-id"
        );
    }

    #[test]
    fn test_blank_override_is_ignored() {
        assert_eq!(
            resolve(&sample(), Some("en-US"), None, Some("  ")).unwrap(),
            "en-natalie"
        );
    }

    #[test]
    fn test_exact_locale_first_entry() {
        assert_eq!(
            resolve(&sample(), Some("en-us"), None, None).unwrap(),
            "en-natalie"
        );
    }

    #[test]
    fn test_empty_locale_defaults_to_en_us() {
        assert_eq!(resolve(&sample(), None, None, None).unwrap(), "en-natalie");
        assert_eq!(resolve(&sample(), Some(""), None, None).unwrap(), "en-natalie");
    }

    #[test]
    fn test_style_match_is_case_insensitive() {
        assert_eq!(
            resolve(&sample(), Some("en-US"), Some("calm"), None).unwrap(),
            "en-ken"
        );
    }

    #[test]
    fn test_unknown_style_falls_back_to_first_candidate() {
        assert_eq!(
            resolve(&sample(), Some("en-US"), Some("Whisper"), None).unwrap(),
            "en-natalie"
        );
    }

    #[test]
    fn test_candidate_order_and_dedup() {
        let catalog = sample();
        let voices: Vec<_> = candidates_for_locale(&catalog, "EN-US")
            .into_iter()
            .map(|v| v.id.as_str())
            .collect();
        assert_eq!(
            voices,
            vec!["en-natalie", "en-ken", "multi-ava", "fr-misplaced-en"]
        );
    }

    #[test]
    fn test_multi_locale_entry_found() {
        assert_eq!(
            resolve(&sample(), Some("de-DE"), None, None).unwrap(),
            "multi-ava"
        );
    }

    #[test]
    fn test_misplaced_entry_found() {
        let c = catalog(r#"{ "fr-FR": [{ "id": "fr-1" }, { "id": "it-1", "locales": ["it-IT"] }] }"#);
        assert_eq!(resolve(&c, Some("it-IT"), None, None).unwrap(), "it-1");
    }

    #[test]
    fn test_base_language_fallback() {
        let c = catalog(r#"{ "es-ES": [{ "id": "es-1" }, { "id": "es-2" }] }"#);
        let voice = resolve(&c, Some("ES-AR"), Some("Promo"), None).unwrap();
        assert_eq!(voice, "es-1");
    }

    #[test]
    fn test_base_language_fallback_via_declared_locales() {
        let c = catalog(r#"{ "multi-locale": [{ "id": "m1", "locales": ["pt-BR"] }] }"#);
        assert_eq!(resolve(&c, Some("pt-PT"), None, None).unwrap(), "m1");
    }

    #[test]
    fn test_no_voice_for_locale() {
        let c = catalog(r#"{ "es-ES": [{ "id": "es-1" }] }"#);
        assert_eq!(
            resolve(&c, Some("zz-ZZ"), None, None),
            Err(VoiceError::NoVoiceForLocale("zz-ZZ".to_string()))
        );
        // No region subtag means no base-language tier.
        assert!(resolve(&c, Some("es"), None, None).is_err());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let c = sample();
        for (locale, style) in [
            (Some("en-US"), Some("Calm")),
            (Some("de-DE"), None),
            (Some("en-GB"), Some("Promo")),
        ] {
            let first = resolve(&c, locale, style, None);
            let second = resolve(&c, locale, style, None);
            assert_eq!(first, second);
        }
    }
}
