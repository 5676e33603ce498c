//! # Localization Tests
//!
//! Checks that every bundled language defines the same messages and that the
//! English replies match the wording users see.

use fluent_bundle::FluentArgs;
use nutribot::localization::{t_args_lang, t_lang, LocalizationManager};
use std::collections::BTreeSet;

fn message_keys(language: &str) -> BTreeSet<String> {
    let path = format!("{}/locales/{language}/main.ftl", env!("CARGO_MANIFEST_DIR"));
    let source = std::fs::read_to_string(&path).expect("locale file should exist");

    source
        .lines()
        .filter(|line| !line.starts_with('#') && !line.starts_with(' '))
        .filter_map(|line| line.split_once(" = ").map(|(key, _)| key.trim().to_string()))
        .collect()
}

#[test]
fn test_languages_define_the_same_keys() {
    let english = message_keys("en");
    let french = message_keys("fr");

    assert!(!english.is_empty());
    assert_eq!(
        english.difference(&french).collect::<Vec<_>>(),
        Vec::<&String>::new(),
        "keys missing from fr"
    );
    assert_eq!(
        french.difference(&english).collect::<Vec<_>>(),
        Vec::<&String>::new(),
        "keys missing from en"
    );
}

#[test]
fn test_every_key_resolves_in_every_language() {
    let manager = LocalizationManager::new();
    let mut args = FluentArgs::new();
    args.set("size", "1 MB");
    args.set("max", "2 MB");
    args.set("width", "9000");
    args.set("height", "9000");

    for key in message_keys("en") {
        for language in ["en", "fr"] {
            let message = manager.get_message(&key, Some(&args), Some(language));
            assert!(!message.is_empty(), "{key} is empty in {language}");
            assert!(!message.starts_with("Missing translation"), "{key} missing in {language}");
        }
    }
}

#[test]
fn test_english_reply_wording() {
    assert_eq!(t_lang("report-header", None), "Here's what I found:");
    assert_eq!(t_lang("history-title", Some("en")), "📜 Your analysis history:");
    assert_eq!(
        t_lang("history-empty", Some("en-US")),
        "You have no history yet. Send me a food photo to get started!"
    );
    assert_eq!(t_lang("history-cleared", None), "Your history has been cleared!");
    assert_eq!(
        t_lang("error-processing-failed", None),
        "Sorry, I couldn't process the image. Please try again later."
    );
}

#[test]
fn test_language_resolution() {
    assert_eq!(LocalizationManager::resolve_language(Some("fr")), "fr");
    assert_eq!(LocalizationManager::resolve_language(Some("fr-CA")), "fr");
    assert_eq!(LocalizationManager::resolve_language(Some("FR")), "fr");
    assert_eq!(LocalizationManager::resolve_language(Some("de")), "en");
    assert_eq!(LocalizationManager::resolve_language(None), "en");
}

#[test]
fn test_unsupported_language_falls_back_to_english() {
    assert_eq!(t_lang("report-header", Some("es")), t_lang("report-header", Some("en")));
}

#[test]
fn test_missing_key() {
    assert_eq!(t_lang("no-such-message", Some("fr")), "Missing translation: no-such-message");
}

#[test]
fn test_arguments_are_interpolated_without_isolation_marks() {
    let message = t_args_lang("error-image-too-large", &[("size", "25.0 MB"), ("max", "20.0 MB")], None);

    assert!(message.contains("25.0 MB"));
    assert!(message.contains("20.0 MB"));
    assert!(!message.contains('\u{2068}'));
}
