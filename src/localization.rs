use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{error, warn};
use unic_langid::LanguageIdentifier;

const DEFAULT_LANGUAGE: &str = "en";

/// Bundled translations, keyed by language
const RESOURCES: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en/main.ftl")),
    ("fr", include_str!("../locales/fr/main.ftl")),
];

/// Localization manager for the bot
pub struct LocalizationManager {
    bundles: HashMap<&'static str, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a new localization manager with every bundled language loaded
    pub fn new() -> Self {
        let bundles = RESOURCES
            .iter()
            .map(|(language, source)| (*language, Self::create_bundle(language, source)))
            .collect();

        Self { bundles }
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(language: &str, source: &str) -> FluentBundle<FluentResource> {
        let locale: LanguageIdentifier = language.parse().unwrap_or_default();
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Replies are plain text, so no Unicode isolation marks around arguments
        bundle.set_use_isolating(false);

        let resource = match FluentResource::try_new(source.to_string()) {
            Ok(resource) => resource,
            Err((resource, errors)) => {
                error!(language, ?errors, "Failed to parse some localization messages");
                resource
            }
        };
        if let Err(errors) = bundle.add_resource(resource) {
            error!(language, ?errors, "Failed to add localization resource");
        }

        bundle
    }

    /// Pick the supported language for a Telegram language code
    pub fn resolve_language(language_code: Option<&str>) -> &'static str {
        match language_code {
            Some(code) if code.to_ascii_lowercase().starts_with("fr") => "fr",
            _ => DEFAULT_LANGUAGE,
        }
    }

    /// Get a localized message, falling back to English for missing keys
    pub fn get_message(&self, key: &str, args: Option<&FluentArgs>, language_code: Option<&str>) -> String {
        let language = Self::resolve_language(language_code);

        [language, DEFAULT_LANGUAGE]
            .iter()
            .find_map(|lang| self.format(lang, key, args))
            .unwrap_or_else(|| {
                warn!(key, "Missing translation");
                format!("Missing translation: {key}")
            })
    }

    fn format(&self, language: &str, key: &str, args: Option<&FluentArgs>) -> Option<String> {
        let bundle = self.bundles.get(language)?;
        let pattern = bundle.get_message(key)?.value()?;

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            warn!(key, language, ?errors, "Errors while formatting message");
        }
        Some(value.into_owned())
    }
}

impl Default for LocalizationManager {
    fn default() -> Self {
        Self::new()
    }
}

static LOCALIZATION_MANAGER: LazyLock<LocalizationManager> = LazyLock::new(LocalizationManager::new);

/// Load the translations eagerly so parse errors show up at startup
pub fn init_localization() {
    LazyLock::force(&LOCALIZATION_MANAGER);
}

/// Get the global localization manager
pub fn get_localization_manager() -> &'static LocalizationManager {
    &LOCALIZATION_MANAGER
}

/// Localized message in the user's language
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    get_localization_manager().get_message(key, None, language_code)
}

/// Localized message with arguments in the user's language
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    let mut fluent_args = FluentArgs::new();
    for (name, value) in args {
        fluent_args.set(*name, *value);
    }
    get_localization_manager().get_message(key, Some(&fluent_args), language_code)
}
