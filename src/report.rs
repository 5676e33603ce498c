//! # Analysis Report Module
//!
//! The report returned by the analysis service is free text. [`NutritionFacts`]
//! is a best-effort structured view of it, used for logging; the raw text is
//! what users see and what gets stored.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // "Calories: 95 kcal", "- **Protein:** 0.5 g", "Glucides : 25 g"
    static ref LABELLED_LINE: Regex =
        Regex::new(r"^[\s\-*•]*([A-Za-zÀ-ÿ ]+?)[\s*]*:[\s*]*(.+?)[\s*]*$")
            .expect("Labelled line pattern should be valid");
    static ref NUMBER: Regex =
        Regex::new(r"(\d+(?:[.,]\d+)?)").expect("Number pattern should be valid");
}

/// Nutrition report produced by the analysis service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    text: String,
}

impl AnalysisReport {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn nutrition_facts(&self) -> NutritionFacts {
        NutritionFacts::parse(&self.text)
    }
}

/// Structured fields found in a report, if the model followed the requested layout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutritionFacts {
    pub food: Option<String>,
    pub calories_kcal: Option<f32>,
    pub protein_g: Option<f32>,
    pub carbs_g: Option<f32>,
    pub fats_g: Option<f32>,
}

impl NutritionFacts {
    pub fn parse(text: &str) -> Self {
        let mut facts = Self::default();

        for line in text.lines() {
            let Some(captures) = LABELLED_LINE.captures(line) else {
                continue;
            };
            let label = captures[1].trim().to_lowercase();
            let value = captures[2].trim();

            match label.as_str() {
                "food" | "dish" | "aliment" | "plat" => {
                    if facts.food.is_none() && !value.is_empty() {
                        facts.food = Some(value.to_string());
                    }
                }
                "calories" | "energy" | "énergie" => set_once(&mut facts.calories_kcal, value),
                "protein" | "proteins" | "protéines" | "proteines" => set_once(&mut facts.protein_g, value),
                "carbs" | "carbohydrates" | "glucides" => set_once(&mut facts.carbs_g, value),
                "fat" | "fats" | "lipides" | "matières grasses" => set_once(&mut facts.fats_g, value),
                _ => {}
            }
        }

        facts
    }

    pub fn is_complete(&self) -> bool {
        self.food.is_some()
            && self.calories_kcal.is_some()
            && self.protein_g.is_some()
            && self.carbs_g.is_some()
            && self.fats_g.is_some()
    }
}

fn set_once(slot: &mut Option<f32>, value: &str) {
    if slot.is_some() {
        return;
    }
    *slot = NUMBER
        .captures(value)
        .and_then(|c| c[1].replace(',', ".").parse().ok());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_layout() {
        let report = AnalysisReport::new(
            "Food: Apple\nCalories: 95 kcal\nProtein: 0.5 g\nCarbs: 25 g\nFats: 0.3 g",
        );
        let facts = report.nutrition_facts();

        assert_eq!(facts.food.as_deref(), Some("Apple"));
        assert_eq!(facts.calories_kcal, Some(95.0));
        assert_eq!(facts.protein_g, Some(0.5));
        assert_eq!(facts.carbs_g, Some(25.0));
        assert_eq!(facts.fats_g, Some(0.3));
        assert!(facts.is_complete());
    }

    #[test]
    fn test_parse_markdown_and_french() {
        let facts = NutritionFacts::parse(
            "- **Aliment :** Croissant\n- **Calories :** ~ 230 kcal\n- **Protéines :** 4,5 g\n- **Glucides :** 26 g",
        );

        assert_eq!(facts.food.as_deref(), Some("Croissant"));
        assert_eq!(facts.calories_kcal, Some(230.0));
        assert_eq!(facts.protein_g, Some(4.5));
        assert_eq!(facts.carbs_g, Some(26.0));
        assert_eq!(facts.fats_g, None);
        assert!(!facts.is_complete());
    }

    #[test]
    fn test_free_text_yields_nothing() {
        let facts = NutritionFacts::parse("This looks like a bowl of ramen, roughly 500 calories.");
        assert_eq!(facts, NutritionFacts::default());
    }
}
