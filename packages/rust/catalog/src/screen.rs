//! Plausibility screen for pattern-derived names.

use std::collections::HashSet;

use regex::Regex;

use chimei_shared::{Category, ChimeiError, Result};
use chimei_text::char_len;

use crate::builtin::{
    COMMON_SURNAMES, HONORIFICS, IMPLAUSIBLE_SHAPES, SHORT_NAME_CATEGORIES, TIME_PREFIXES,
};

/// Rejects matches that have the shape of a place name but read as a time
/// expression, an ordinary noun, or a person.
#[derive(Debug, Clone)]
pub struct Screen {
    time_prefixes: Vec<String>,
    shapes: Vec<Regex>,
    short_categories: Vec<Category>,
    surnames: HashSet<String>,
    honorifics: Vec<String>,
}

impl Screen {
    /// The built-in screen tables, compiled.
    pub fn builtin() -> Result<Self> {
        let shapes = IMPLAUSIBLE_SHAPES
            .iter()
            .map(|source| {
                Regex::new(source)
                    .map_err(|e| ChimeiError::pattern("implausible-shape", e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            time_prefixes: TIME_PREFIXES.iter().map(|p| p.to_string()).collect(),
            shapes,
            short_categories: SHORT_NAME_CATEGORIES.to_vec(),
            surnames: COMMON_SURNAMES.iter().map(|s| s.to_string()).collect(),
            honorifics: HONORIFICS.iter().map(|h| h.to_string()).collect(),
        })
    }

    /// Whether `name`, matched as `category` and followed in the sentence by
    /// `after`, can stand as a place name.
    pub fn admits(&self, name: &str, category: Category, after: &str) -> bool {
        if self.short_categories.contains(&category) && char_len(name) <= 2 {
            return false;
        }
        if self.time_prefixes.iter().any(|p| name.starts_with(p.as_str())) {
            return false;
        }
        if self.shapes.iter().any(|shape| shape.is_match(name)) {
            return false;
        }
        if self.surnames.contains(name) {
            return false;
        }
        !self.honorifics.iter().any(|h| after.starts_with(h.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen() -> Screen {
        Screen::builtin().expect("builtin screen")
    }

    #[test]
    fn two_char_city_and_natural_names_are_rejected() {
        let screen = screen();
        assert!(!screen.admits("沢山", Category::NaturalPlace, "の人"));
        assert!(!screen.admits("野原", Category::NaturalPlace, "に"));
        assert!(screen.admits("富士山", Category::NaturalPlace, "が"));
        assert!(screen.admits("湯島", Category::CompoundFacility, ""));
    }

    #[test]
    fn time_expressions_are_rejected() {
        let screen = screen();
        assert!(!screen.admits("今朝霧山", Category::NaturalPlace, ""));
        assert!(!screen.admits("昨日本郷", Category::CompoundDirection, ""));
        assert!(!screen.admits("午後三時", Category::NaturalPlace, ""));
    }

    #[test]
    fn common_noun_shapes_are_rejected() {
        let screen = screen();
        assert!(!screen.admits("大都市", Category::City, ""));
        assert!(!screen.admits("三人島", Category::NaturalPlace, ""));
        assert!(!screen.admits("本店", Category::CompoundDirection, ""));
        assert!(!screen.admits("大学病院", Category::TempleShrine, ""));
        assert!(screen.admits("八王子市", Category::City, ""));
        assert!(screen.admits("湯島神社", Category::TempleShrine, ""));
        assert!(screen.admits("浅草寺", Category::TempleShrine, ""));
    }

    #[test]
    fn people_are_rejected() {
        let screen = screen();
        assert!(!screen.admits("長谷川", Category::NaturalPlace, "が来た"));
        assert!(!screen.admits("小野寺", Category::TempleShrine, "は"));
        assert!(!screen.admits("青木島", Category::NaturalPlace, "さんの家"));
        assert!(screen.admits("青木島", Category::NaturalPlace, "の家"));
    }
}
