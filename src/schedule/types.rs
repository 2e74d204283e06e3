use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical waste-collection categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Burnable,
    Plastic,
    BottlesCans,
}

/// Every spelling variant users type, paired with the category it stands for.
///
/// The canonical label of each category is listed first so that
/// normalizing a canonical label returns itself.
const SYNONYMS: &[(&str, Category)] = &[
    ("燃えるごみ", Category::Burnable),
    ("もえるごみ", Category::Burnable),
    ("燃えるゴミ", Category::Burnable),
    ("プラスチックごみ", Category::Plastic),
    ("プラスチックゴミ", Category::Plastic),
    ("びん缶ペットボトル", Category::BottlesCans),
    ("瓶缶ペットボトル", Category::BottlesCans),
];

impl Category {
    pub const ALL: [Category; 3] = [Category::Burnable, Category::Plastic, Category::BottlesCans];

    /// The label shown to users, which is also the canonical synonym.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Burnable => "燃えるごみ",
            Category::Plastic => "プラスチックごみ",
            Category::BottlesCans => "びん缶ペットボトル",
        }
    }

    /// Resolves an exact spelling variant to its category.
    pub fn from_synonym(text: &str) -> Option<Category> {
        SYNONYMS
            .iter()
            .find(|(variant, _)| *variant == text)
            .map(|(_, category)| *category)
    }

    pub fn synonyms(&self) -> impl Iterator<Item = &'static str> + '_ {
        SYNONYMS
            .iter()
            .filter(move |(_, category)| category == self)
            .map(|(variant, _)| *variant)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps a spelling variant to the canonical label, or `None` when the text
/// is not a known category.
pub fn normalize(text: &str) -> Option<&'static str> {
    Category::from_synonym(text).map(|category| category.label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synonyms_resolve_to_single_category() {
        assert_eq!(Category::from_synonym("もえるごみ"), Some(Category::Burnable));
        assert_eq!(Category::from_synonym("燃えるゴミ"), Some(Category::Burnable));
        assert_eq!(Category::from_synonym("プラスチックゴミ"), Some(Category::Plastic));
        assert_eq!(Category::from_synonym("瓶缶ペットボトル"), Some(Category::BottlesCans));
        assert_eq!(Category::from_synonym("粗大ごみ"), None);
        assert_eq!(Category::from_synonym(""), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for (variant, _) in SYNONYMS {
            let once = normalize(variant).unwrap();
            assert_eq!(normalize(once), Some(once));
        }
    }

    #[test]
    fn test_canonical_label_is_a_synonym() {
        for category in Category::ALL {
            assert_eq!(category.synonyms().next(), Some(category.label()));
            assert_eq!(Category::from_synonym(category.label()), Some(category));
        }
    }

    #[test]
    fn test_display_uses_label() {
        assert_eq!(Category::Plastic.to_string(), "プラスチックごみ");
    }
}
