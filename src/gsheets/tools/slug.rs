//! Identifier-safe column names.

use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;

/// Replacement used when a name normalises to nothing.
pub const EMPTY_SLUG: &str = "none";

const SEPARATOR: char = '_';

/// Normalises a single name: apostrophes split words, the rest is
/// transliterated to ASCII and runs of disallowed characters collapse into
/// `_`. Case is preserved.
pub fn slugify(name: &str, max_length: Option<usize>) -> String {
    let split = name.replace('\'', "-");
    // Transliteration may still leave marks or quotes behind.
    let ascii: String = deunicode::deunicode(&split)
        .nfkd()
        .filter(|ch| !unicode_normalization::char::is_combining_mark(*ch))
        .filter(char::is_ascii)
        .filter(|ch| *ch != '\'')
        .collect();
    let ascii = strip_digit_group_commas(&ascii);

    let mut dashed = String::with_capacity(ascii.len());
    for ch in ascii.chars() {
        let ch = if ch.is_ascii_alphanumeric() { ch } else { '-' };
        if ch == '-' && dashed.ends_with('-') {
            continue;
        }
        dashed.push(ch);
    }

    let mut slug = dashed.trim_matches('-').to_string();
    if let Some(max_length) = max_length {
        if slug.len() > max_length {
            slug.truncate(max_length);
            slug = slug.trim_matches('-').to_string();
        }
    }
    slug.replace('-', &SEPARATOR.to_string())
}

fn strip_digit_group_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    chars
        .iter()
        .enumerate()
        .filter(|(idx, ch)| {
            let between_digits = **ch == ','
                && *idx > 0
                && chars[idx - 1].is_ascii_digit()
                && chars.get(idx + 1).is_some_and(char::is_ascii_digit);
            !between_digits
        })
        .map(|(_, ch)| *ch)
        .collect()
}

/// Hands out slugs that are unique within one generation pass.
#[derive(Debug, Default)]
pub struct SlugRegistry {
    max_length: Option<usize>,
    used: HashSet<String>,
}

impl SlugRegistry {
    pub fn new(max_length: Option<usize>) -> Self {
        Self {
            max_length,
            used: HashSet::new(),
        }
    }

    /// Marks a name as taken without slugging it.
    pub fn claim(&mut self, name: impl Into<String>) {
        self.used.insert(name.into());
    }

    /// Returns the unique slug for `name`, suffixing `_N` on collision.
    pub fn assign(&mut self, name: &str) -> String {
        let mut base = slugify(name, self.max_length);
        if base.is_empty() {
            base = EMPTY_SLUG.to_string();
        }
        if self.used.insert(base.clone()) {
            return base;
        }

        let mut counter = 1;
        loop {
            let candidate = format!("{base}{SEPARATOR}{counter}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Slugs every name, keeping order and guaranteeing uniqueness.
pub fn unique_slugs<S: AsRef<str>>(names: &[S], max_length: Option<usize>) -> Vec<String> {
    let mut registry = SlugRegistry::new(max_length);
    names
        .iter()
        .map(|name| registry.assign(name.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_case_and_replaces_separators() {
        assert_eq!(slugify("Order Date", None), "Order_Date");
        assert_eq!(slugify("  price (EUR) ", None), "price_EUR");
        assert_eq!(slugify("a--b__c", None), "a_b_c");
    }

    #[test]
    fn transliterates_accents() {
        assert_eq!(slugify("Café crème", None), "Cafe_creme");
    }

    #[test]
    fn apostrophes_split_words_and_digit_commas_vanish() {
        assert_eq!(slugify("Owner's name", Some(25)), "Owner_s_name");
        assert_eq!(slugify("C'est l'été", None), "C_est_l_ete");
        assert_eq!(slugify("total 1,000", None), "total_1000");
    }

    #[test]
    fn transliterates_other_scripts_and_symbols() {
        assert_eq!(slugify("Größe", None), "Grosse");
        assert_eq!(slugify("Total (€)", None), "Total_EUR");
        for name in ["Имя", "Фамилия", "北京"] {
            let slug = slugify(name, None);
            assert!(!slug.is_empty(), "{name} slugged to nothing");
            assert!(slug.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_'));
        }
    }

    #[test]
    fn transliterated_duplicates_still_get_suffixes() {
        let slugs = unique_slugs(&["Total (€)", "Total (€)", "Größe"], Some(25));
        assert_eq!(slugs, vec!["Total_EUR", "Total_EUR_1", "Grosse"]);
    }

    #[test]
    fn truncates_then_trims() {
        assert_eq!(slugify("abcd efgh", Some(5)), "abcd");
        assert_eq!(slugify("abcdefghij", Some(4)), "abcd");
    }

    #[test]
    fn suffixes_collisions_in_order() {
        let slugs = unique_slugs(&["name", "name", "", "name", "  "], None);
        assert_eq!(slugs, vec!["name", "name_1", "none", "name_2", "none_1"]);
    }

    #[test]
    fn suffix_skips_names_already_emitted() {
        let slugs = unique_slugs(&["a_1", "a", "a"], None);
        assert_eq!(slugs, vec!["a_1", "a", "a_2"]);
    }
}
