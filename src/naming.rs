//! # Naming Conventions
//!
//! Wire keys, relationship target types and registry kinds are all derived
//! from names by convention:
//!
//! | Input | Function | Output |
//! |-------|----------|--------|
//! | `CellPhone` | [`underscore`] | `cell_phone` |
//! | `cell_phone` | [`pluralize`] | `cell_phones` |
//! | `people` | [`singularize`] | `person` |
//! | `other_items` | [`classify`] | `OtherItem` |
//! | `json_api` | [`camelize`] | `JsonApi` |
//!
//! Inflection only touches the last underscore-separated word, so
//! `favorite_item` pluralizes to `favorite_items`.

use convert_case::{Case, Casing};

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "jeans",
    "police",
    "news",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("sex", "sexes"),
    ("move", "moves"),
    ("zombie", "zombies"),
    ("mouse", "mice"),
    ("ox", "oxen"),
];

/// Words ending in `ie` whose plural would otherwise singularize to `y`.
const IE_WORDS: &[&str] = &[
    "movie", "cookie", "rookie", "calorie", "brownie", "hoodie", "selfie",
];

/// `CellPhone` → `cell_phone`.
pub fn underscore(name: &str) -> String {
    name.to_case(Case::Snake)
}

/// `json_api` → `JsonApi`.
pub fn camelize(name: &str) -> String {
    name.to_case(Case::UpperCamel)
}

/// `other_items` → `OtherItem`.
pub fn classify(name: &str) -> String {
    camelize(&singularize(name))
}

/// Pluralizes the last word of an underscored name.
pub fn pluralize(name: &str) -> String {
    inflect_last_word(name, plural_word)
}

/// Singularizes the last word of an underscored name.
pub fn singularize(name: &str) -> String {
    inflect_last_word(name, singular_word)
}

fn inflect_last_word(name: &str, inflect: fn(&str) -> String) -> String {
    match name.rsplit_once('_') {
        Some((head, last)) => format!("{head}_{}", inflect(last)),
        None => inflect(name),
    }
}

fn plural_word(word: &str) -> String {
    let lower = word.to_lowercase();
    if word.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if lower == *singular {
            return (*plural).to_string();
        }
        if lower == *plural {
            return word.to_string();
        }
    }

    if lower.ends_with("quiz") {
        return format!("{word}zes");
    }
    for stem in ["matrix", "vertex", "index"] {
        if lower.ends_with(stem) {
            return format!("{}ices", &word[..word.len() - 2]);
        }
    }
    if ["x", "ch", "ss", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{word}es");
    }
    if let Some(stem) = lower.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u', 'y']) || stem.ends_with("qu") {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }
    if lower.ends_with("hive") {
        return format!("{word}s");
    }
    if lower.ends_with("fe") && !lower.ends_with("ffe") {
        return format!("{}ves", &word[..word.len() - 2]);
    }
    if lower.ends_with("lf") || lower.ends_with("rf") {
        return format!("{}ves", &word[..word.len() - 1]);
    }
    if lower.ends_with("sis") {
        return format!("{}ses", &word[..word.len() - 3]);
    }
    if lower.ends_with("tum") || lower.ends_with("ium") {
        return format!("{}a", &word[..word.len() - 2]);
    }
    if lower.ends_with("buffalo") || lower.ends_with("tomato") {
        return format!("{word}es");
    }
    if lower == "bus" || lower.ends_with("alias") || lower.ends_with("status") {
        return format!("{word}es");
    }
    if lower.ends_with("octopus") || lower.ends_with("virus") {
        return format!("{}i", &word[..word.len() - 2]);
    }
    if lower.ends_with('s') {
        return word.to_string();
    }
    format!("{word}s")
}

fn singular_word(word: &str) -> String {
    let lower = word.to_lowercase();
    if word.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if lower == *plural {
            return (*singular).to_string();
        }
        if lower == *singular {
            return word.to_string();
        }
    }

    let cut = |n: usize| &word[..word.len() - n];
    if lower.ends_with("quizzes") {
        return cut(3).to_string();
    }
    if lower.ends_with("matrices") {
        return format!("{}ix", cut(4));
    }
    if lower.ends_with("vertices") || lower.ends_with("indices") {
        return format!("{}ex", cut(4));
    }
    if lower.ends_with("aliases") || lower.ends_with("statuses") || lower.ends_with("buses") {
        return cut(2).to_string();
    }
    if lower.ends_with("octopi") || lower.ends_with("viri") {
        return format!("{}us", cut(1));
    }
    if lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
        return word.to_string();
    }
    if lower.ends_with("hives") {
        return cut(1).to_string();
    }
    if lower.ends_with("lves") || lower.ends_with("rves") {
        return format!("{}f", cut(3));
    }
    if lower.ends_with("ves") {
        return format!("{}fe", cut(3));
    }
    if IE_WORDS.iter().any(|w| lower.ends_with(&format!("{w}s"))) {
        return cut(1).to_string();
    }
    if let Some(stem) = lower.strip_suffix("ies") {
        if stem.len() > 1 {
            return format!("{}y", cut(3));
        }
    }
    if ["xes", "ches", "sses", "shes"].iter().any(|s| lower.ends_with(s)) {
        return cut(2).to_string();
    }
    if lower.ends_with("oes") && !lower.ends_with("shoes") {
        return cut(2).to_string();
    }
    if lower.ends_with("ses") && !lower.ends_with("uses") {
        for stem in ["analy", "ba", "diagno", "parenthe", "progno", "synop", "the"] {
            if lower.ends_with(&format!("{stem}ses")) {
                return format!("{}is", cut(3));
            }
        }
    }
    if lower.ends_with("ta") || lower.ends_with("ia") {
        return format!("{}um", cut(1));
    }
    if let Some(stem) = word.strip_suffix('s') {
        return stem.to_string();
    }
    word.to_string()
}
