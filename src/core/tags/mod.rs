use std::collections::BTreeSet;

use serde::Serialize;

const PRODUCTS_PREFIX: &str = "general:products/";
const USE_CASE_PREFIX: &str = "general:use-case/";
const MARCHITECTURE_PREFIX: &str = "marketing:marchitecture/";
const INDUSTRY_PREFIX: &str = "marketing:industry/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCategory {
    Product,
    UseCase,
    Marchitecture,
    Industry,
}

impl TagCategory {
    const ALL: [TagCategory; 4] = [
        TagCategory::Product,
        TagCategory::UseCase,
        TagCategory::Marchitecture,
        TagCategory::Industry,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            TagCategory::Product => PRODUCTS_PREFIX,
            TagCategory::UseCase => USE_CASE_PREFIX,
            TagCategory::Marchitecture => MARCHITECTURE_PREFIX,
            TagCategory::Industry => INDUSTRY_PREFIX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagToken<'a> {
    Recognized(TagCategory, &'a str),
    Unrecognized(&'a str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Categories {
    pub products: BTreeSet<String>,
    pub use_cases: BTreeSet<String>,
    pub marchitecture: BTreeSet<String>,
    pub industries: BTreeSet<String>,
}

impl Categories {
    fn bucket_mut(&mut self, category: TagCategory) -> &mut BTreeSet<String> {
        match category {
            TagCategory::Product => &mut self.products,
            TagCategory::UseCase => &mut self.use_cases,
            TagCategory::Marchitecture => &mut self.marchitecture,
            TagCategory::Industry => &mut self.industries,
        }
    }

    pub fn len(&self) -> usize {
        self.products.len() + self.use_cases.len() + self.marchitecture.len() + self.industries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn classify_token(token: &str) -> TagToken<'_> {
    TagCategory::ALL
        .iter()
        .find_map(|category| {
            token
                .strip_prefix(category.prefix())
                .filter(|value| !value.trim().is_empty())
                .map(|value| TagToken::Recognized(*category, value))
        })
        .unwrap_or(TagToken::Unrecognized(token))
}

/// Splits a comma-joined taxonomy term into category buckets.
///
/// Tokens outside the four known namespaces are logged and dropped; they
/// never make the parse fail.
pub fn parse_tag_term(raw_tag_term: &str) -> Categories {
    let mut categories = Categories::default();
    for token in raw_tag_term.split(',').map(str::trim) {
        if token.is_empty() {
            continue;
        }
        match classify_token(token) {
            TagToken::Recognized(category, value) => {
                categories.bucket_mut(category).insert(value.to_string());
            }
            TagToken::Unrecognized(term) => {
                tracing::warn!(term, tag = raw_tag_term, "unexpected tag");
            }
        }
    }
    categories
}
