use serde::Deserialize;

use crate::catalog::{display_name, Catalog, Product};

/// Normalize a string for comparison: trimmed and lowercased.
/// Stored values are never altered.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

pub fn normalize_query(query: &str) -> Option<String> {
    let normalized = normalize(query);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Which product fields a query is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchFields {
    /// Display name only.
    #[default]
    Name,
    /// Display name, brand and description.
    Extended,
}

impl SearchFields {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Some(SearchFields::Name),
            "extended" => Some(SearchFields::Extended),
            _ => None,
        }
    }

    fn matches(self, product: &Product, needle: &str) -> bool {
        if normalize(display_name(product)).contains(needle) {
            return true;
        }
        match self {
            SearchFields::Name => false,
            SearchFields::Extended => [product.brand.as_deref(), product.description.as_deref()]
                .into_iter()
                .flatten()
                .any(|field| normalize(field).contains(needle)),
        }
    }
}

/// Products matching a query, in catalog order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    items: Vec<Product>,
}

impl ResultSet {
    pub fn items(&self) -> &[Product] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Filter a catalog snapshot by substring match on the normalized display
/// name. An empty query matches nothing.
pub fn filter(query: &str, catalog: &Catalog, fields: SearchFields) -> ResultSet {
    let Some(needle) = normalize_query(query) else {
        return ResultSet::default();
    };

    let items = catalog
        .iter()
        .filter(|product| fields.matches(product, &needle))
        .cloned()
        .collect();
    ResultSet { items }
}

pub fn count_label(count: usize) -> String {
    format!("{} produit(s)", count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> Catalog {
        Catalog::new(
            vec![
                Product::new(1).with_title("Red Shirt"),
                Product::new(2).with_title("Blue Jeans"),
                Product::new(3).with_name("Chemise à carreaux"),
                Product::new(4).with_title("Sweat-shirt capuche"),
            ],
            1,
        )
    }

    fn ids(results: &ResultSet) -> Vec<String> {
        results.iter().map(|p| p.id.to_string()).collect()
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  SHIRT "), Some("shirt".to_string()));
        assert_eq!(normalize_query("   "), None);
        assert_eq!(normalize_query(""), None);
    }

    #[test]
    fn test_scenario_single_match() {
        let catalog = Catalog::new(
            vec![
                Product::new(1).with_title("Red Shirt"),
                Product::new(2).with_title("Blue Jeans"),
            ],
            1,
        );
        let results = filter("shirt", &catalog, SearchFields::Name);
        assert_eq!(ids(&results), vec!["1"]);
        assert_eq!(count_label(results.len()), "1 produit(s)");
    }

    #[test]
    fn test_empty_query_yields_nothing() {
        let results = filter("", &sample_catalog(), SearchFields::Name);
        assert!(results.is_empty());
        assert_eq!(count_label(results.len()), "0 produit(s)");
        assert!(filter("   ", &sample_catalog(), SearchFields::Name).is_empty());
    }

    #[test]
    fn test_empty_catalog_yields_nothing() {
        assert!(filter("anything", &Catalog::empty(), SearchFields::Name).is_empty());
    }

    #[test]
    fn test_match_is_case_insensitive_and_ordered() {
        let results = filter("SHIRT", &sample_catalog(), SearchFields::Name);
        assert_eq!(ids(&results), vec!["1", "4"]);
    }

    #[test]
    fn test_match_uses_name_fallback() {
        let results = filter("CHEMISE", &sample_catalog(), SearchFields::Name);
        assert_eq!(ids(&results), vec!["3"]);
    }

    #[test]
    fn test_no_tokenization() {
        assert!(filter("shirt red", &sample_catalog(), SearchFields::Name).is_empty());
        assert_eq!(ids(&filter("d sh", &sample_catalog(), SearchFields::Name)), vec!["1"]);
    }

    #[test]
    fn test_extended_fields() {
        let mut product = Product::new(9).with_title("Air Max");
        product.brand = Some("Nike".to_string());
        product.description = Some("Chaussures de sport".to_string());
        let catalog = Catalog::new(vec![product], 1);

        assert!(filter("nike", &catalog, SearchFields::Name).is_empty());
        assert_eq!(filter("nike", &catalog, SearchFields::Extended).len(), 1);
        assert_eq!(filter("sport", &catalog, SearchFields::Extended).len(), 1);
    }

    #[test]
    fn test_search_fields_from_str() {
        assert_eq!(SearchFields::from_str("Name"), Some(SearchFields::Name));
        assert_eq!(SearchFields::from_str(" extended "), Some(SearchFields::Extended));
        assert_eq!(SearchFields::from_str("fuzzy"), None);
    }
}
