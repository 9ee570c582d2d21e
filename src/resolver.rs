//! Derives the search results page from a navigation target and a catalog
//! snapshot.

use crate::catalog::{Catalog, Product};
use crate::route::{query_param, QUERY_PARAM};
use crate::search::{self, ResultSet, SearchFields};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsPage {
    /// Decoded query, exactly as it appeared in the target.
    pub query: String,
    pub results: ResultSet,
}

/// One displayable result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub image: String,
    pub name: String,
    pub price: String,
}

impl ResultRow {
    fn from_product(product: &Product, currency: &str) -> Self {
        Self {
            image: product.image_label().to_string(),
            name: product.display_name().to_string(),
            price: product.price_label(currency),
        }
    }
}

impl ResultsPage {
    pub fn heading(&self) -> String {
        format!("Résultats pour : \"{}\"", self.query)
    }

    pub fn count_label(&self) -> String {
        search::count_label(self.results.len())
    }

    pub fn rows(&self, currency: &str) -> Vec<ResultRow> {
        self.results
            .iter()
            .map(|product| ResultRow::from_product(product, currency))
            .collect()
    }
}

/// Read the search query from a target. Absent or undecodable parameters
/// are the empty query.
pub fn query_from_target(target: &str) -> String {
    match query_param(target, QUERY_PARAM) {
        Ok(query) => query.unwrap_or_default(),
        Err(err) => {
            tracing::debug!(location = %target, error = %err, "treating undecodable query as empty");
            String::new()
        }
    }
}

pub fn resolve(target: &str, catalog: &Catalog, fields: SearchFields) -> ResultsPage {
    resolve_query(query_from_target(target), catalog, fields)
}

fn resolve_query(query: String, catalog: &Catalog, fields: SearchFields) -> ResultsPage {
    let results = search::filter(&query, catalog, fields);
    ResultsPage { query, results }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MemoKey {
    query: String,
    revision: u64,
    fields: SearchFields,
}

/// Memoizing resolver: the page is recomputed only when the query, the
/// catalog revision or the searched fields change.
#[derive(Debug, Default)]
pub struct Resolver {
    key: Option<MemoKey>,
    page: ResultsPage,
    #[cfg(test)]
    computations: usize,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, target: &str, catalog: &Catalog, fields: SearchFields) -> &ResultsPage {
        let key = MemoKey {
            query: query_from_target(target),
            revision: catalog.revision(),
            fields,
        };

        if self.key.as_ref() != Some(&key) {
            #[cfg(test)]
            {
                self.computations += 1;
            }
            self.page = resolve_query(key.query.clone(), catalog, fields);
            tracing::debug!(
                query = %self.page.query,
                revision = key.revision,
                count = self.page.results.len(),
                "resolved search results"
            );
            self.key = Some(key);
        }

        &self.page
    }

    /// The last resolved page.
    pub fn page(&self) -> &ResultsPage {
        &self.page
    }

    /// How many times the page was actually recomputed.
    #[cfg(test)]
    pub fn computations(&self) -> usize {
        self.computations
    }
}
