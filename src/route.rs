//! Navigation targets.
//!
//! A target is a path with an optional query string, e.g.
//! `/productcherche?q=red%20shirt`. The results view is reached through a
//! single recognized query parameter; every other page is addressed by path
//! alone.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

pub const SEARCH_PATH: &str = "/productcherche";
pub const QUERY_PARAM: &str = "q";

const HOME_PATH: &str = "/";
const MEN_PATH: &str = "/men";
const WOMEN_PATH: &str = "/women";
const CART_PATH: &str = "/cart-items";
const ACCOUNT_PATH: &str = "/account-details/profile";
const WISHLIST_PATH: &str = "/wishlist";
const LOGIN_PATH: &str = "/v1/login";
const REGISTER_PATH: &str = "/v1/register";

/// URL component encode set: everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("invalid percent escape at byte {position}")]
    InvalidEscape { position: usize },

    #[error("decoded query component is not valid UTF-8")]
    InvalidUtf8,
}

/// Percent-encode a string as a single URL component.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Decode a query string component. `+` stands for a space.
pub fn decode_component(value: &str) -> Result<String, RouteError> {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(RouteError::InvalidEscape { position: i });
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = value.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| RouteError::InvalidUtf8)
}

/// Split a target into its path and raw query string.
fn split_target(target: &str) -> (&str, &str) {
    let without_fragment = target.split('#').next().unwrap_or_default();
    match without_fragment.split_once('?') {
        Some((path, query)) => (path, query),
        None => (without_fragment, ""),
    }
}

/// Read a named parameter from the target's query string.
/// The first occurrence wins; a key without `=` has an empty value. Pairs
/// whose key does not decode are skipped, so only the named value can fail.
pub fn query_param(target: &str, name: &str) -> Result<Option<String>, RouteError> {
    let (_, query) = split_target(target);
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        match decode_component(raw_key) {
            Ok(key) if key == name => return decode_component(raw_value).map(Some),
            Ok(_) => {}
            Err(err) => {
                tracing::trace!(key = raw_key, error = %err, "skipping undecodable parameter");
            }
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Men,
    Women,
    Search { query: String },
    Cart,
    Account,
    Wishlist,
    Login,
    Register,
    NotFound { path: String },
}

impl Route {
    pub fn search(query: impl Into<String>) -> Self {
        Route::Search {
            query: query.into(),
        }
    }

    /// Parse a navigation target. Never fails: a missing or malformed search
    /// parameter is an empty search, an unknown path is `NotFound`.
    pub fn parse(target: &str) -> Self {
        let (path, _) = split_target(target);
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };

        match path {
            "" | HOME_PATH => Route::Home,
            MEN_PATH => Route::Men,
            WOMEN_PATH => Route::Women,
            SEARCH_PATH => {
                let query = match query_param(target, QUERY_PARAM) {
                    Ok(value) => value.unwrap_or_default(),
                    Err(err) => {
                        tracing::debug!(location = %target, error = %err, "undecodable search parameter");
                        String::new()
                    }
                };
                Route::Search { query }
            }
            CART_PATH => Route::Cart,
            ACCOUNT_PATH => Route::Account,
            WISHLIST_PATH => Route::Wishlist,
            LOGIN_PATH => Route::Login,
            REGISTER_PATH => Route::Register,
            other => Route::NotFound {
                path: other.to_string(),
            },
        }
    }

    pub fn to_target(&self) -> String {
        match self {
            Route::Home => HOME_PATH.to_string(),
            Route::Men => MEN_PATH.to_string(),
            Route::Women => WOMEN_PATH.to_string(),
            Route::Search { query } => {
                format!("{}?{}={}", SEARCH_PATH, QUERY_PARAM, encode_component(query))
            }
            Route::Cart => CART_PATH.to_string(),
            Route::Account => ACCOUNT_PATH.to_string(),
            Route::Wishlist => WISHLIST_PATH.to_string(),
            Route::Login => LOGIN_PATH.to_string(),
            Route::Register => REGISTER_PATH.to_string(),
            Route::NotFound { path } => path.clone(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "SHOP",
            Route::Men => "MEN",
            Route::Women => "WOMEN",
            Route::Search { .. } => "SEARCH",
            Route::Cart => "CART",
            Route::Account => "ACCOUNT",
            Route::Wishlist => "WISHLIST",
            Route::Login => "LOGIN",
            Route::Register => "SIGNUP",
            Route::NotFound { .. } => "NOT FOUND",
        }
    }
}
