use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use serde::de::Deserializer;
use serde::Deserialize;

use crate::search::SearchFields;

const CONFIG_FILE_NAME: &str = "config.toml";
const STORE_FILE_NAME: &str = "store.json";
const APP_NAME: &str = "shopease";
const DEFAULT_CURRENCY: &str = "DH";

#[derive(Debug, Clone)]
pub struct Config {
    /// File the configuration was read from; `None` when running on defaults.
    pub config_path: Option<PathBuf>,
    pub store_path: PathBuf,
    pub currency: String,
    pub search_fields: SearchFields,
    pub nav_variant: NavVariant,
    pub keys: Keys,
    pub ui: UiConfig,
}

// =============================================================================
// Navigation bar variant
// =============================================================================

/// Which navigation bar to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavVariant {
    /// Shop links, search field and account icons
    #[default]
    Default,
    /// Login / Signup only
    Auth,
}

impl NavVariant {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Some(NavVariant::Default),
            "auth" => Some(NavVariant::Auth),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub colors: UiColors,
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub separator: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

// =============================================================================
// Key Bindings - Context-aware with multiple bindings per action
// =============================================================================

/// All key bindings organized by context
#[derive(Debug, Clone)]
pub struct Keys {
    /// Keys active whenever the search field is not focused
    pub global: GlobalKeys,
    /// Keys for the focused search field
    pub search_input: SearchInputKeys,
    /// Keys for the search results list
    pub results: ResultsKeys,
}

#[derive(Debug, Clone)]
pub struct GlobalKeys {
    pub quit: Vec<String>,
    pub search: Vec<String>,
    pub help: Vec<String>,
    pub back: Vec<String>,
    pub shop: Vec<String>,
    pub men: Vec<String>,
    pub women: Vec<String>,
    pub wishlist: Vec<String>,
    pub account: Vec<String>,
    pub cart: Vec<String>,
    pub login: Vec<String>,
    pub signup: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SearchInputKeys {
    pub cancel: Vec<String>,
    pub confirm: Vec<String>,
    pub voice: Vec<String>,
    pub image: Vec<String>,
    pub ai_mode: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResultsKeys {
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub page_down: Vec<String>,
    pub page_up: Vec<String>,
    pub first: Vec<String>,
    pub last: Vec<String>,
}

// =============================================================================
// Default implementations
// =============================================================================

impl Default for Keys {
    fn default() -> Self {
        Self {
            global: GlobalKeys::default(),
            search_input: SearchInputKeys::default(),
            results: ResultsKeys::default(),
        }
    }
}

impl Default for GlobalKeys {
    fn default() -> Self {
        Self {
            quit: vec!["q".into()],
            search: vec!["/".into()],
            help: vec!["F1".into(), "?".into()],
            back: vec!["b".into(), "Backspace".into()],
            shop: vec!["1".into()],
            men: vec!["2".into()],
            women: vec!["3".into()],
            wishlist: vec!["w".into()],
            account: vec!["a".into()],
            cart: vec!["c".into()],
            login: vec!["l".into()],
            signup: vec!["s".into()],
        }
    }
}

impl Default for SearchInputKeys {
    fn default() -> Self {
        Self {
            cancel: vec!["Escape".into()],
            confirm: vec!["Enter".into()],
            voice: vec!["F2".into()],
            image: vec!["F3".into()],
            ai_mode: vec!["F4".into()],
        }
    }
}

impl Default for ResultsKeys {
    fn default() -> Self {
        Self {
            next: vec!["j".into(), "Down".into()],
            prev: vec!["k".into(), "Up".into()],
            page_down: vec!["PageDown".into()],
            page_up: vec!["PageUp".into()],
            first: vec!["g".into(), "Home".into()],
            last: vec!["G".into(), "End".into()],
        }
    }
}

impl Default for UiColors {
    fn default() -> Self {
        Self {
            border: RgbColor::new(255, 165, 0),
            selection_bg: RgbColor::new(255, 165, 0),
            selection_fg: RgbColor::new(0, 0, 0),
            separator: RgbColor::new(255, 165, 0),
            status_fg: RgbColor::new(255, 165, 0),
            status_bg: RgbColor::new(0, 0, 0),
        }
    }
}

// =============================================================================
// Serde deserialization types (support both single string and array)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyBinding {
    Single(String),
    Multiple(Vec<String>),
}

impl KeyBinding {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeyBinding::Single(s) => vec![s],
            KeyBinding::Multiple(v) => v,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct KeysFile {
    global: GlobalKeysFile,
    search_input: SearchInputKeysFile,
    results: ResultsKeysFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GlobalKeysFile {
    quit: KeyBinding,
    search: KeyBinding,
    help: KeyBinding,
    back: KeyBinding,
    shop: KeyBinding,
    men: KeyBinding,
    women: KeyBinding,
    wishlist: KeyBinding,
    account: KeyBinding,
    cart: KeyBinding,
    login: KeyBinding,
    signup: KeyBinding,
}

impl Default for GlobalKeysFile {
    fn default() -> Self {
        let defaults = GlobalKeys::default();
        Self {
            quit: KeyBinding::Multiple(defaults.quit),
            search: KeyBinding::Multiple(defaults.search),
            help: KeyBinding::Multiple(defaults.help),
            back: KeyBinding::Multiple(defaults.back),
            shop: KeyBinding::Multiple(defaults.shop),
            men: KeyBinding::Multiple(defaults.men),
            women: KeyBinding::Multiple(defaults.women),
            wishlist: KeyBinding::Multiple(defaults.wishlist),
            account: KeyBinding::Multiple(defaults.account),
            cart: KeyBinding::Multiple(defaults.cart),
            login: KeyBinding::Multiple(defaults.login),
            signup: KeyBinding::Multiple(defaults.signup),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SearchInputKeysFile {
    cancel: KeyBinding,
    confirm: KeyBinding,
    voice: KeyBinding,
    image: KeyBinding,
    ai_mode: KeyBinding,
}

impl Default for SearchInputKeysFile {
    fn default() -> Self {
        let defaults = SearchInputKeys::default();
        Self {
            cancel: KeyBinding::Multiple(defaults.cancel),
            confirm: KeyBinding::Multiple(defaults.confirm),
            voice: KeyBinding::Multiple(defaults.voice),
            image: KeyBinding::Multiple(defaults.image),
            ai_mode: KeyBinding::Multiple(defaults.ai_mode),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ResultsKeysFile {
    next: KeyBinding,
    prev: KeyBinding,
    page_down: KeyBinding,
    page_up: KeyBinding,
    first: KeyBinding,
    last: KeyBinding,
}

impl Default for ResultsKeysFile {
    fn default() -> Self {
        let defaults = ResultsKeys::default();
        Self {
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            page_down: KeyBinding::Multiple(defaults.page_down),
            page_up: KeyBinding::Multiple(defaults.page_up),
            first: KeyBinding::Multiple(defaults.first),
            last: KeyBinding::Multiple(defaults.last),
        }
    }
}

// =============================================================================
// Conversion from file types to runtime types
// =============================================================================

impl From<KeysFile> for Keys {
    fn from(file: KeysFile) -> Self {
        Self {
            global: file.global.into(),
            search_input: file.search_input.into(),
            results: file.results.into(),
        }
    }
}

impl From<GlobalKeysFile> for GlobalKeys {
    fn from(file: GlobalKeysFile) -> Self {
        Self {
            quit: file.quit.into_vec(),
            search: file.search.into_vec(),
            help: file.help.into_vec(),
            back: file.back.into_vec(),
            shop: file.shop.into_vec(),
            men: file.men.into_vec(),
            women: file.women.into_vec(),
            wishlist: file.wishlist.into_vec(),
            account: file.account.into_vec(),
            cart: file.cart.into_vec(),
            login: file.login.into_vec(),
            signup: file.signup.into_vec(),
        }
    }
}

impl From<SearchInputKeysFile> for SearchInputKeys {
    fn from(file: SearchInputKeysFile) -> Self {
        Self {
            cancel: file.cancel.into_vec(),
            confirm: file.confirm.into_vec(),
            voice: file.voice.into_vec(),
            image: file.image.into_vec(),
            ai_mode: file.ai_mode.into_vec(),
        }
    }
}

impl From<ResultsKeysFile> for ResultsKeys {
    fn from(file: ResultsKeysFile) -> Self {
        Self {
            next: file.next.into_vec(),
            prev: file.prev.into_vec(),
            page_down: file.page_down.into_vec(),
            page_up: file.page_up.into_vec(),
            first: file.first.into_vec(),
            last: file.last.into_vec(),
        }
    }
}

/// Normalize a key binding string to a canonical form for collision detection.
/// Single characters preserve case (since 'G' means Shift+g, different from 'g').
/// Multi-character key names are case-insensitive (Enter, ENTER, enter are the same).
fn normalize_binding(binding: &str) -> String {
    let trimmed = binding.trim();
    if trimmed.chars().count() == 1 {
        trimmed.to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Check for collisions within a single context
fn check_context_collisions(bindings: &[(&str, &[String])], context_name: &str) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();

    for (action_name, keys) in bindings {
        for key in *keys {
            let normalized = normalize_binding(key);
            if normalized.is_empty() {
                continue;
            }
            if let Some(existing_action) = seen.get(&normalized) {
                bail!(
                    "key binding collision in [keys.{}]: '{}' is bound to both '{}' and '{}'",
                    context_name,
                    key,
                    existing_action,
                    action_name
                );
            }
            seen.insert(normalized, action_name);
        }
    }

    Ok(())
}

/// Validate all key bindings for collisions within each context.
/// The results list is browsed with the global keys active, so both are
/// checked together.
fn validate_key_bindings(keys: &Keys) -> Result<()> {
    let global: [(&str, &[String]); 12] = [
        ("quit", &keys.global.quit),
        ("search", &keys.global.search),
        ("help", &keys.global.help),
        ("back", &keys.global.back),
        ("shop", &keys.global.shop),
        ("men", &keys.global.men),
        ("women", &keys.global.women),
        ("wishlist", &keys.global.wishlist),
        ("account", &keys.global.account),
        ("cart", &keys.global.cart),
        ("login", &keys.global.login),
        ("signup", &keys.global.signup),
    ];
    check_context_collisions(&global, "global")?;

    check_context_collisions(
        &[
            ("cancel", &keys.search_input.cancel),
            ("confirm", &keys.search_input.confirm),
            ("voice", &keys.search_input.voice),
            ("image", &keys.search_input.image),
            ("ai_mode", &keys.search_input.ai_mode),
        ],
        "search_input",
    )?;

    let mut results: Vec<(&str, &[String])> = global.to_vec();
    results.extend_from_slice(&[
        ("next", keys.results.next.as_slice()),
        ("prev", keys.results.prev.as_slice()),
        ("page_down", keys.results.page_down.as_slice()),
        ("page_up", keys.results.page_up.as_slice()),
        ("first", keys.results.first.as_slice()),
        ("last", keys.results.last.as_slice()),
    ]);
    check_context_collisions(&results, "results")?;

    Ok(())
}

// =============================================================================
// Config file structure
// =============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    store: Option<PathBuf>,
    currency: Option<String>,
    search: SearchFile,
    nav: NavFile,
    keys: KeysFile,
    ui: UiFile,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SearchFile {
    fields: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct NavFile {
    variant: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct UiFile {
    colors: UiColorsFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiColorsFile {
    border: RgbColor,
    selection_bg: RgbColor,
    selection_fg: RgbColor,
    separator: RgbColor,
    status_fg: RgbColor,
    status_bg: RgbColor,
}

impl Default for UiColorsFile {
    fn default() -> Self {
        let defaults = UiColors::default();
        Self {
            border: defaults.border,
            selection_bg: defaults.selection_bg,
            selection_fg: defaults.selection_fg,
            separator: defaults.separator,
            status_fg: defaults.status_fg,
            status_bg: defaults.status_bg,
        }
    }
}

impl From<UiFile> for UiConfig {
    fn from(file: UiFile) -> Self {
        Self {
            colors: UiColors {
                border: file.colors.border,
                selection_bg: file.colors.selection_bg,
                selection_fg: file.colors.selection_fg,
                separator: file.colors.separator,
                status_fg: file.colors.status_fg,
                status_bg: file.colors.status_bg,
            },
        }
    }
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl<'de> serde::Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Array([u8; 3]),
            Map { r: u8, g: u8, b: u8 },
        }

        let helper = Helper::deserialize(deserializer)?;
        let (r, g, b) = match helper {
            Helper::Array(values) => (values[0], values[1], values[2]),
            Helper::Map { r, g, b } => (r, g, b),
        };
        Ok(RgbColor { r, g, b })
    }
}

/// Expand ~ to home directory in paths
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.config_dir().join(APP_NAME))
}

/// Directory for the default store file and the log file.
pub fn data_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.data_dir().join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Load the configuration.
///
/// An explicitly given file must exist. When no file is given, the default
/// location is used if present and built-in defaults otherwise.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file not found at {}", path.display());
            }
            Some(path.to_path_buf())
        }
        None => {
            let default = config_path()?;
            if default.exists() {
                Some(default)
            } else {
                tracing::debug!(path = %default.display(), "no configuration file, using defaults");
                None
            }
        }
    };

    match path {
        Some(path) => {
            let raw = fs::read_to_string(&path).with_context(|| {
                format!("failed to read configuration file at {}", path.display())
            })?;
            let mut config = from_toml_str(&raw)
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            config.config_path = Some(path);
            Ok(config)
        }
        None => from_toml_str(""),
    }
}

/// Build a configuration from TOML text. Paths are resolved but not checked.
pub fn from_toml_str(raw: &str) -> Result<Config> {
    let value: toml::Value = toml::from_str(raw).context("failed to parse configuration as TOML")?;

    warn_unknown_keys(&value);

    let cfg_file: ConfigFile = value
        .try_into()
        .context("failed to deserialize configuration")?;

    let store_path = match cfg_file.store {
        Some(path) => expand_tilde(&path),
        None => data_root()?.join(STORE_FILE_NAME),
    };

    let currency = cfg_file
        .currency
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_CURRENCY)
        .to_string();

    let search_fields = match cfg_file.search.fields.as_deref() {
        Some(value) => SearchFields::from_str(value).with_context(|| {
            format!("search.fields must be \"name\" or \"extended\", got \"{}\"", value)
        })?,
        None => SearchFields::default(),
    };

    let nav_variant = match cfg_file.nav.variant.as_deref() {
        Some(value) => NavVariant::from_str(value).with_context(|| {
            format!("nav.variant must be \"default\" or \"auth\", got \"{}\"", value)
        })?,
        None => NavVariant::default(),
    };

    let keys: Keys = cfg_file.keys.into();
    validate_key_bindings(&keys)?;

    Ok(Config {
        config_path: None,
        store_path,
        currency,
        search_fields,
        nav_variant,
        keys,
        ui: cfg_file.ui.into(),
    })
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn warn_unknown_keys(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    let known = HashSet::from(["store", "currency", "search", "nav", "keys", "ui"]);
    for key in table.keys() {
        if !known.contains(key.as_str()) {
            tracing::warn!("unknown configuration key `{}`", key);
        }
    }

    if let Some(search) = table.get("search") {
        warn_unknown_in_section(search, "search", &["fields"]);
    }
    if let Some(nav) = table.get("nav") {
        warn_unknown_in_section(nav, "nav", &["variant"]);
    }
    if let Some(keys) = table.get("keys") {
        warn_unknown_keys_section(keys);
    }
    if let Some(ui) = table.get("ui") {
        warn_unknown_in_section(ui, "ui", &["colors"]);
        if let Some(colors) = ui.get("colors") {
            warn_unknown_in_section(
                colors,
                "ui.colors",
                &["border", "selection_bg", "selection_fg", "separator", "status_fg", "status_bg"],
            );
        }
    }
}

fn warn_unknown_keys_section(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    for (context, section) in table {
        match context.as_str() {
            "global" => warn_unknown_in_section(
                section,
                "keys.global",
                &[
                    "quit", "search", "help", "back", "shop", "men", "women", "wishlist",
                    "account", "cart", "login", "signup",
                ],
            ),
            "search_input" => warn_unknown_in_section(
                section,
                "keys.search_input",
                &["cancel", "confirm", "voice", "image", "ai_mode"],
            ),
            "results" => warn_unknown_in_section(
                section,
                "keys.results",
                &["next", "prev", "page_down", "page_up", "first", "last"],
            ),
            other => tracing::warn!("unknown key binding context `keys.{}`", other),
        }
    }
}

fn warn_unknown_in_section(value: &toml::Value, section: &str, known: &[&str]) {
    let Some(table) = value.as_table() else {
        return;
    };
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            tracing::warn!("unknown configuration key `{}.{}`", section, key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = from_toml_str("").unwrap();
        assert_eq!(config.currency, "DH");
        assert_eq!(config.search_fields, SearchFields::Name);
        assert_eq!(config.nav_variant, NavVariant::Default);
        assert_eq!(config.keys.search_input.confirm, vec!["Enter".to_string()]);
        assert!(config.store_path.ends_with("store.json"));
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_full_file() {
        let raw = r#"
            store = "/srv/shop/state.json"
            currency = "EUR"

            [search]
            fields = "extended"

            [nav]
            variant = "auth"

            [keys.global]
            quit = ["q", "Q"]
            cart = "p"

            [keys.search_input]
            voice = "F6"

            [ui.colors]
            border = [1, 2, 3]
            status_bg = { r = 10, g = 20, b = 30 }
        "#;
        let config = from_toml_str(raw).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/srv/shop/state.json"));
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.search_fields, SearchFields::Extended);
        assert_eq!(config.nav_variant, NavVariant::Auth);
        assert_eq!(config.keys.global.quit, vec!["q".to_string(), "Q".to_string()]);
        assert_eq!(config.keys.global.cart, vec!["p".to_string()]);
        assert_eq!(config.keys.search_input.voice, vec!["F6".to_string()]);
        assert_eq!(config.keys.search_input.image, vec!["F3".to_string()]);
        assert_eq!(config.ui.colors.border, RgbColor::new(1, 2, 3));
        assert_eq!(config.ui.colors.status_bg, RgbColor::new(10, 20, 30));
    }

    #[test]
    fn test_invalid_enums_are_rejected() {
        assert!(from_toml_str("[search]\nfields = \"fuzzy\"").is_err());
        assert!(from_toml_str("[nav]\nvariant = \"admin\"").is_err());
    }

    #[test]
    fn test_collision_within_context() {
        let err = from_toml_str("[keys.global]\ncart = \"q\"").unwrap_err();
        assert!(err.to_string().contains("collision"));
    }

    #[test]
    fn test_collision_between_results_and_global() {
        let err = from_toml_str("[keys.results]\nnext = \"c\"").unwrap_err();
        assert!(err.to_string().contains("[keys.results]"));
    }

    #[test]
    fn test_single_char_bindings_are_case_sensitive() {
        assert_eq!(normalize_binding("G"), "G");
        assert_eq!(normalize_binding("ENTER"), "enter");
        assert!(from_toml_str("[keys.results]\nfirst = \"g\"\nlast = \"G\"").is_ok());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "currency = \"MAD\"\nunknown_key = 1\n").unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.currency, "MAD");
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
    }
}
