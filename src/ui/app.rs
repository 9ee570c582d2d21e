use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::capture::{SearchBar, SearchIntent};
use crate::config::{Config, NavVariant, UiColors};
use crate::history::{History, Navigator};
use crate::resolver::{ResultsPage, Resolver};
use crate::route::Route;
use crate::store::{StoreSnapshot, StoreSource};

use super::draw;

const PAGE_STEP: isize = 5;

/// Where keyboard input goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// The search field of the navigation bar
    Search,
    /// The page below the navigation bar
    Page,
}

/// Help modal state with scroll support
#[derive(Debug, Clone)]
pub struct HelpModal {
    /// Current scroll offset (line index at top of viewport)
    pub scroll: usize,
    /// Total number of content lines
    pub total_lines: usize,
    /// Viewport height (set during rendering)
    pub viewport_height: usize,
}

impl HelpModal {
    pub fn new(total_lines: usize) -> Self {
        Self {
            scroll: 0,
            total_lines,
            viewport_height: 10,
        }
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let max_scroll = self.total_lines.saturating_sub(self.viewport_height);
        self.scroll = (self.scroll + lines).min(max_scroll);
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn can_scroll_up(&self) -> bool {
        self.scroll > 0
    }

    pub fn can_scroll_down(&self) -> bool {
        self.scroll + self.viewport_height < self.total_lines
    }
}

/// A section in the help modal (e.g., "Global", "Search Field")
pub struct HelpSection {
    pub title: &'static str,
    pub entries: Vec<HelpEntry>,
}

/// A single help entry (action name + key bindings)
pub struct HelpEntry {
    pub action: &'static str,
    pub keys: String,
}

pub struct App<'a> {
    config: &'a Config,
    store: Box<dyn StoreSource + 'a>,
    snapshot: StoreSnapshot,
    store_error: Option<String>,
    history: History,
    resolver: Resolver,
    pub search_bar: SearchBar,
    pub focus: Focus,
    pub selected: usize,
    pub status: Option<String>,
    pub help_modal: Option<HelpModal>,
}

impl<'a> App<'a> {
    pub fn new(config: &'a Config, store: Box<dyn StoreSource + 'a>) -> Self {
        let snapshot = store.snapshot();
        let mut app = Self {
            config,
            store,
            snapshot,
            store_error: None,
            history: History::new(),
            resolver: Resolver::new(),
            search_bar: SearchBar::new(),
            focus: Focus::Page,
            selected: 0,
            status: None,
            help_modal: None,
        };
        // An unreadable store starts the UI on an empty catalog
        app.poll_store();
        app.refresh_results();
        app
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(250))? {
                match event::read()? {
                    Event::Key(key) => {
                        if self.handle_key(key) {
                            break;
                        }
                    }
                    Event::Resize(_, _) => {}
                    _ => {}
                }
            }

            self.poll_store();
        }
        Ok(())
    }

    // =========================================================================
    // Store and results
    // =========================================================================

    /// Pick up external changes to the store. A failed reload keeps the
    /// previous snapshot on screen.
    pub fn poll_store(&mut self) {
        match self.store.poll() {
            Ok(true) => {
                self.snapshot = self.store.snapshot();
                self.store_error = None;
                self.refresh_results();
            }
            Ok(false) => {}
            Err(err) => {
                let message = err.to_string();
                if self.store_error.as_deref() != Some(message.as_str()) {
                    tracing::warn!(error = %message, "store reload failed");
                    self.set_status(format!("Store error: {}", message));
                    self.store_error = Some(message);
                }
            }
        }
    }

    fn refresh_results(&mut self) {
        if !matches!(self.route(), Route::Search { .. }) {
            return;
        }
        let page = self.resolver.resolve(
            self.history.current(),
            &self.snapshot.catalog,
            self.config.search_fields,
        );
        let max_index = page.results.len().saturating_sub(1);
        self.selected = self.selected.min(max_index);
    }

    pub fn route(&self) -> Route {
        Route::parse(self.history.current())
    }

    pub fn current_target(&self) -> &str {
        self.history.current()
    }

    /// The results page, when the current route is the search results view.
    pub fn results_page(&self) -> Option<&ResultsPage> {
        match self.route() {
            Route::Search { .. } => Some(self.resolver.page()),
            _ => None,
        }
    }

    pub fn cart_count(&self) -> usize {
        self.snapshot.cart.count_items()
    }

    pub fn catalog_len(&self) -> usize {
        self.snapshot.catalog.len()
    }

    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    pub fn nav_variant(&self) -> NavVariant {
        self.config.nav_variant
    }

    /// Only the default navigation bar carries a search field.
    pub fn search_enabled(&self) -> bool {
        self.config.nav_variant == NavVariant::Default
    }

    pub fn ui_colors(&self) -> &UiColors {
        &self.config.ui.colors
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    fn navigate(&mut self, route: Route) {
        self.history.push(route.to_target());
        self.after_navigation();
    }

    fn after_navigation(&mut self) {
        self.selected = 0;
        self.status = None;
        self.refresh_results();
    }

    fn move_selection(&mut self, delta: isize) {
        let Some(page) = self.results_page() else {
            return;
        };
        let len = page.results.len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let max_index = (len - 1) as isize;
        let next = (self.selected as isize + delta).clamp(0, max_index);
        self.selected = next as usize;
    }

    fn set_status<S: Into<String>>(&mut self, message: S) {
        self.status = Some(message.into());
    }

    // =========================================================================
    // Key handling
    // =========================================================================

    /// Handle a key press. Returns true when the application should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        // Ctrl+C always quits
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return true;
        }

        if self.help_modal.is_some() {
            self.handle_help_modal_key(key);
            return false;
        }

        match self.focus {
            Focus::Search => {
                self.handle_search_key(key);
                false
            }
            Focus::Page => self.handle_navigation_key(key),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let input_keys = &config.keys.search_input;

        let Some(command) = SearchBar::command_for_key(&key, input_keys) else {
            if self.key_matches_any(&key, &input_keys.cancel) {
                self.focus = Focus::Page;
            } else {
                self.search_bar.handle_key(key);
            }
            return;
        };

        match self.search_bar.dispatch(&mut self.history, command) {
            SearchIntent::Navigate(_) => {
                self.focus = Focus::Page;
                self.after_navigation();
            }
            SearchIntent::NotYetImplemented(feature) => {
                self.set_status(format!("{}: not yet implemented", feature.title()));
            }
            SearchIntent::None => {
                self.set_status("Nothing to search");
            }
        }
    }

    fn handle_navigation_key(&mut self, key: KeyEvent) -> bool {
        let config = self.config;
        let global = &config.keys.global;

        if self.key_matches_any(&key, &global.quit) {
            return true;
        }

        if self.search_enabled() && self.key_matches_any(&key, &global.search) {
            self.focus = Focus::Search;
            self.status = None;
            return false;
        }

        if self.key_matches_any(&key, &global.help) {
            self.show_help();
            return false;
        }

        if self.key_matches_any(&key, &global.back) {
            if self.history.back() {
                self.after_navigation();
            } else {
                self.set_status("No previous page");
            }
            return false;
        }

        // The logo leads home in both variants
        if self.key_matches_any(&key, &global.shop) {
            self.navigate(Route::Home);
            return false;
        }

        if let Some(route) = self.nav_route_for_key(&key) {
            self.navigate(route);
            return false;
        }

        if matches!(self.route(), Route::Search { .. }) {
            self.handle_results_key(&key);
        }

        false
    }

    /// Link targets reachable from the navigation bar of the active variant.
    fn nav_route_for_key(&self, key: &KeyEvent) -> Option<Route> {
        let global = &self.config.keys.global;
        let links: Vec<(&[String], Route)> = match self.config.nav_variant {
            NavVariant::Default => vec![
                (global.men.as_slice(), Route::Men),
                (global.women.as_slice(), Route::Women),
                (global.wishlist.as_slice(), Route::Wishlist),
                (global.account.as_slice(), Route::Account),
                (global.cart.as_slice(), Route::Cart),
            ],
            NavVariant::Auth => vec![
                (global.login.as_slice(), Route::Login),
                (global.signup.as_slice(), Route::Register),
            ],
        };

        links
            .into_iter()
            .find(|(bindings, _)| self.key_matches_any(key, bindings))
            .map(|(_, route)| route)
    }

    fn handle_results_key(&mut self, key: &KeyEvent) {
        let config = self.config;
        let results = &config.keys.results;

        if self.key_matches_any(key, &results.next) {
            self.move_selection(1);
        } else if self.key_matches_any(key, &results.prev) {
            self.move_selection(-1);
        } else if self.key_matches_any(key, &results.page_down) {
            self.move_selection(PAGE_STEP);
        } else if self.key_matches_any(key, &results.page_up) {
            self.move_selection(-PAGE_STEP);
        } else if self.key_matches_any(key, &results.first) {
            self.selected = 0;
        } else if self.key_matches_any(key, &results.last) {
            self.move_selection(isize::MAX / 2);
        }
    }

    /// Check if the key event matches any of the bindings in the list
    fn key_matches_any(&self, event: &KeyEvent, bindings: &[String]) -> bool {
        bindings.iter().any(|b| key_matches_single(event, b))
    }

    // =========================================================================
    // Help Modal
    // =========================================================================

    /// Generate help content from current keybindings configuration
    pub fn help_entries(&self) -> Vec<HelpSection> {
        let keys = &self.config.keys;
        let entry = |action: &'static str, bindings: &[String]| HelpEntry {
            action,
            keys: bindings.join(", "),
        };

        let mut global = vec![entry("Quit", &keys.global.quit)];
        if self.search_enabled() {
            global.push(entry("Search", &keys.global.search));
        }
        global.push(entry("Help", &keys.global.help));
        global.push(entry("Back", &keys.global.back));

        let mut navigation = vec![entry("Shop", &keys.global.shop)];
        match self.config.nav_variant {
            NavVariant::Default => {
                navigation.push(entry("Men", &keys.global.men));
                navigation.push(entry("Women", &keys.global.women));
                navigation.push(entry("Wishlist", &keys.global.wishlist));
                navigation.push(entry("Account", &keys.global.account));
                navigation.push(entry("Cart", &keys.global.cart));
            }
            NavVariant::Auth => {
                navigation.push(entry("Login", &keys.global.login));
                navigation.push(entry("Signup", &keys.global.signup));
            }
        }

        let mut sections = vec![
            HelpSection {
                title: "Global",
                entries: global,
            },
            HelpSection {
                title: "Navigation",
                entries: navigation,
            },
        ];

        if self.search_enabled() {
            sections.push(HelpSection {
                title: "Search Field",
                entries: vec![
                    entry("Search", &keys.search_input.confirm),
                    entry("Leave field", &keys.search_input.cancel),
                    entry("Voice search", &keys.search_input.voice),
                    entry("Image search", &keys.search_input.image),
                    entry("AI mode", &keys.search_input.ai_mode),
                ],
            });
        }

        sections.push(HelpSection {
            title: "Search Results",
            entries: vec![
                entry("Next", &keys.results.next),
                entry("Previous", &keys.results.prev),
                entry("Page down", &keys.results.page_down),
                entry("Page up", &keys.results.page_up),
                entry("First", &keys.results.first),
                entry("Last", &keys.results.last),
            ],
        });
        sections
    }

    fn help_total_lines(&self) -> usize {
        let sections = self.help_entries();
        sections
            .iter()
            .map(|section| section.entries.len() + 2)
            .sum()
    }

    pub fn show_help(&mut self) {
        let total_lines = self.help_total_lines();
        self.help_modal = Some(HelpModal::new(total_lines));
    }

    fn handle_help_modal_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Esc) || matches!(key.code, KeyCode::Char('q')) {
            self.help_modal = None;
            return;
        }

        let Some(modal) = self.help_modal.as_mut() else {
            return;
        };

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => modal.scroll_down(1),
            KeyCode::Char('k') | KeyCode::Up => modal.scroll_up(1),
            KeyCode::PageDown => {
                let page = modal.viewport_height.saturating_sub(1).max(1);
                modal.scroll_down(page);
            }
            KeyCode::PageUp => {
                let page = modal.viewport_height.saturating_sub(1).max(1);
                modal.scroll_up(page);
            }
            _ => {}
        }
    }
}

/// Check if the key event matches a single binding string
pub fn key_matches_single(event: &KeyEvent, binding: &str) -> bool {
    let trimmed = binding.trim();
    if trimmed.is_empty() {
        return false;
    }

    // Ctrl/Alt/Super combinations are never bound
    let disallowed = KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER;
    if event.modifiers.intersects(disallowed) {
        return false;
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "enter" => matches!(event.code, KeyCode::Enter),
        "tab" => matches!(event.code, KeyCode::Tab),
        "backtab" | "shift+tab" => matches!(event.code, KeyCode::BackTab),
        "backspace" => matches!(event.code, KeyCode::Backspace),
        "esc" | "escape" => matches!(event.code, KeyCode::Esc),
        "space" => matches!(event.code, KeyCode::Char(' ')),
        "up" => matches!(event.code, KeyCode::Up),
        "down" => matches!(event.code, KeyCode::Down),
        "left" => matches!(event.code, KeyCode::Left),
        "right" => matches!(event.code, KeyCode::Right),
        "pageup" | "page_up" => matches!(event.code, KeyCode::PageUp),
        "pagedown" | "page_down" => matches!(event.code, KeyCode::PageDown),
        "home" => matches!(event.code, KeyCode::Home),
        "end" => matches!(event.code, KeyCode::End),
        name if name.len() > 1 && name.starts_with('f') => match name[1..].parse::<u8>() {
            Ok(n) if (1..=12).contains(&n) => matches!(event.code, KeyCode::F(f) if f == n),
            _ => false,
        },
        // Single character - case-sensitive (g != G, since G requires Shift)
        _ => {
            let mut chars = trimmed.chars();
            if let (Some(first), None) = (chars.next(), chars.next()) {
                matches!(event.code, KeyCode::Char(c) if c == first)
            } else {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Product, ProductId};
    use crate::config;
    use crate::store::{Cart, CartItem, FileStore, StaticStore, StoreError};
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;
    use tempfile::TempDir;

    struct Shared(Rc<RefCell<StaticStore>>);

    impl StoreSource for Shared {
        fn snapshot(&self) -> StoreSnapshot {
            self.0.borrow().snapshot()
        }

        fn poll(&mut self) -> Result<bool, StoreError> {
            self.0.borrow_mut().poll()
        }
    }

    fn test_config(extra: &str) -> Config {
        config::from_toml_str(&format!("store = \"/tmp/shopease-test.json\"\n{}", extra)).unwrap()
    }

    fn products() -> Vec<Product> {
        vec![
            Product::new(1).with_title("Red Shirt").with_price(120.0),
            Product::new(2).with_title("Blue Jeans").with_price(300.0),
            Product::new(3).with_title("Sweat-shirt").with_price(250.0),
        ]
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_submit_navigates_to_results() {
        let config = test_config("");
        let mut app = App::new(&config, Box::new(StaticStore::new(products(), Cart::default())));

        press(&mut app, KeyCode::Char('/'));
        assert_eq!(app.focus, Focus::Search);
        type_text(&mut app, "  shirt ");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.focus, Focus::Page);
        assert_eq!(app.current_target(), "/productcherche?q=shirt");
        let page = app.results_page().unwrap();
        assert_eq!(page.count_label(), "2 produit(s)");
    }

    #[test]
    fn test_whitespace_submit_stays_put() {
        let config = test_config("");
        let mut app = App::new(&config, Box::new(StaticStore::default()));

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "   ");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.route(), Route::Home);
        assert_eq!(app.focus, Focus::Search);
        assert!(app.results_page().is_none());
    }

    #[test]
    fn test_placeholder_buttons_do_not_navigate() {
        let config = test_config("");
        let mut app = App::new(&config, Box::new(StaticStore::default()));

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "shirt");
        press(&mut app, KeyCode::F(2));

        assert_eq!(app.route(), Route::Home);
        assert_eq!(app.search_bar.value(), "shirt");
        assert_eq!(app.status.as_deref(), Some("Voice search: not yet implemented"));
    }

    #[test]
    fn test_selection_and_back() {
        let config = test_config("");
        let mut app = App::new(&config, Box::new(StaticStore::new(products(), Cart::default())));

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "shirt");
        press(&mut app, KeyCode::Enter);

        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.selected, 1);
        press(&mut app, KeyCode::Char('g'));
        assert_eq!(app.selected, 0);
        press(&mut app, KeyCode::Char('G'));
        assert_eq!(app.selected, 1);

        press(&mut app, KeyCode::Char('b'));
        assert_eq!(app.route(), Route::Home);
        press(&mut app, KeyCode::Char('b'));
        assert_eq!(app.status.as_deref(), Some("No previous page"));
    }

    #[test]
    fn test_store_change_updates_results() {
        let config = test_config("");
        let shared = Rc::new(RefCell::new(StaticStore::new(products(), Cart::default())));
        let mut app = App::new(&config, Box::new(Shared(Rc::clone(&shared))));

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "jeans");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.results_page().unwrap().results.len(), 1);

        let cart = Cart::new(vec![CartItem {
            product_id: ProductId::Number(2),
            quantity: 1,
        }]);
        shared.borrow_mut().replace(
            vec![
                Product::new(2).with_title("Blue Jeans"),
                Product::new(4).with_title("Black Jeans"),
            ],
            cart,
        );
        app.poll_store();

        assert_eq!(app.results_page().unwrap().count_label(), "2 produit(s)");
        assert_eq!(app.cart_count(), 1);
    }

    #[test]
    fn test_nav_links_follow_variant() {
        let config = test_config("");
        let mut app = App::new(&config, Box::new(StaticStore::default()));
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.route(), Route::Cart);
        press(&mut app, KeyCode::Char('l'));
        assert_eq!(app.route(), Route::Cart);

        let auth = test_config("[nav]\nvariant = \"auth\"");
        let mut app = App::new(&auth, Box::new(StaticStore::default()));
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.route(), Route::Home);
        press(&mut app, KeyCode::Char('l'));
        assert_eq!(app.route(), Route::Login);
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.route(), Route::Register);
    }

    #[test]
    fn test_auth_variant_has_no_search_field() {
        let auth = test_config("[nav]\nvariant = \"auth\"");
        let mut app = App::new(&auth, Box::new(StaticStore::new(products(), Cart::default())));

        press(&mut app, KeyCode::Char('/'));
        assert_eq!(app.focus, Focus::Page);
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.focus, Focus::Page);
        assert_eq!(app.search_bar.value(), "");
        assert_eq!(app.current_target(), "/");
        assert!(app.results_page().is_none());

        let sections = app.help_entries();
        assert!(sections.iter().all(|section| section.title != "Search Field"));
        assert!(sections
            .iter()
            .flat_map(|section| section.entries.iter())
            .all(|entry| entry.action != "Search"));
    }

    #[test]
    fn test_malformed_store_starts_empty_and_recovers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        let config = test_config("");

        let mut app = App::new(&config, Box::new(FileStore::new(&path)));
        assert_eq!(app.catalog_len(), 0);
        assert!(app.status.as_deref().unwrap().starts_with("Store error:"));

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "shirt");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.results_page().unwrap().count_label(), "0 produit(s)");

        fs::write(&path, r#"[{"id": 1, "title": "Red Shirt"}]"#).unwrap();
        app.poll_store();
        assert_eq!(app.catalog_len(), 1);
        assert_eq!(app.results_page().unwrap().count_label(), "1 produit(s)");
    }

    #[test]
    fn test_quit_and_help() {
        let config = test_config("");
        let mut app = App::new(&config, Box::new(StaticStore::default()));

        press(&mut app, KeyCode::F(1));
        assert!(app.help_modal.is_some());
        assert!(!press(&mut app, KeyCode::Char('q')));
        assert!(app.help_modal.is_none());
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn test_key_matches_single() {
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert!(key_matches_single(&key(KeyCode::F(4)), "F4"));
        assert!(!key_matches_single(&key(KeyCode::F(4)), "F13"));
        assert!(key_matches_single(&key(KeyCode::Esc), "Escape"));
        assert!(key_matches_single(&key(KeyCode::Char('G')), "G"));
        assert!(!key_matches_single(&key(KeyCode::Char('g')), "G"));
        assert!(!key_matches_single(
            &KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
            "q"
        ));
    }
}
