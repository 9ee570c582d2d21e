//! Query capture: the search field of the navigation bar.
//!
//! Handlers are pure: they take the current draft and return an intent.
//! Only `SearchBar::dispatch` touches the navigator.

use crossterm::event::{Event, KeyEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use crate::config::SearchInputKeys;
use crate::history::Navigator;
use crate::route::Route;
use crate::ui::app::key_matches_single;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCommand {
    Submit,
    Voice,
    Image,
    AiMode,
}

/// Search features that are exposed as buttons but have no behavior yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    VoiceSearch,
    ImageSearch,
    AiMode,
}

impl Feature {
    pub fn title(self) -> &'static str {
        match self {
            Feature::VoiceSearch => "Voice search",
            Feature::ImageSearch => "Image search",
            Feature::AiMode => "AI mode",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchIntent {
    /// Nothing to do.
    None,
    Navigate(Route),
    NotYetImplemented(Feature),
}

impl SearchIntent {
    pub fn target(&self) -> Option<String> {
        match self {
            SearchIntent::Navigate(route) => Some(route.to_target()),
            _ => None,
        }
    }
}

/// Submit a draft. Whitespace-only drafts produce no navigation.
pub fn submit(draft: &str) -> SearchIntent {
    let query = draft.trim();
    if query.is_empty() {
        return SearchIntent::None;
    }
    SearchIntent::Navigate(Route::search(query))
}

pub fn handle(command: SearchCommand, draft: &str) -> SearchIntent {
    match command {
        SearchCommand::Submit => submit(draft),
        SearchCommand::Voice => SearchIntent::NotYetImplemented(Feature::VoiceSearch),
        SearchCommand::Image => SearchIntent::NotYetImplemented(Feature::ImageSearch),
        SearchCommand::AiMode => SearchIntent::NotYetImplemented(Feature::AiMode),
    }
}

#[derive(Debug, Default)]
pub struct SearchBar {
    input: Input,
}

impl SearchBar {
    pub const PLACEHOLDER: &'static str = "Rechercher sur Google ou saisir une URL";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            input: Input::new(value.into()),
        }
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn visual_cursor(&self) -> usize {
        self.input.visual_cursor()
    }

    pub fn clear(&mut self) {
        self.input.reset();
    }

    /// The command bound to `key`, if any. Cancel is not a command: leaving
    /// the field is up to the host.
    pub fn command_for_key(key: &KeyEvent, keys: &SearchInputKeys) -> Option<SearchCommand> {
        let bound = |bindings: &[String]| bindings.iter().any(|b| key_matches_single(key, b));
        if bound(&keys.confirm) {
            Some(SearchCommand::Submit)
        } else if bound(&keys.voice) {
            Some(SearchCommand::Voice)
        } else if bound(&keys.image) {
            Some(SearchCommand::Image)
        } else if bound(&keys.ai_mode) {
            Some(SearchCommand::AiMode)
        } else {
            None
        }
    }

    /// Edit the draft. Returns true when the key was consumed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        self.input.handle_event(&Event::Key(key)).is_some()
    }

    /// Run a command against the current draft and apply the resulting
    /// navigation, if any.
    pub fn dispatch<N: Navigator>(&self, navigator: &mut N, command: SearchCommand) -> SearchIntent {
        let intent = handle(command, self.value());
        match &intent {
            SearchIntent::Navigate(route) => navigator.push(route.to_target()),
            SearchIntent::NotYetImplemented(feature) => {
                tracing::debug!(feature = feature.title(), "placeholder search action");
            }
            SearchIntent::None => {}
        }
        intent
    }
}
