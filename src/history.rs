//! In-process navigation history standing in for the browser router.

/// Capability to change the current navigation target.
pub trait Navigator {
    fn push(&mut self, target: String);

    fn current(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::starting_at("/")
    }

    pub fn starting_at(target: impl Into<String>) -> Self {
        Self {
            entries: vec![target.into()],
        }
    }

    /// Go back one entry. Returns false when already at the first entry.
    pub fn back(&mut self) -> bool {
        if self.entries.len() <= 1 {
            return false;
        }
        self.entries.pop();
        tracing::debug!(location = %self.current(), "navigated back");
        true
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for History {
    fn push(&mut self, target: String) {
        if self.current() == target {
            return;
        }
        tracing::debug!(location = %target, "navigate");
        self.entries.push(target);
    }

    fn current(&self) -> &str {
        // entries always holds the starting target
        self.entries.last().map(String::as_str).unwrap_or("/")
    }
}
