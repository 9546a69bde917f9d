// Navigation state held by one console session.

use crate::github::RepoEntry;

use super::text;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoRepoLoaded,
    RepoLoaded,
    /// A request is in flight; input is not accepted.
    Loading,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationState {
    /// `""` is the repository root.
    pub current_path: String,
    pub current_directory: Vec<RepoEntry>,
    /// Parent paths, pushed on descend and popped on `back`.
    pub breadcrumbs: Vec<String>,
    /// Examined artifact labels, unique, in the order found.
    pub inventory: Vec<String>,
    /// Append-only transcript (except for `clear` and `exit`).
    pub messages: Vec<String>,
    pub repo_owner: String,
    pub repo_name: String,
    pub is_loading: bool,
}

impl NavigationState {
    /// Fresh session showing the welcome banner.
    pub fn new() -> Self {
        Self {
            messages: text::WELCOME.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        if self.is_loading {
            Phase::Loading
        } else if self.repo_name.is_empty() {
            Phase::NoRepoLoaded
        } else {
            Phase::RepoLoaded
        }
    }

    pub fn is_repo_loaded(&self) -> bool {
        !self.repo_name.is_empty()
    }

    pub fn say(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Case-insensitive lookup in the current directory.
    pub fn find_entry(&self, name: &str) -> Option<&RepoEntry> {
        let wanted = name.trim().to_lowercase();
        self.current_directory
            .iter()
            .find(|entry| entry.name().to_lowercase() == wanted)
    }

    /// `name` resolved against the current path.
    pub fn child_path(&self, name: &str) -> String {
        let name = name.trim().trim_matches('/');
        if self.current_path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.current_path, name)
        }
    }

    /// Current path, or `root` at the top.
    pub fn location_label(&self) -> &str {
        if self.current_path.is_empty() {
            "root"
        } else {
            &self.current_path
        }
    }

    /// Add to the inventory unless already present. Returns whether it was added.
    pub fn add_to_inventory(&mut self, label: String) -> bool {
        if self.inventory.contains(&label) {
            return false;
        }
        self.inventory.push(label);
        true
    }
}
