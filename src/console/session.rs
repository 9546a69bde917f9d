// Console session: interprets commands and moves through the repository.

use crate::api::ContentResponse;
use crate::describe::{DescriptionKind, FALLBACK_DESCRIPTION};
use crate::github::RepoEntry;

use super::client::{ClientError, DungeonApi};
use super::command::{self, Verb};
use super::state::{NavigationState, Phase};
use super::text;

/// Characters of raw file content shown by `read`.
pub const READ_PREVIEW_CHARS: usize = 500;

/// Split `owner/repo`, tolerating a leading GitHub URL and stray slashes.
pub fn parse_repo_identifier(raw: &str) -> Result<(String, String), &'static str> {
    let trimmed = raw.trim();
    let without_host = ["https://github.com/", "http://github.com/", "github.com/"]
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed);

    let mut parts = without_host
        .split('/')
        .map(str::trim)
        .filter(|part| !part.is_empty());
    match (parts.next(), parts.next()) {
        (Some(owner), Some(repo)) => {
            let repo = repo.strip_suffix(".git").unwrap_or(repo);
            if repo.is_empty() || owner.contains(char::is_whitespace) || repo.contains(char::is_whitespace) {
                return Err(text::INVALID_REPOSITORY);
            }
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(text::INVALID_REPOSITORY),
    }
}

/// One player's walk through one repository at a time.
///
/// Every operation takes `&mut self`, so at most one request is in flight;
/// `is_loading` is set around each call for display purposes. Failures are
/// reported as transcript lines and leave navigation untouched.
pub struct Session<A> {
    api: A,
    state: NavigationState,
    log_epoch: u64,
}

impl<A: DungeonApi> Session<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: NavigationState::new(),
            log_epoch: 0,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn messages(&self) -> &[String] {
        &self.state.messages
    }

    /// Bumped whenever the transcript is replaced instead of appended to.
    pub fn log_epoch(&self) -> u64 {
        self.log_epoch
    }

    /// Interpret one typed line.
    pub async fn dispatch(&mut self, raw: &str) {
        let Some(line) = command::parse(raw) else {
            return;
        };
        if self.state.is_loading {
            return;
        }
        self.state.say(format!("> {}", raw.trim()));

        let verb = line.verb_kind();
        if !self.state.is_repo_loaded() && !verb.is_session_independent() {
            self.load(raw).await;
            return;
        }

        match verb {
            Verb::Go => self.go(&line.argument).await,
            Verb::Back => self.back().await,
            Verb::Examine => self.examine(&line.argument).await,
            Verb::Read => self.read(&line.argument).await,
            Verb::Inventory => self.inventory(),
            Verb::Structure => self.structure().await,
            Verb::Help => self.help(),
            Verb::Clear => self.clear(),
            Verb::Exit => self.exit(),
            Verb::Unknown => self.state.say(text::UNKNOWN_COMMAND),
        }
    }

    /// Enter a repository given as `owner/repo`.
    pub async fn load(&mut self, identifier: &str) {
        if self.state.is_repo_loaded() {
            self.state.say(format!(
                "🏰 You are already exploring {}. Type \"exit\" to leave it first.",
                self.state.repo_name
            ));
            return;
        }
        let (owner, repo) = match parse_repo_identifier(identifier) {
            Ok(parts) => parts,
            Err(msg) => {
                self.state
                    .say(format!("❌ The portal to this repository is sealed. {msg}"));
                return;
            }
        };

        self.state.is_loading = true;
        let result = self.api.repo_root(&owner, &repo).await;
        self.state.is_loading = false;

        match result {
            Ok(entries) => {
                tracing::info!("Loaded {owner}/{repo} with {} root entries", entries.len());
                self.state.current_path.clear();
                self.state.current_directory = entries;
                self.state.breadcrumbs.clear();
                self.state.inventory.clear();
                self.state.repo_owner = owner;
                self.state.repo_name = repo.clone();
                self.state
                    .messages
                    .extend(text::entered_repository(&repo));
            }
            Err(e) => self
                .state
                .say(format!("❌ The portal to this repository is sealed. {e}")),
        }
    }

    /// Descend into a chamber, or describe an artifact if `name` is a file.
    pub async fn go(&mut self, name: &str) {
        if !self.require_repo() {
            return;
        }
        let name = name.trim();
        if name.is_empty() {
            self.state
                .say("🗺️ Please specify a direction or chamber name to explore.");
            return;
        }
        if text::COMPASS.contains(&name.to_lowercase().as_str()) {
            self.state.say(format!(
                "🧭 You move {name}, but find yourself in the same chamber. \
                 The dungeon's magic keeps you within the current realm."
            ));
            return;
        }

        let target = self
            .state
            .find_entry(name)
            .map(|entry| entry.name().to_string())
            .unwrap_or_else(|| name.to_string());
        let path = self.state.child_path(&target);

        match self.fetch_path(&path).await {
            Ok(ContentResponse::Listing(entries)) => {
                let count = entries.len();
                let previous = std::mem::replace(&mut self.state.current_path, path);
                self.state.breadcrumbs.push(previous);
                self.state.current_directory = entries;
                self.state.say(text::room_description(&target));
                self.state
                    .say(format!("You see {count} artifacts and chambers to explore."));
            }
            Ok(ContentResponse::File(view)) => {
                self.state
                    .say(format!("📜 You examine the {target} artifact."));
                self.state.say(view.ai_description);
            }
            Err(e) => self.state.say(format!(
                "🚫 The path to {target} is blocked by ancient wards. {e}"
            )),
        }
    }

    /// Return to the most recent breadcrumb.
    pub async fn back(&mut self) {
        let Some(previous) = self.state.breadcrumbs.last().cloned() else {
            self.state.say(text::AT_ENTRANCE);
            return;
        };

        match self.fetch_path(&previous).await {
            Ok(ContentResponse::Listing(entries)) => {
                self.state.breadcrumbs.pop();
                self.state.current_path = previous;
                self.state.current_directory = entries;
                self.state.say(text::retrace_description());
                let location = self.state.location_label().to_string();
                self.state
                    .say(format!("You are now in the {location} chamber."));
            }
            Ok(ContentResponse::File(_)) => self
                .state
                .say("❌ The path back is blocked by ancient wards."),
            Err(e) => self
                .state
                .say(format!("❌ The path back is blocked by ancient wards. {e}")),
        }
    }

    /// Study an artifact in the current chamber and keep it in the inventory.
    pub async fn examine(&mut self, name: &str) {
        if !self.require_repo() {
            return;
        }
        let name = name.trim();
        if name.is_empty() {
            self.state
                .say("🔍 Please specify an artifact to examine with your arcane sight.");
            return;
        }
        let Some(entry) = self.state.find_entry(name).cloned() else {
            self.state.say(format!(
                "👁️ You search the chamber but find no artifact named \"{name}\"."
            ));
            return;
        };

        let file = match entry {
            RepoEntry::File(file) => file,
            RepoEntry::Dir(dir) => {
                self.state.say(format!(
                    "🏛️ {} is a chamber leading to deeper realms. Type \"go {}\" to enter its depths.",
                    dir.name, dir.name
                ));
                return;
            }
            other => {
                self.state.say(format!(
                    "🌀 {} shimmers like a {}. It cannot be examined from here.",
                    other.name(),
                    other.kind()
                ));
                return;
            }
        };

        let path = self.state.child_path(&file.name);
        match self.fetch_path(&path).await {
            Ok(ContentResponse::File(view)) => {
                self.state
                    .say(format!("🔮 Examining {}: {}", file.name, view.ai_description));
                let label = format!("{} ({})", file.name, self.state.location_label());
                self.state.add_to_inventory(label);
            }
            Ok(ContentResponse::Listing(_)) => self.state.say(format!(
                "🔮 The {} artifact refuses to reveal its nature.",
                file.name
            )),
            Err(e) => self.state.say(format!(
                "❌ The {} artifact is protected by powerful magic. {e}",
                file.name
            )),
        }
    }

    /// Decipher a file: describe it as a spell and show the start of its runes.
    pub async fn read(&mut self, name: &str) {
        if !self.require_repo() {
            return;
        }
        let name = name.trim();
        if name.is_empty() {
            self.state.say("📖 Please specify a spell or scroll to read.");
            return;
        }
        let Some(entry) = self.state.find_entry(name).cloned() else {
            self.state.say(format!(
                "📜 No scroll named \"{name}\" lies in this chamber."
            ));
            return;
        };
        let Some(file) = entry.as_file().cloned() else {
            self.state.say(format!(
                "🏛️ {} is not a scroll. Try \"go {}\" instead.",
                entry.name(),
                entry.name()
            ));
            return;
        };

        let path = self.state.child_path(&file.name);
        let content = match self.fetch_path(&path).await {
            Ok(ContentResponse::File(view)) => view.decoded_content,
            Ok(ContentResponse::Listing(_)) => {
                self.state.say(format!(
                    "🔮 The runes of {} refuse to reveal themselves.",
                    file.name
                ));
                return;
            }
            Err(e) => {
                self.state.say(format!(
                    "❌ The {} scroll is sealed by powerful magic. {e}",
                    file.name
                ));
                return;
            }
        };

        self.state.is_loading = true;
        let described = self
            .api
            .describe(&content, DescriptionKind::Snippet, Some(&file.name))
            .await;
        self.state.is_loading = false;

        let description = described.unwrap_or_else(|e| {
            tracing::warn!("describe request failed: {e}");
            FALLBACK_DESCRIPTION.to_string()
        });
        self.state
            .say(format!("📖 You read the {} scroll: {description}", file.name));
        self.state.say(preview(&content, READ_PREVIEW_CHARS));
    }

    pub fn inventory(&mut self) {
        if self.state.inventory.is_empty() {
            self.state.say("🎒 Your magical satchel is empty.");
            self.state
                .say("💡 Explore chambers and examine artifacts to collect knowledge.");
            return;
        }
        self.state.say("🎒 Your magical satchel contains:");
        let lines: Vec<String> = self
            .state
            .inventory
            .iter()
            .enumerate()
            .map(|(i, item)| format!("  {}. {item}", i + 1))
            .collect();
        self.state.messages.extend(lines);
    }

    /// Unfurl the map of the whole repository.
    pub async fn structure(&mut self) {
        if !self.state.is_repo_loaded() {
            self.state.say(
                "🗺️ No dungeon is currently loaded. Enter a repository to begin your cartographic exploration.",
            );
            return;
        }
        let owner = self.state.repo_owner.clone();
        let repo = self.state.repo_name.clone();

        self.state.is_loading = true;
        let result = self.api.structure(&owner, &repo).await;
        self.state.is_loading = false;

        match result {
            Ok(tree) => {
                self.state.say(
                    "🗺️ You unfurl the ancient Dungeon Map. The parchment reveals the repository's structure:",
                );
                self.state.say(tree);
            }
            Err(e) => self.state.say(format!(
                "❌ The dungeon map is obscured by magical interference. {e}"
            )),
        }
    }

    pub fn help(&mut self) {
        self.state
            .messages
            .extend(text::HELP.iter().map(|s| s.to_string()));
    }

    pub fn clear(&mut self) {
        self.state.messages = vec![text::CLEARED.to_string()];
        self.log_epoch += 1;
    }

    /// Leave the dungeon and forget everything about it.
    pub fn exit(&mut self) {
        self.state = NavigationState {
            messages: vec![text::FAREWELL.to_string()],
            ..NavigationState::default()
        };
        self.log_epoch += 1;
    }

    fn require_repo(&mut self) -> bool {
        if self.state.is_repo_loaded() {
            return true;
        }
        self.state
            .say("🗺️ No dungeon is currently loaded. Enter a repository first.");
        false
    }

    /// Fetch `path` in the loaded repository; `""` means the root listing.
    async fn fetch_path(&mut self, path: &str) -> Result<ContentResponse, ClientError> {
        let owner = self.state.repo_owner.clone();
        let repo = self.state.repo_name.clone();

        self.state.is_loading = true;
        let result = if path.is_empty() {
            self.api
                .repo_root(&owner, &repo)
                .await
                .map(ContentResponse::Listing)
        } else {
            self.api.contents(&owner, &repo, path).await
        };
        self.state.is_loading = false;
        result
    }
}

/// First `max_chars` characters of `content`, marked when cut short.
fn preview(content: &str, max_chars: usize) -> String {
    let head = crate::describe::truncate_chars(content, max_chars);
    if head.len() < content.len() {
        format!("{head}…")
    } else {
        head.to_string()
    }
}
