// Shared in-memory fakes for the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;

use dungeon_backend::api::{ContentResponse, FileView};
use dungeon_backend::console::{ClientError, DungeonApi};
use dungeon_backend::describe::{DescriptionError, DescriptionKind, TextGenerator};
use dungeon_backend::github::{ContentSource, EntryMeta, FileEntry, Listing, RepoEntry, RepoError};

pub fn dir(path: &str) -> RepoEntry {
    RepoEntry::Dir(EntryMeta {
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        path: path.to_string(),
        ..EntryMeta::default()
    })
}

/// A file as it appears inside a directory listing (no body).
pub fn file(path: &str) -> RepoEntry {
    RepoEntry::File(FileEntry {
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        path: path.to_string(),
        ..FileEntry::default()
    })
}

/// A file as the contents API returns it when requested directly.
pub fn file_with_body(path: &str, body: &str) -> RepoEntry {
    let encoded = base64::engine::general_purpose::STANDARD.encode(body);
    // The real API wraps base64 at 60 columns.
    let wrapped: Vec<String> = encoded
        .as_bytes()
        .chunks(60)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect();
    RepoEntry::File(FileEntry {
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        path: path.to_string(),
        size: body.len() as u64,
        content: Some(wrapped.join("\n") + "\n"),
        encoding: Some("base64".into()),
        ..FileEntry::default()
    })
}

// ── Repository source ────────────────────────────────────────────────

/// A fake remote filesystem that counts calls per path.
#[derive(Default)]
pub struct FakeSource {
    listings: Mutex<HashMap<String, Listing>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn add_dir(&self, path: &str, entries: Vec<RepoEntry>) {
        self.listings
            .lock()
            .unwrap()
            .insert(path.to_string(), Listing::Many(entries));
    }

    pub fn add_file(&self, path: &str, body: &str) {
        self.listings
            .lock()
            .unwrap()
            .insert(path.to_string(), Listing::One(file_with_body(path, body)));
    }

    /// `path` is a symlink: upstream answers with the target file's record.
    pub fn add_symlink(&self, path: &str, target: &str, body: &str) {
        self.listings
            .lock()
            .unwrap()
            .insert(path.to_string(), Listing::One(file_with_body(target, body)));
    }

    pub fn fail(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    pub fn calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn get_contents(
        &self,
        _owner: &str,
        _repo: &str,
        path: &str,
    ) -> Result<Listing, RepoError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_insert(0) += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(path) {
            return Err(RepoError::RemoteFetch("404 Not Found: Not Found".into()));
        }
        self.listings
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| RepoError::RemoteFetch("404 Not Found: Not Found".into()))
    }
}

/// docs/ and src/ with a couple of files, the layout most tests walk through.
pub fn sample_source() -> FakeSource {
    let source = FakeSource::new();
    source.add_dir("", vec![dir("docs"), dir("src"), file("README.md")]);
    source.add_dir("docs", vec![file("docs/README.md"), file("docs/guide.md")]);
    source.add_dir("src", vec![dir("src/components"), file("src/main.rs")]);
    source.add_dir("src/components", vec![file("src/components/Button.tsx")]);
    source.add_file("README.md", "# Hello World\n");
    source.add_file("docs/README.md", "# Docs\nRead me first.\n");
    source.add_file("src/main.rs", "fn main() {\n    println!(\"hello\");\n}\n");
    source
}

// ── Text generator ───────────────────────────────────────────────────

pub struct FakeGenerator {
    reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, DescriptionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| DescriptionError::Upstream("503 Service Unavailable".into()))
    }
}

// ── Backend, as seen by the console ──────────────────────────────────

/// In-memory backend for console sessions. Records every path requested.
#[derive(Default)]
pub struct FakeApi {
    repos: HashSet<(String, String)>,
    dirs: HashMap<String, Vec<RepoEntry>>,
    files: HashMap<String, (String, String)>,
    tree: String,
    failing: HashSet<String>,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(mut self, owner: &str, repo: &str) -> Self {
        self.repos.insert((owner.to_string(), repo.to_string()));
        self
    }

    pub fn with_dir(mut self, path: &str, entries: Vec<RepoEntry>) -> Self {
        self.dirs.insert(path.to_string(), entries);
        self
    }

    pub fn with_file(mut self, path: &str, content: &str, description: &str) -> Self {
        self.files
            .insert(path.to_string(), (content.to_string(), description.to_string()));
        self
    }

    pub fn with_tree(mut self, tree: &str) -> Self {
        self.tree = tree.to_string();
        self
    }

    pub fn failing_at(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    fn not_found() -> ClientError {
        ClientError::Server {
            status: 500,
            message: "Failed to fetch repository contents: 404 Not Found: Not Found".into(),
        }
    }

    fn log(&self, request: String) {
        self.requests.lock().unwrap().push(request);
    }
}

#[async_trait]
impl DungeonApi for FakeApi {
    async fn repo_root(&self, owner: &str, repo: &str) -> Result<Vec<RepoEntry>, ClientError> {
        self.log(format!("root {owner}/{repo}"));
        if !self.repos.contains(&(owner.to_string(), repo.to_string())) || self.failing.contains("") {
            return Err(Self::not_found());
        }
        self.dirs.get("").cloned().ok_or_else(Self::not_found)
    }

    async fn contents(
        &self,
        _owner: &str,
        _repo: &str,
        path: &str,
    ) -> Result<ContentResponse, ClientError> {
        self.log(format!("file {path}"));
        if self.failing.contains(path) {
            return Err(Self::not_found());
        }
        if let Some(entries) = self.dirs.get(path) {
            return Ok(ContentResponse::Listing(entries.clone()));
        }
        let (content, description) = self.files.get(path).ok_or_else(Self::not_found)?;
        let RepoEntry::File(file) = file_with_body(path, content) else {
            unreachable!()
        };
        Ok(ContentResponse::File(FileView {
            file,
            entry_type: "file".into(),
            ai_description: description.clone(),
            decoded_content: content.clone(),
        }))
    }

    async fn structure(&self, owner: &str, repo: &str) -> Result<String, ClientError> {
        self.log(format!("structure {owner}/{repo}"));
        Ok(self.tree.clone())
    }

    async fn describe(
        &self,
        code: &str,
        kind: DescriptionKind,
        file_name: Option<&str>,
    ) -> Result<String, ClientError> {
        self.log(format!(
            "describe {} {} {}",
            kind.as_hint(),
            file_name.unwrap_or("-"),
            code.len()
        ));
        Ok(format!("A {} scroll of {} runes.", kind.as_hint(), code.len()))
    }
}

/// The octocat/hello-world layout used by the session tests.
pub fn hello_world_api() -> FakeApi {
    FakeApi::new()
        .with_repo("octocat", "hello-world")
        .with_dir("", vec![dir("docs"), dir("src"), file("README.md")])
        .with_dir("docs", vec![file("docs/README.md"), dir("docs/images")])
        .with_dir("docs/images", vec![file("docs/images/logo.png")])
        .with_dir("src", vec![file("src/main.rs")])
        .with_file("README.md", "# Hello World\n", "A shimmering welcome plaque.")
        .with_file("docs/README.md", "# Docs\n", "An ancient map of lore.")
        .with_file("src/main.rs", "fn main() {}\n", "The beating heart of the dungeon.")
        .with_tree("├─ docs\n│  └─ README.md\n├─ src\n│  └─ main.rs\n└─ README.md\n")
}
