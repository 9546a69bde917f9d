// Recursive repository map: walks the contents API and renders an indented tree.

use futures::future::{BoxFuture, FutureExt};

use crate::github::{RepoClient, RepoEntry, RepoError};

/// One node of a [`DirectoryTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    /// Terminal marker: files, symlinks and submodules.
    File,
    Dir(DirectoryTree),
}

/// Entry name to node, in upstream listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryTree {
    entries: Vec<(String, TreeNode)>,
}

impl DirectoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, node: TreeNode) {
        self.entries.push((name.into(), node));
    }

    pub fn entries(&self) -> &[(String, TreeNode)] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&TreeNode> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, node)| node)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of nodes at every level.
    pub fn node_count(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, node)| match node {
                TreeNode::File => 1,
                TreeNode::Dir(child) => 1 + child.node_count(),
            })
            .sum()
    }

    /// Render as box-drawn text, one entry per line.
    ///
    /// ```text
    /// ├─ src
    /// │  └─ main.rs
    /// └─ README.md
    /// ```
    pub fn render(&self) -> String {
        let mut out = String::new();
        render_into(self, "", &mut out);
        out
    }
}

fn render_into(tree: &DirectoryTree, prefix: &str, out: &mut String) {
    let count = tree.entries.len();
    for (i, (name, node)) in tree.entries.iter().enumerate() {
        let last = i + 1 == count;
        out.push_str(prefix);
        out.push_str(if last { "└─ " } else { "├─ " });
        out.push_str(name);
        out.push('\n');
        if let TreeNode::Dir(child) = node {
            let child_prefix = format!("{prefix}{}", if last { "   " } else { "│  " });
            render_into(child, &child_prefix, out);
        }
    }
}

/// Ceilings that keep a map request bounded on huge repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLimits {
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl Default for TreeLimits {
    fn default() -> Self {
        Self {
            max_depth: 12,
            max_nodes: 5000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error(transparent)]
    Fetch(#[from] RepoError),
    #[error("The dungeon descends deeper than {0} levels")]
    TooDeep(usize),
    #[error("The dungeon holds more than {0} chambers and artifacts")]
    TooLarge(usize),
}

/// Build the full tree under `dir`. Any failed fetch or exceeded limit fails the whole build.
pub async fn build_tree(
    client: &RepoClient,
    owner: &str,
    repo: &str,
    dir: &str,
    limits: TreeLimits,
) -> Result<DirectoryTree, TreeError> {
    let mut walker = Walker {
        client,
        owner,
        repo,
        limits,
        nodes: 0,
    };
    walker.walk(dir.to_string(), 0).await
}

struct Walker<'a> {
    client: &'a RepoClient,
    owner: &'a str,
    repo: &'a str,
    limits: TreeLimits,
    nodes: usize,
}

impl<'a> Walker<'a> {
    fn walk(&mut self, dir: String, depth: usize) -> BoxFuture<'_, Result<DirectoryTree, TreeError>> {
        async move {
            let entries = self
                .client
                .fetch_contents(self.owner, self.repo, &dir)
                .await?;

            let mut tree = DirectoryTree::new();
            for entry in entries {
                self.nodes += 1;
                if self.nodes > self.limits.max_nodes {
                    return Err(TreeError::TooLarge(self.limits.max_nodes));
                }
                match entry {
                    RepoEntry::Dir(meta) => {
                        if depth + 1 > self.limits.max_depth {
                            return Err(TreeError::TooDeep(self.limits.max_depth));
                        }
                        let child = self.walk(meta.path.clone(), depth + 1).await?;
                        tree.push(meta.name, TreeNode::Dir(child));
                    }
                    other => tree.push(other.name(), TreeNode::File),
                }
            }
            Ok(tree)
        }
        .boxed()
    }
}
