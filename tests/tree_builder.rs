// Integration tests for the recursive map builder against a fake remote tree.

mod common;

use std::sync::Arc;

use dungeon_backend::cache::ContentCache;
use dungeon_backend::github::RepoClient;
use dungeon_backend::tree::{build_tree, TreeError, TreeLimits, TreeNode};

use common::{dir, file, sample_source, FakeSource};

#[tokio::test]
async fn test_tree_mirrors_remote_layout() {
    let source = Arc::new(sample_source());
    let client = RepoClient::new(source, ContentCache::new());

    let tree = build_tree(&client, "octocat", "hello-world", "", TreeLimits::default())
        .await
        .unwrap();

    let names: Vec<&str> = tree.entries().iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["docs", "src", "README.md"]);
    assert_eq!(tree.get("README.md"), Some(&TreeNode::File));

    let Some(TreeNode::Dir(src)) = tree.get("src") else {
        panic!("src should be a directory");
    };
    assert_eq!(src.get("main.rs"), Some(&TreeNode::File));
    let Some(TreeNode::Dir(components)) = src.get("components") else {
        panic!("src/components should be a directory");
    };
    assert_eq!(components.get("Button.tsx"), Some(&TreeNode::File));
    assert_eq!(tree.node_count(), 8);
}

#[tokio::test]
async fn test_tree_renders_as_indented_text() {
    let source = Arc::new(sample_source());
    let client = RepoClient::new(source, ContentCache::new());

    let tree = build_tree(&client, "octocat", "hello-world", "", TreeLimits::default())
        .await
        .unwrap();

    let expected = "\
├─ docs
│  ├─ README.md
│  └─ guide.md
├─ src
│  ├─ components
│  │  └─ Button.tsx
│  └─ main.rs
└─ README.md
";
    assert_eq!(tree.render(), expected);
}

#[tokio::test]
async fn test_tree_from_subdirectory() {
    let source = Arc::new(sample_source());
    let client = RepoClient::new(source, ContentCache::new());

    let tree = build_tree(&client, "octocat", "hello-world", "src", TreeLimits::default())
        .await
        .unwrap();
    assert_eq!(tree.entries().len(), 2);
    assert!(tree.get("docs").is_none());
}

#[tokio::test]
async fn test_failed_subdirectory_fails_whole_tree() {
    let source = Arc::new(sample_source());
    source.fail("src/components");
    let client = RepoClient::new(source, ContentCache::new());

    let result = build_tree(&client, "octocat", "hello-world", "", TreeLimits::default()).await;
    assert!(matches!(result, Err(TreeError::Fetch(_))));
}

#[tokio::test]
async fn test_depth_ceiling() {
    let source = Arc::new(sample_source());
    let client = RepoClient::new(source, ContentCache::new());
    let limits = TreeLimits {
        max_depth: 1,
        max_nodes: 100,
    };

    // src/components sits at depth 2
    let result = build_tree(&client, "octocat", "hello-world", "", limits).await;
    assert!(matches!(result, Err(TreeError::TooDeep(1))));

    let shallow = build_tree(&client, "octocat", "hello-world", "docs", limits).await;
    assert!(shallow.is_ok());
}

#[tokio::test]
async fn test_node_ceiling() {
    let source = Arc::new(FakeSource::new());
    source.add_dir(
        "",
        vec![file("a.rs"), file("b.rs"), file("c.rs"), dir("d")],
    );
    source.add_dir("d", vec![]);
    let client = RepoClient::new(source, ContentCache::new());
    let limits = TreeLimits {
        max_depth: 12,
        max_nodes: 3,
    };

    let result = build_tree(&client, "octocat", "hello-world", "", limits).await;
    assert!(matches!(result, Err(TreeError::TooLarge(3))));
}

#[tokio::test]
async fn test_rebuilding_uses_cached_listings() {
    let source = Arc::new(sample_source());
    let client = RepoClient::new(source.clone(), ContentCache::new());

    for _ in 0..2 {
        build_tree(&client, "octocat", "hello-world", "", TreeLimits::default())
            .await
            .unwrap();
    }

    assert_eq!(source.calls(""), 1);
    assert_eq!(source.calls("src/components"), 1);
    assert_eq!(source.total_calls(), 4);
}
