pub mod blocks;

use serde::Serialize;
use tracing::warn;

use self::blocks::Block;

/// Most paragraph-like entries ever collected; first found wins, no dedup.
pub const PARAGRAPH_CAP: usize = 8;
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// Source of a block's children: the first page of up to 100, in order.
/// Pagination past the first page is not handled.
#[allow(async_fn_in_trait)]
pub trait BlockFetcher {
    async fn fetch_children(&self, block_id: &str) -> anyhow::Result<Vec<Block>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// Flat, categorized summary of a page's block tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionResult {
    pub title: String,
    pub subpages: Vec<String>,
    pub databases: Vec<String>,
    pub headings: Vec<Heading>,
    pub paragraphs: Vec<String>,
}

/// Walk a page's block tree up to `max_depth` levels below the top-level
/// children and reduce it to an [`ExtractionResult`].
///
/// Depth-first, pre-order: a block's own content is recorded before its
/// children are visited, and a block's subtree is fully visited before the
/// next sibling. A failed child fetch degrades to "no children" for that
/// node; extraction is best-effort and never aborts on a sub-fetch.
pub async fn extract<F: BlockFetcher>(
    fetcher: &F,
    page_id: &str,
    title: String,
    max_depth: u32,
) -> ExtractionResult {
    let mut result = ExtractionResult {
        title,
        ..Default::default()
    };

    let top = fetch_or_empty(fetcher, page_id).await;

    // Explicit work stack, pushed in reverse to preserve sibling order.
    // Each entry carries its remaining depth budget; 0 means no more fetches.
    let mut stack: Vec<(Block, u32)> = top.into_iter().rev().map(|b| (b, max_depth)).collect();

    while let Some((block, depth)) = stack.pop() {
        record(&block, &mut result);

        if depth > 0 && block.has_children && block.is_container() {
            let children = fetch_or_empty(fetcher, &block.id).await;
            for child in children.into_iter().rev() {
                stack.push((child, depth - 1));
            }
        }
    }

    result
}

async fn fetch_or_empty<F: BlockFetcher>(fetcher: &F, block_id: &str) -> Vec<Block> {
    match fetcher.fetch_children(block_id).await {
        Ok(children) => children,
        Err(e) => {
            warn!("Child fetch for {} failed, treating as no children: {}", block_id, e);
            Vec::new()
        }
    }
}

fn record(block: &Block, result: &mut ExtractionResult) {
    match block.block_type.as_str() {
        "child_page" => {
            if let Some(title) = block.title().filter(|t| !t.is_empty()) {
                result.subpages.push(title.to_string());
            }
        }
        "child_database" => {
            if let Some(title) = block.title().filter(|t| !t.is_empty()) {
                result.databases.push(title.to_string());
            }
        }
        _ => {
            if let Some(level) = block.heading_level() {
                let text = block.plain_text();
                if !text.is_empty() {
                    result.headings.push(Heading { level, text });
                }
            } else if block.is_paragraph_like() {
                let text = block.plain_text();
                if !text.is_empty() && result.paragraphs.len() < PARAGRAPH_CAP {
                    result.paragraphs.push(text);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    use serde_json::{json, Value};

    use super::*;

    /// In-memory tree: children keyed by parent id, with optional forced
    /// failures and a log of every fetch issued.
    #[derive(Default)]
    struct StaticTree {
        children: HashMap<String, Vec<Block>>,
        fail: HashSet<String>,
        calls: RefCell<Vec<String>>,
    }

    impl StaticTree {
        fn with(mut self, parent: &str, blocks: Vec<Block>) -> Self {
            self.children.insert(parent.to_string(), blocks);
            self
        }

        fn failing(mut self, id: &str) -> Self {
            self.fail.insert(id.to_string());
            self
        }
    }

    impl BlockFetcher for StaticTree {
        async fn fetch_children(&self, block_id: &str) -> anyhow::Result<Vec<Block>> {
            self.calls.borrow_mut().push(block_id.to_string());
            if self.fail.contains(block_id) {
                anyhow::bail!("HTTP 500 Internal Server Error");
            }
            Ok(self.children.get(block_id).cloned().unwrap_or_default())
        }
    }

    fn block(raw: Value) -> Block {
        serde_json::from_value(raw).unwrap()
    }

    fn text_block(ty: &str, id: &str, has_children: bool, text: &str) -> Block {
        block(json!({
            "id": id,
            "type": ty,
            "has_children": has_children,
            ty: { "rich_text": [{ "plain_text": text }] }
        }))
    }

    fn paragraph(id: &str, text: &str) -> Block {
        text_block("paragraph", id, false, text)
    }

    fn child_page(id: &str, title: &str) -> Block {
        block(json!({
            "id": id,
            "type": "child_page",
            "has_children": true,
            "child_page": { "title": title }
        }))
    }

    async fn run(tree: &StaticTree, depth: u32) -> ExtractionResult {
        extract(tree, "page", "Test Page".to_string(), depth).await
    }

    #[tokio::test]
    async fn heading_paragraph_and_nested_toggle() {
        let tree = StaticTree::default()
            .with(
                "page",
                vec![
                    text_block("heading_1", "h1", false, "Intro"),
                    paragraph("p1", "Hello"),
                    text_block("toggle", "t1", true, ""),
                ],
            )
            .with("t1", vec![paragraph("p2", "Nested")]);

        let result = run(&tree, 3).await;
        assert_eq!(result.title, "Test Page");
        assert_eq!(
            result.headings,
            vec![Heading { level: 1, text: "Intro".to_string() }]
        );
        assert_eq!(result.paragraphs, vec!["Hello", "Nested"]);
        assert!(result.subpages.is_empty());
        assert!(result.databases.is_empty());
    }

    #[tokio::test]
    async fn depth_zero_skips_all_recursion() {
        let tree = StaticTree::default()
            .with(
                "page",
                vec![paragraph("p1", "Top"), text_block("toggle", "t1", true, "")],
            )
            .with("t1", vec![paragraph("p2", "Hidden")]);

        let result = run(&tree, 0).await;
        assert_eq!(result.paragraphs, vec!["Top"]);
        // Only the top-level fetch happened.
        assert_eq!(*tree.calls.borrow(), vec!["page"]);
    }

    #[tokio::test]
    async fn depth_budget_stops_below_limit() {
        let tree = StaticTree::default()
            .with("page", vec![text_block("toggle", "t1", true, "")])
            .with("t1", vec![text_block("toggle", "t2", true, "")])
            .with("t2", vec![paragraph("deep", "Too deep")]);

        let result = run(&tree, 1).await;
        // t1's children are fetched with the last depth unit; t2 is not.
        assert!(result.paragraphs.is_empty());
        assert_eq!(*tree.calls.borrow(), vec!["page", "t1"]);
    }

    #[tokio::test]
    async fn paragraphs_capped_at_first_eight() {
        let blocks: Vec<Block> = (1..=9)
            .map(|i| paragraph(&format!("p{}", i), &format!("Paragraph {}", i)))
            .collect();
        let tree = StaticTree::default().with("page", blocks);

        let result = run(&tree, 3).await;
        assert_eq!(result.paragraphs.len(), 8);
        let expected: Vec<String> = (1..=8).map(|i| format!("Paragraph {}", i)).collect();
        assert_eq!(result.paragraphs, expected);
    }

    #[tokio::test]
    async fn cap_applies_across_nesting() {
        let top: Vec<Block> = (1..=7)
            .map(|i| paragraph(&format!("p{}", i), &format!("Top {}", i)))
            .chain([text_block("toggle", "t1", true, "")])
            .collect();
        let tree = StaticTree::default().with("page", top).with(
            "t1",
            vec![paragraph("n1", "Nested 1"), paragraph("n2", "Nested 2")],
        );

        let result = run(&tree, 3).await;
        assert_eq!(result.paragraphs.len(), 8);
        assert_eq!(result.paragraphs[7], "Nested 1");
    }

    #[tokio::test]
    async fn empty_titles_and_empty_text_filtered() {
        let tree = StaticTree::default().with(
            "page",
            vec![
                child_page("c1", ""),
                child_page("c2", "Kept"),
                block(json!({
                    "id": "d1",
                    "type": "child_database",
                    "child_database": { "title": "" }
                })),
                paragraph("p1", ""),
                text_block("heading_2", "h1", false, ""),
            ],
        );

        let result = run(&tree, 3).await;
        assert_eq!(result.subpages, vec!["Kept"]);
        assert!(result.databases.is_empty());
        assert!(result.headings.is_empty());
        assert!(result.paragraphs.is_empty());
    }

    #[tokio::test]
    async fn callout_contributes_text_and_children() {
        let tree = StaticTree::default()
            .with("page", vec![text_block("callout", "c1", true, "Heads up")])
            .with("c1", vec![paragraph("p1", "Inside the callout")]);

        let result = run(&tree, 3).await;
        // Pre-order: the callout's own text comes before its child's.
        assert_eq!(result.paragraphs, vec!["Heads up", "Inside the callout"]);
    }

    #[tokio::test]
    async fn child_page_is_not_recursed_into() {
        let tree = StaticTree::default()
            .with("page", vec![child_page("c1", "Sub")])
            .with("c1", vec![paragraph("p1", "Should not appear")]);

        let result = run(&tree, 3).await;
        assert_eq!(result.subpages, vec!["Sub"]);
        assert!(result.paragraphs.is_empty());
        assert_eq!(*tree.calls.borrow(), vec!["page"]);
    }

    #[tokio::test]
    async fn failed_child_fetch_degrades_to_empty() {
        let tree = StaticTree::default()
            .with(
                "page",
                vec![
                    paragraph("p1", "Before"),
                    text_block("toggle", "t1", true, ""),
                    paragraph("p2", "After"),
                ],
            )
            .failing("t1");

        let result = run(&tree, 3).await;
        // The failing toggle contributes nothing below itself; the rest of
        // the traversal is unaffected.
        assert_eq!(result.paragraphs, vec!["Before", "After"]);
    }

    #[tokio::test]
    async fn sibling_order_preserved_around_recursion() {
        let tree = StaticTree::default()
            .with(
                "page",
                vec![
                    text_block("bulleted_list_item", "b1", true, "First"),
                    text_block("bulleted_list_item", "b2", false, "Third"),
                ],
            )
            .with("b1", vec![paragraph("p1", "Second")]);

        let result = run(&tree, 3).await;
        assert_eq!(result.paragraphs, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn result_serializes_with_expected_keys() {
        let result = ExtractionResult {
            title: "T".to_string(),
            headings: vec![Heading { level: 2, text: "H".to_string() }],
            ..Default::default()
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["title"], "T");
        assert_eq!(value["headings"][0]["level"], 2);
        assert_eq!(value["headings"][0]["text"], "H");
        assert!(value["subpages"].as_array().unwrap().is_empty());
        assert!(value["databases"].as_array().unwrap().is_empty());
        assert!(value["paragraphs"].as_array().unwrap().is_empty());
    }
}
