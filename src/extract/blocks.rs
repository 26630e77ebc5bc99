use serde::Deserialize;
use serde_json::Value;

/// Block types that may hold nested children eligible for traversal.
const CONTAINER_TYPES: &[&str] = &[
    "column_list",
    "column",
    "toggle",
    "callout",
    "bulleted_list_item",
    "numbered_list_item",
    "quote",
    "synced_block",
    "template",
];

/// Block types whose rich text is collected as paragraph-like content.
/// callout/quote/bulleted/numbered are also containers: such a block can
/// contribute its own text AND be descended into.
const PARAGRAPH_TYPES: &[&str] = &[
    "paragraph",
    "callout",
    "quote",
    "bulleted_list_item",
    "numbered_list_item",
    "to_do",
];

/// One block from a `/blocks/{id}/children` response. The type-specific
/// payload lives under a key named after the block type (e.g. `paragraph`),
/// so it is kept as flattened JSON and navigated on demand.
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(flatten)]
    rest: serde_json::Map<String, Value>,
}

impl Block {
    fn payload(&self) -> Option<&Value> {
        self.rest.get(&self.block_type)
    }

    /// Concatenated `plain_text` of the block's rich-text runs, in order.
    /// Formatting attributes are discarded.
    pub fn plain_text(&self) -> String {
        self.payload()
            .and_then(|p| p.get("rich_text"))
            .and_then(Value::as_array)
            .map(|runs| {
                runs.iter()
                    .filter_map(|run| run.get("plain_text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Title string of a `child_page` / `child_database` payload.
    pub fn title(&self) -> Option<&str> {
        self.payload().and_then(|p| p.get("title")).and_then(Value::as_str)
    }

    pub fn is_container(&self) -> bool {
        CONTAINER_TYPES.contains(&self.block_type.as_str())
    }

    pub fn is_paragraph_like(&self) -> bool {
        PARAGRAPH_TYPES.contains(&self.block_type.as_str())
    }

    /// 1..=3 for heading_1/heading_2/heading_3, None otherwise.
    pub fn heading_level(&self) -> Option<u8> {
        let level = self.block_type.strip_prefix("heading_")?.parse::<u8>().ok()?;
        (1..=3).contains(&level).then_some(level)
    }
}
