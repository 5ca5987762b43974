//! Tag Fetcher: collects the sustainability / dietary tag taxonomy page by page.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::insights::{required_array, InsightsClient, InsightsError};

const TAGS_PATH: &str = "/v2/tags";
/// Tag types that make up the sustainability taxonomy.
const SUSTAINABILITY_TAG_TYPES: &str = "urn:tag:sustainability_initiative,urn:tag:dietary_option";
/// A page holding exactly this many entries means another page may follow.
pub const TAG_PAGE_SIZE: usize = 50;

/// A taxonomy entry. Identity is `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl InsightsClient {
    /// Returns the names of every sustainability and dietary-option tag, in API order.
    pub async fn fetch_sustainability_tags(&self) -> Result<Vec<String>, InsightsError> {
        let tags = self.fetch_tag_taxonomy().await?;
        Ok(tags.into_iter().map(|tag| tag.name).collect())
    }

    /// Walks the tag pages until a short page arrives or `max_tag_pages` is reached.
    /// A failure on any page fails the whole fetch.
    pub async fn fetch_tag_taxonomy(&self) -> Result<Vec<Tag>, InsightsError> {
        let endpoint = self.endpoint(TAGS_PATH);
        let mut tags = Vec::new();

        for page in 1..=self.config.max_tag_pages {
            let query = [
                ("filter.tag.types", SUSTAINABILITY_TAG_TYPES.to_string()),
                ("take", TAG_PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ];
            let body = self.get_json(TAGS_PATH, &query).await?;
            let raw_tags = required_array(&body, "/results/tags", &endpoint)?;

            let before = tags.len();
            tags.extend(raw_tags.iter().filter_map(parse_tag));
            debug!(
                "Tag page {page}: {} entries, {} usable",
                raw_tags.len(),
                tags.len() - before
            );

            if raw_tags.len() < TAG_PAGE_SIZE {
                info!("Fetched {} sustainability tags over {page} page(s)", tags.len());
                return Ok(tags);
            }
        }

        warn!(
            "Tag pagination stopped at the {}-page limit with {} tags; later pages were not fetched",
            self.config.max_tag_pages,
            tags.len()
        );
        Ok(tags)
    }
}

fn parse_tag(raw: &Value) -> Option<Tag> {
    let name = raw.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let category = raw
        .get("type")
        .or_else(|| raw.get("category"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(Tag {
        name: name.to_string(),
        category,
    })
}
