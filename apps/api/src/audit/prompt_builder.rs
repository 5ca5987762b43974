//! Prompt Builder: renders the audit template from the business profile and scoring data.

use crate::audit::prompts::AUDIT_PROMPT_TEMPLATE;
use crate::insights::entities::InsightRecord;

/// Renders the audit prompt. Deterministic: identical inputs give identical bytes.
///
/// Every marker starts exactly one line. Single-line values are JSON-encoded, so
/// free text from the request cannot open a new line that imitates a marker.
pub fn build_prompt(
    business_type: &str,
    location: &str,
    products: &[String],
    score: u32,
    tags: &[String],
    records: &[InsightRecord],
) -> Result<String, serde_json::Error> {
    let business_type_json = serde_json::to_string(business_type)?;
    let location_json = serde_json::to_string(location)?;
    let products_json = serde_json::to_string(products)?;
    let tags_json = serde_json::to_string(tags)?;
    let records_json = serde_json::to_string_pretty(records)?;
    let score = score.to_string();

    Ok(fill_template(
        AUDIT_PROMPT_TEMPLATE,
        &[
            ("business_type_json", &business_type_json),
            ("location_json", &location_json),
            ("products_json", &products_json),
            ("score", &score),
            ("tags_json", &tags_json),
            ("records_json", &records_json),
        ],
    ))
}

/// Single-pass `{key}` substitution. Inserted values are never rescanned, and
/// braces that do not name a known key are copied through.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];

        let hit = values.iter().find(|(key, _)| {
            tail.strip_prefix(key)
                .is_some_and(|after| after.starts_with('}'))
        });

        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}
