// All LLM prompt constants for the audit module.

/// System prompt for audit generation; enforces JSON-only output.
pub const AUDIT_SYSTEM: &str = "You are a sustainability consultant for small, independent businesses. \
    You write short, concrete audits grounded only in the comparable-business data you are given. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT invent businesses, tags, or figures that are not in the data.";

/// Audit prompt template.
/// Replace: {business_type_json}, {location_json}, {products_json}, {score}, {tags_json}, {records_json}
///
/// Every placeholder sits behind a fixed marker and receives a single-line JSON
/// value, so the rendered values can be located again verbatim.
pub const AUDIT_PROMPT_TEMPLATE: &str = r#"Audit the sustainability of the small business described below.

BUSINESS PROFILE
BUSINESS TYPE: {business_type_json}
LOCATION: {location_json}
PRODUCTS: {products_json}

SCORING DATA
COMPUTED SUSTAINABILITY SCORE: {score}
SUSTAINABILITY TAGS: {tags_json}
COMPARABLE BUSINESSES (affinity -1..1, popularity 0..1, tag weights are relative):
{records_json}
END COMPARABLE BUSINESSES

REASONING RUBRIC:
1. STRENGTHS (exactly 3): each must cite a comparable business with high affinity or popularity whose tags intersect the SUSTAINABILITY TAGS, and say what this business already shares with it.
2. IMPROVEMENTS (exactly 2): each must cite a sustainability tag that is absent or rare among the comparable businesses, and say how this business could adopt it.
3. TIP: the single highest-impact improvement, phrased as one concrete action the owner can take.
4. sustainability_score MUST equal the COMPUTED SUSTAINABILITY SCORE.
5. business_name: a short descriptive name built from the business type and location.

Return a JSON object with this EXACT schema (no extra fields):
{
  "business_name": "Independent Vegan Café, Brussels",
  "sustainability_score": 72,
  "strengths": ["...", "...", "..."],
  "improvements": ["...", "..."],
  "tip": "..."
}"#;
