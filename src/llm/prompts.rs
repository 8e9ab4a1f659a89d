//! Prompt templates. Every builder returns a ready-to-send request whose
//! answer is expected to be a single JSON value.

use crate::models::{AlignmentState, Archetype, Aspiration, DailyLog, ImageData, WardrobeItem};

use super::LlmRequest;

pub const SYSTEM_JSON_ONLY: &str =
    "You are a JSON-only API. Respond with valid JSON only, no markdown, no explanations, no other text.";

pub const SYSTEM_ADVISOR: &str = "You are a personal style advisor helping users align their wardrobe with their aspirational identity. Be specific, actionable, and encouraging. Respond with valid JSON only.";

pub const SYSTEM_EXTRACTION: &str = "You are a JSON extraction API. You MUST respond with ONLY valid JSON. Never include explanations, apologies, or conversational text. If you cannot determine a field, make a reasonable inference. Output pure JSON only.";

fn join_or(values: &[String], empty: &str) -> String {
    if values.is_empty() {
        empty.to_string()
    } else {
        values.join(", ")
    }
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}

fn wardrobe_lines(items: &[WardrobeItem]) -> String {
    if items.is_empty() {
        return "Empty".to_string();
    }
    items
        .iter()
        .map(|item| {
            format!(
                "- {} ({}): {}, {}",
                item.name,
                item.category,
                or_na(&item.color),
                or_na(&item.style)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn identity_archetype(keywords: &[String], image_count: usize) -> LlmRequest {
    let prompt = format!(
        r#"KEYWORDS: {keywords}
IMAGES: {image_count} inspiration images provided

Create an identity archetype profile. Output ONLY valid JSON, no other text or explanation.

{{
  "name": "archetype name (e.g. Confident Creative Minimalist)",
  "description": "2-3 sentences about this identity",
  "colorPalette": ["color1", "color2", "color3", "color4", "color5"],
  "silhouettes": ["silhouette1", "silhouette2", "silhouette3"],
  "archetypes": ["item1", "item2", "item3", "item4"],
  "styleStatement": "one powerful sentence",
  "behavioralCues": ["cue1", "cue2", "cue3"]
}}"#,
        keywords = join_or(keywords, "none"),
    );
    LlmRequest::text(SYSTEM_JSON_ONLY, prompt)
}

pub fn detect_item(description: Option<&str>, image: Option<&ImageData>) -> LlmRequest {
    let mut prompt = String::new();
    if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
        prompt.push_str(&format!("USER DESCRIPTION: {description}\n\n"));
    }
    if image.is_none() {
        prompt.push_str("NOTE: No image provided. Infer details from description.\n\n");
    }
    prompt.push_str(
        r#"TASK: Analyze this clothing item and extract structured information.

Respond with ONLY this JSON object:
{
  "name": "descriptive item name",
  "category": "top|bottom|shoes|accessory|outerwear",
  "color": "primary color",
  "style": "style description (e.g., casual, formal, streetwear)",
  "formality": "casual|business casual|formal",
  "season": "all|spring|summer|fall|winter"
}"#,
    );
    LlmRequest::vision(SYSTEM_EXTRACTION, prompt, image)
}

pub fn item_analysis(item: &WardrobeItem, aspirations: &[Aspiration]) -> LlmRequest {
    let aspiration_lines = aspirations
        .iter()
        .map(|aspiration| {
            format!(
                "- {}: {} (Keywords: {})",
                aspiration.name,
                aspiration.description,
                join_or(&aspiration.keywords, "none")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        r#"Analyze this clothing item against the user's aspirational identities.

CLOTHING ITEM:
- Name: {name}
- Category: {category}
- Description: {description}
- Color: {color}
- Brand: {brand}

ASPIRATIONAL IDENTITIES:
{aspiration_lines}

For each aspiration, provide a match score (0-100), a brief reasoning and styling suggestions.

Respond with a JSON array where each object has:
{{
  "aspirationName": "name",
  "matchScore": 0,
  "reasoning": "brief explanation",
  "suggestions": "styling tips"
}}"#,
        name = item.name,
        category = item.category,
        description = or_na(item.description.as_deref().unwrap_or("")),
        color = or_na(&item.color),
        brand = or_na(item.brand.as_deref().unwrap_or("")),
    );
    LlmRequest::text(SYSTEM_ADVISOR, prompt)
}

pub fn calculate_alignment(
    archetype: &Archetype,
    wardrobe: &[WardrobeItem],
    recent_logs: &[DailyLog],
) -> LlmRequest {
    let behavior = if recent_logs.is_empty() {
        "No recent activity".to_string()
    } else {
        let counts = recent_logs
            .iter()
            .map(|log| log.items_worn.len().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!("Worn items: {counts} items over {} days", recent_logs.len())
    };

    let prompt = format!(
        r#"IDENTITY: {name}
Colors: {colors}
Silhouettes: {silhouettes}

WARDROBE: {count} items
{wardrobe}

BEHAVIOR: {behavior}

Calculate alignment scores (0-100). Output ONLY valid JSON, no other text.

{{
  "overall": 67,
  "identity": {{"score": 75, "insights": ["insight 1", "insight 2"]}},
  "wardrobe": {{"score": 80, "insights": ["insight 1", "insight 2"]}},
  "behavior": {{"score": 45, "insights": ["insight 1", "insight 2"]}}
}}"#,
        name = archetype.name,
        colors = join_or(&archetype.color_palette, "none"),
        silhouettes = join_or(&archetype.silhouettes, "none"),
        count = wardrobe.len(),
        wardrobe = wardrobe_lines(wardrobe),
    );
    LlmRequest::text(SYSTEM_JSON_ONLY, prompt)
}

pub fn daily_log(archetype: &Archetype, items_worn: &[WardrobeItem]) -> LlmRequest {
    let items = items_worn
        .iter()
        .map(|item| format!("- {} ({}, {})", item.name, item.category, or_na(&item.color)))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        r#"IDENTITY: {name}
Cues: {cues}

ITEMS WORN:
{items}

Analyze outfit alignment. Output ONLY valid JSON, no other text.

{{
  "colors": ["color1", "color2"],
  "silhouette": "description",
  "formality": "casual|business casual|formal",
  "alignmentScore": 75,
  "insight": "one sentence"
}}"#,
        name = archetype.name,
        cues = join_or(&archetype.behavioral_cues, "none"),
    );
    LlmRequest::text(SYSTEM_JSON_ONLY, prompt)
}

pub fn generate_outfit(
    aspiration: &Aspiration,
    archetype: Option<&Archetype>,
    wardrobe: &[WardrobeItem],
    occasion: &str,
) -> LlmRequest {
    let statement = archetype
        .map(|a| a.style_statement.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(aspiration.description.as_str());
    let colors = archetype
        .map(|a| join_or(&a.color_palette, "any"))
        .unwrap_or_else(|| join_or(&aspiration.colors, "any"));

    let prompt = format!(
        r#"ASPIRATION: {name}
Statement: {statement}
Keywords: {keywords}
Colors: {colors}

OCCASION: {occasion}

ITEMS:
{items}

Create one outfit with 3-5 items chosen by exact name from ITEMS. Output ONLY valid JSON, no other text.

{{
  "name": "outfit name",
  "items": ["item name 1", "item name 2"],
  "alignmentScore": 85,
  "reason": "why this works",
  "stylingTips": "how to wear"
}}"#,
        name = aspiration.name,
        keywords = join_or(&aspiration.keywords, "none"),
        items = wardrobe_lines(wardrobe),
    );
    LlmRequest::text(SYSTEM_JSON_ONLY, prompt)
}

pub fn match_inspiration(description: &str, wardrobe: &[WardrobeItem]) -> LlmRequest {
    let prompt = format!(
        r#"INSPIRATION: "{description}"

AVAILABLE WARDROBE ITEMS:
{items}

Pick 3-5 items by exact name from the list that together recreate a similar look.

Respond with JSON:
{{
  "matchingItems": ["item name 1", "item name 2"],
  "reasoning": "why these items recreate the look",
  "missingElements": "what the wardrobe lacks for the full look",
  "stylingAdvice": "how to wear these items"
}}"#,
        items = wardrobe_lines(wardrobe),
    );
    LlmRequest::text(SYSTEM_ADVISOR, prompt)
}

pub fn recommendations(
    identity_name: &str,
    aspiration: Option<&Aspiration>,
    alignment: &AlignmentState,
    wardrobe: &[WardrobeItem],
) -> LlmRequest {
    let focus = aspiration
        .map(|a| format!("\nFOCUS ASPIRATION: {} ({})", a.name, a.description))
        .unwrap_or_default();
    let insights = alignment.identity.insights.join(". ");

    let prompt = format!(
        r#"IDENTITY: {identity_name}{focus}
ALIGNMENT: {overall}%

WARDROBE:
{items}

INSIGHTS:
{insights}

Generate 3-5 recommendations. Output ONLY valid JSON array, no other text.

[
  {{
    "type": "wear-existing|consider-adding",
    "item": "description",
    "reason": "why this helps",
    "priority": "high|medium|low",
    "alignmentImpact": 15
  }}
]"#,
        overall = alignment.overall,
        items = wardrobe_lines(wardrobe),
    );
    LlmRequest::text(SYSTEM_JSON_ONLY, prompt)
}

pub fn style_insights(aspiration: &Aspiration) -> LlmRequest {
    let prompt = format!(
        r#"Provide comprehensive style guidance for someone aspiring to embody this identity:

ASPIRATION:
- Name: {name}
- Description: {description}
- Keywords: {keywords}

Respond with JSON:
{{
  "styleElements": {{
    "colors": ["color 1", "color 2", "color 3"],
    "silhouettes": ["silhouette 1", "silhouette 2"],
    "fabrics": ["fabric 1", "fabric 2", "fabric 3"]
  }},
  "essentialPieces": ["item 1", "item 2", "item 3", "item 4", "item 5"],
  "dos": ["do 1", "do 2", "do 3"],
  "donts": ["don't 1", "don't 2", "don't 3"],
  "transitionTips": ["step 1: ...", "step 2: ...", "step 3: ..."]
}}"#,
        name = aspiration.name,
        description = aspiration.description,
        keywords = join_or(&aspiration.keywords, "none"),
    );
    LlmRequest::text(SYSTEM_ADVISOR, prompt)
}
