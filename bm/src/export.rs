//! Recipe export rendering
//!
//! Turns a completed recommendation into shareable markdown. The caller
//! checks the recipe-export gate before offering this.

use chrono::{DateTime, Utc};
use tracing::debug;

/// Everything a rendered export carries
#[derive(Debug, Clone)]
pub struct RecipeExport<'a> {
    pub food_items: &'a [String],
    pub prompt: &'a str,
    pub vibe: Option<&'a str>,
    pub result: &'a str,
    pub savings: Option<&'a str>,
    pub exported_at: DateTime<Utc>,
}

/// Render a recommendation as shareable markdown
pub fn render_markdown(export: &RecipeExport<'_>) -> String {
    debug!(item_count = export.food_items.len(), "render_markdown: called");
    let mut out = String::new();

    out.push_str("# BiteMatch Recommendation\n\n");

    if !export.food_items.is_empty() {
        out.push_str("## On the plate\n\n");
        for item in export.food_items {
            out.push_str(&format!("- {item}\n"));
        }
        out.push('\n');
    }

    if let Some(vibe) = export.vibe {
        out.push_str(&format!("*Vibe: {vibe}*\n\n"));
    }

    out.push_str(&format!("**Question:** {}\n\n", export.prompt));
    out.push_str(&format!("## Recommendation\n\n{}\n", export.result));

    if let Some(savings) = export.savings {
        out.push_str(&format!("\n## Savings insight\n\n{savings}\n"));
    }

    out.push_str(&format!(
        "\n---\nExported from BiteMatch on {}\n",
        export.exported_at.format("%Y-%m-%d")
    ));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample<'a>(items: &'a [String]) -> RecipeExport<'a> {
        RecipeExport {
            food_items: items,
            prompt: "How much ketchup?",
            vibe: Some("Classic Comfort"),
            result: "Two tablespoons.",
            savings: Some("Saves $0.50 per meal."),
            exported_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_render_includes_all_sections() {
        let items = vec!["Fries".to_string(), "Ketchup".to_string()];
        let md = render_markdown(&sample(&items));

        assert!(md.contains("# BiteMatch Recommendation"));
        assert!(md.contains("- Fries"));
        assert!(md.contains("- Ketchup"));
        assert!(md.contains("*Vibe: Classic Comfort*"));
        assert!(md.contains("**Question:** How much ketchup?"));
        assert!(md.contains("Two tablespoons."));
        assert!(md.contains("## Savings insight"));
        assert!(md.contains("2025-06-01"));
    }

    #[test]
    fn test_render_omits_empty_sections() {
        let items: Vec<String> = vec![];
        let mut export = sample(&items);
        export.vibe = None;
        export.savings = None;

        let md = render_markdown(&export);
        assert!(!md.contains("On the plate"));
        assert!(!md.contains("Vibe:"));
        assert!(!md.contains("Savings insight"));
    }
}
