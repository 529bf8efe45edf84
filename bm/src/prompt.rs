//! Prompt composition for recommendation requests
//!
//! The system instruction fixes the assistant persona and the
//! savings-segment wire protocol; the composed user prompt carries the
//! plate contents, the question, and optional vibe steering.

use tracing::debug;

/// Literal marker opening an embedded savings insight in the response
pub const SAVINGS_START: &str = "[SAVINGS_START]";

/// Literal marker closing an embedded savings insight in the response
pub const SAVINGS_END: &str = "[SAVINGS_END]";

/// System instruction sent with every generation
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful culinary assistant called 'BiteMatch AI'. Your goal is to help users perfectly pair their food items and figure out ideal portioning for maximum enjoyment.\n\n\
- Analyze the provided user descriptions and image (if available) to give a concise, practical, and friendly recommendation.\n\
- If the user provides an image but does not list any food items, your first step is to identify the main foods in the photo.\n\
- Critically analyze the user's question. If it mentions a specific food item (e.g., 'gravy for the potatoes'), tailor your recommendation to THAT ITEM, using the image for context about its portion size.\n\
- If the user provides a \"vibe\" (e.g., \"Healthy & Light\", \"Comfort Food\"), tailor your recommendation to match that theme.\n\
- When describing sizes or amounts, always use common, relatable objects for comparison (e.g., 'a dollop the size of a golf ball' instead of '2 tablespoons').\n\
- Start your response with a friendly tone and provide only the recommendation text. Do not use Markdown or JSON.\n\n\
- **Optional Cost Savings Insight:** After providing the main recommendation, you MAY add a brief insight about food waste prevention and potential cost savings *only for the recommended portion*.\n\
- Frame this insight conversationally, focusing on how proper portioning prevents waste and saves money.\n\
- **CRITICAL:** You MUST wrap this optional cost savings insight in special tags: [SAVINGS_START] and [SAVINGS_END]. If you have no insight, do not include the tags.";

/// The built-in vibe chips
pub const PRESET_VIBES: [&str; 4] = ["Classic Comfort", "Healthy & Light", "Quick & Easy", "Adventurous"];

/// Quick questions offered to the user
pub const PRESET_QUESTIONS: [&str; 4] = [
    "How much should I use?",
    "What's the perfect ratio?",
    "How do I make this taste better?",
    "What goes well with this?",
];

/// A follow-up chained to a completed recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpKind {
    /// Ask for a different idea for the same meal
    AnotherIdea,
    /// Ask for the reasoning behind the original recommendation
    Why,
}

impl FollowUpKind {
    /// Instruction appended to the follow-up prompt
    pub fn instruction(&self) -> &'static str {
        match self {
            FollowUpKind::AnotherIdea => {
                "Now, please give me another, different idea for this meal. \
                 Do not include nutritional info in this follow-up."
            }
            FollowUpKind::Why => {
                "Now, please briefly explain the culinary reasoning behind why \
                 your original recommendation works well. Do not include \
                 nutritional info in this follow-up."
            }
        }
    }

    /// User-visible label separating the follow-up from the text above it
    pub fn separator(&self) -> &'static str {
        match self {
            FollowUpKind::AnotherIdea => "\n\n—\n\n**Here's another idea:**\n",
            FollowUpKind::Why => "\n\n—\n\n**Here's why that works:**\n",
        }
    }
}

/// Compose the primary prompt from the plate contents and question
pub fn compose_primary(food_items: &[String], question: &str, vibe: Option<&str>) -> String {
    debug!(item_count = %food_items.len(), ?vibe, "compose_primary: called");
    let base = if food_items.is_empty() {
        format!(
            "The user has provided an image of their meal. Please identify the food and answer their question: \"{question}\""
        )
    } else {
        format!(
            "The user is having a meal with: {}. Their question is: \"{question}\"",
            food_items.join(", ")
        )
    };

    let mut prompt = base;
    if let Some(v) = vibe {
        prompt.push_str(&format!(" They are going for a \"{v}\" vibe for this meal."));
    }
    prompt.push_str(question_guidance(question));
    if let Some(v) = vibe {
        prompt.push_str(vibe_guidance(v));
    }
    prompt
}

/// Compose a follow-up prompt anchored to the prior recommendation
pub fn compose_follow_up(
    food_items: &[String],
    question: &str,
    prior_result: &str,
    vibe: Option<&str>,
    kind: FollowUpKind,
) -> String {
    debug!(?kind, "compose_follow_up: called");
    let context = compose_primary(food_items, question, vibe);
    format!(
        "Here was the original situation:\n{context}\n\nHere was your recommendation:\n\"{prior_result}\"\n\n{}",
        kind.instruction()
    )
}

/// Guidance keyed on what kind of question the user asked
fn question_guidance(question: &str) -> &'static str {
    let q = question.to_lowercase();
    if q.contains("how much") {
        " Focus on specific measurements and portions using relatable comparisons."
    } else if q.contains("ratio") {
        " Focus on the ideal proportions and balance between ingredients."
    } else if q.contains("taste better") || q.contains("make this taste") {
        " Focus on flavor enhancement techniques, seasoning tips, and preparation methods."
    } else if q.contains("goes well") || q.contains("what goes") {
        " Focus on complementary flavors, pairing suggestions, and additional ingredients that work well together."
    } else {
        ""
    }
}

/// Extra steering for the built-in vibes; custom vibes ride on the name alone
fn vibe_guidance(vibe: &str) -> &'static str {
    match vibe {
        "Classic Comfort" => {
            " Emphasize traditional, hearty, and satisfying approaches. Focus on generous portions, \
             rich flavors, and time-tested combinations that feel indulgent and comforting."
        }
        "Healthy & Light" => {
            " Prioritize lighter portions, fresh ingredients, and nutritious options. Suggest ways to \
             reduce calories while maintaining flavor, and recommend fresh herbs, citrus, and lighter \
             cooking methods."
        }
        "Quick & Easy" => {
            " Focus on simple, fast solutions that require minimal prep time. Suggest convenient \
             shortcuts, pre-made ingredients, and efficient techniques that save time without \
             sacrificing taste."
        }
        "Adventurous" => {
            " Encourage bold, creative, and unique flavor combinations. Suggest exotic ingredients, \
             fusion approaches, and experimental techniques that push culinary boundaries."
        }
        _ => "",
    }
}
