//! Prompt builder for rendering the chat template.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptInput, PromptLimits, PromptTurn};
use compass_core::{AppError, AppResult};
use handlebars::Handlebars;

/// Separator placed between retrieved fragments.
const CONTEXT_SEPARATOR: &str = "\n\n";

/// Default chat template.
pub const DEFAULT_TEMPLATE: &str = r#"{{#if history}}Conversation so far:
{{#each history}}{{role}}: {{content}}
{{/each}}
{{/if}}User question: "{{question}}"
{{#if context}}
If relevant, use the following information to answer accurately:
-----------------------
{{context}}
-----------------------
{{/if}}"#;

/// Build a prompt with the default template.
///
/// # Example
/// ```
/// use compass_prompt::{build_prompt, PromptInput, PromptLimits};
///
/// let input = PromptInput {
///     question: "What is Rust?".to_string(),
///     ..Default::default()
/// };
/// let built = build_prompt(&input, PromptLimits::default()).unwrap();
/// assert!(built.text.contains("What is Rust?"));
/// ```
pub fn build_prompt(input: &PromptInput, limits: PromptLimits) -> AppResult<BuiltPrompt> {
    build_prompt_with_template(DEFAULT_TEMPLATE, input, limits)
}

/// Build a prompt from a custom Handlebars template.
///
/// The template sees `question`, `history` (list of `{role, content}`) and
/// `context` (the joined fragment block, empty when nothing was retrieved).
pub fn build_prompt_with_template(
    template: &str,
    input: &PromptInput,
    limits: PromptLimits,
) -> AppResult<BuiltPrompt> {
    let history = bound_history(&input.history, limits.max_history_messages);
    let (context, context_fragments, context_truncated) =
        bound_context(&input.context, limits.max_context_chars);

    let data = serde_json::json!({
        "question": input.question,
        "history": history,
        "context": context,
    });

    let text = render_template(template, &data)?;

    tracing::debug!(
        "Built prompt: {} history turns, {} context fragments (truncated: {})",
        history.len(),
        context_fragments,
        context_truncated
    );

    Ok(BuiltPrompt {
        text,
        metadata: BuiltPromptMetadata {
            history_messages: history.len(),
            context_fragments,
            context_truncated,
        },
    })
}

/// Keep only the most recent messages.
fn bound_history(history: &[PromptTurn], max_messages: usize) -> &[PromptTurn] {
    let start = history.len().saturating_sub(max_messages);
    &history[start..]
}

/// Join fragments in order until the character budget is spent.
///
/// Returns the joined block, how many fragments it holds, and whether any
/// were dropped or cut. A first fragment larger than the whole budget is cut
/// rather than dropped so a non-empty retrieval never yields an empty block.
fn bound_context(fragments: &[String], max_chars: usize) -> (String, usize, bool) {
    let mut block = String::new();
    let mut used = 0usize;
    let mut included = 0usize;

    for fragment in fragments {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }

        let separator = if included == 0 { 0 } else { CONTEXT_SEPARATOR.len() };
        let len = fragment.chars().count();

        if used + separator + len > max_chars {
            if included == 0 && max_chars > 0 {
                block.extend(fragment.chars().take(max_chars));
                return (block, 1, true);
            }
            return (block, included, true);
        }

        if included > 0 {
            block.push_str(CONTEXT_SEPARATOR);
        }
        block.push_str(fragment);
        used += separator + len;
        included += 1;
    }

    (block, included, false)
}

/// Render a Handlebars template with the prompt data.
fn render_template(template: &str, data: &serde_json::Value) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", data)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(history: Vec<PromptTurn>, context: Vec<&str>) -> PromptInput {
        PromptInput {
            question: "How do I reset my password?".to_string(),
            history,
            context: context.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn test_question_only() {
        let built = build_prompt(&input(vec![], vec![]), PromptLimits::default()).unwrap();

        assert!(built.text.contains("User question: \"How do I reset my password?\""));
        assert!(!built.text.contains("Conversation so far"));
        assert!(!built.text.contains("-----------------------"));
        assert_eq!(built.metadata, BuiltPromptMetadata::default());
    }

    #[test]
    fn test_history_is_bounded_to_recent_turns() {
        let history = (0..6)
            .map(|i| PromptTurn::new("user", format!("message {}", i)))
            .collect();
        let limits = PromptLimits {
            max_history_messages: 2,
            ..Default::default()
        };

        let built = build_prompt(&input(history, vec![]), limits).unwrap();

        assert_eq!(built.metadata.history_messages, 2);
        assert!(built.text.contains("user: message 4"));
        assert!(built.text.contains("user: message 5"));
        assert!(!built.text.contains("message 3"));
    }

    #[test]
    fn test_context_block_rendered_in_order() {
        let built = build_prompt(
            &input(vec![], vec!["first fragment", "second fragment"]),
            PromptLimits::default(),
        )
        .unwrap();

        let first = built.text.find("first fragment").unwrap();
        let second = built.text.find("second fragment").unwrap();
        assert!(first < second);
        assert_eq!(built.metadata.context_fragments, 2);
        assert!(!built.metadata.context_truncated);
    }

    #[test]
    fn test_context_budget_drops_trailing_fragments() {
        let (block, count, truncated) =
            bound_context(&["aaaa".to_string(), "bbbb".to_string()], 6);
        assert_eq!(block, "aaaa");
        assert_eq!(count, 1);
        assert!(truncated);
    }

    #[test]
    fn test_oversized_first_fragment_is_cut() {
        let (block, count, truncated) = bound_context(&["é".repeat(10)], 4);
        assert_eq!(block, "éééé");
        assert_eq!(count, 1);
        assert!(truncated);
    }

    #[test]
    fn test_custom_template() {
        let built = build_prompt_with_template(
            "Q={{question}}",
            &input(vec![], vec![]),
            PromptLimits::default(),
        )
        .unwrap();
        assert_eq!(built.text, "Q=How do I reset my password?");
    }

    #[test]
    fn test_invalid_template_is_prompt_error() {
        let result =
            build_prompt_with_template("{{#if}}", &input(vec![], vec![]), PromptLimits::default());
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }
}
