//! Prompt composition for dialogue generation.

use super::GenerationContext;
use crate::config::{ConversationSettings, Prompts};
use std::collections::HashMap;

/// A rendered system/user prompt pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DialoguePrompt {
    pub system: String,
    pub user: String,
}

/// Builds generation prompts from templates and the conversation settings.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    prompts: Prompts,
}

impl PromptBuilder {
    pub fn new(prompts: Prompts) -> Self {
        Self { prompts }
    }

    /// Render the prompt for one chunk.
    pub fn build(&self, chunk_text: &str, context: &GenerationContext) -> DialoguePrompt {
        let mut vars = conversation_vars(&context.conversation);
        vars.insert("total_parts".to_string(), context.total_chunks.to_string());
        vars.insert("part_number".to_string(), (context.chunk_index + 1).to_string());
        vars.insert("next_speaker".to_string(), context.next_speaker().tag().to_string());
        vars.insert(
            "previous_speaker".to_string(),
            context
                .last_speaker
                .map(|s| s.tag().to_string())
                .unwrap_or_else(|| "nobody".to_string()),
        );

        let continuation = self
            .prompts
            .render_with_custom(&self.prompts.parts.continuation, &vars);
        vars.insert("continuation".to_string(), continuation);

        let instruction = self.prompts.render_with_custom(self.part_template(context), &vars);
        vars.insert("instruction".to_string(), instruction);

        let context_text = if context.running_summary.trim().is_empty() {
            "(This is the start of the conversation.)".to_string()
        } else {
            context.running_summary.clone()
        };
        vars.insert("context".to_string(), context_text);
        vars.insert("input_text".to_string(), chunk_text.to_string());

        let mut system = self
            .prompts
            .render_with_custom(&self.prompts.dialogue.system, &vars);
        if context.longform {
            system.push_str("\n\n");
            system.push_str(
                &self
                    .prompts
                    .render_with_custom(&self.prompts.dialogue.longform_instructions, &vars),
            );
        }

        DialoguePrompt {
            system,
            user: self.prompts.render_with_custom(&self.prompts.dialogue.user, &vars),
        }
    }

    fn part_template(&self, context: &GenerationContext) -> &str {
        let parts = &self.prompts.parts;
        match (context.is_first_chunk(), context.is_last_chunk()) {
            (true, true) => &parts.single,
            (true, false) => &parts.introduction,
            (false, true) => &parts.final_part,
            (false, false) => &parts.middle,
        }
    }
}

fn conversation_vars(conversation: &ConversationSettings) -> HashMap<String, String> {
    let user_instructions = if conversation.user_instructions.trim().is_empty() {
        "None".to_string()
    } else {
        conversation.user_instructions.clone()
    };

    HashMap::from([
        ("podcast_name".to_string(), conversation.podcast_name.clone()),
        ("podcast_tagline".to_string(), conversation.podcast_tagline.clone()),
        ("roles_person1".to_string(), conversation.roles_person1.clone()),
        ("roles_person2".to_string(), conversation.roles_person2.clone()),
        ("output_language".to_string(), conversation.output_language.clone()),
        ("conversation_style".to_string(), conversation.conversation_style.join(", ")),
        ("dialogue_structure".to_string(), conversation.dialogue_structure.join(", ")),
        (
            "engagement_techniques".to_string(),
            conversation.engagement_techniques.join(", "),
        ),
        ("user_instructions".to_string(), user_instructions),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Speaker;
    use std::sync::Arc;

    fn context(chunk_index: usize, total_chunks: usize) -> GenerationContext {
        GenerationContext {
            running_summary: String::new(),
            chunk_index,
            total_chunks,
            last_speaker: None,
            longform: true,
            conversation: Arc::new(ConversationSettings::default()),
        }
    }

    #[test]
    fn test_first_part_greets() {
        let prompt = PromptBuilder::default().build("Rust is fast.", &context(0, 3));
        assert!(prompt.user.contains("part 1 of 3"));
        assert!(prompt.user.contains("Welcome to PODWEAVE"));
        assert!(prompt.user.contains("Do NOT say goodbye"));
        assert!(prompt.user.contains("Rust is fast."));
        assert!(prompt.user.contains("start of the conversation"));
    }

    #[test]
    fn test_middle_part_continues_from_summary() {
        let mut ctx = context(1, 3);
        ctx.running_summary = "Part 1: ownership basics".to_string();
        ctx.last_speaker = Some(Speaker::Person2);

        let prompt = PromptBuilder::default().build("Borrowing.", &ctx);
        assert!(prompt.user.contains("part 2 of 3"));
        assert!(prompt.user.contains("must be Person1, because Person2 spoke last"));
        assert!(prompt.user.contains("Part 1: ownership basics"));
        assert!(!prompt.user.contains("Welcome to"));
    }

    #[test]
    fn test_last_part_says_goodbye() {
        let prompt = PromptBuilder::default().build("Lifetimes.", &context(2, 3));
        assert!(prompt.user.contains("last part (3 of 3)"));
        assert!(prompt.user.contains("GOODBYE"));
        assert!(!prompt.user.contains("Welcome to"));
    }

    #[test]
    fn test_single_part_greets_and_closes() {
        let mut ctx = context(0, 1);
        ctx.longform = false;
        let prompt = PromptBuilder::default().build("Short text.", &ctx);
        assert!(prompt.user.contains("Welcome to PODWEAVE"));
        assert!(prompt.user.contains("GOODBYE"));
        assert!(!prompt.system.contains("Additional Instructions"));
    }

    #[test]
    fn test_source_text_with_placeholders_is_kept_verbatim() {
        let chunk = "Handlebars example: {{context}} and {{podcast_name}}";
        let mut ctx = context(1, 3);
        ctx.running_summary = "SUMMARY".to_string();

        let builder = PromptBuilder::default();
        let first = builder.build(chunk, &ctx);
        assert!(first.user.ends_with(chunk), "user prompt: {}", first.user);
        assert!(first.user.contains("SUMMARY"));
        for _ in 0..20 {
            assert_eq!(builder.build(chunk, &ctx), first);
        }
    }

    #[test]
    fn test_system_prompt_carries_roles_and_longform() {
        let prompt = PromptBuilder::default().build("x", &context(0, 2));
        assert!(prompt.system.contains("<Person1> is the main summarizer"));
        assert!(prompt.system.contains("<Person2> is the questioner/clarifier"));
        assert!(prompt.system.contains("English"));
        assert!(prompt.system.contains("Additional Instructions"));
    }
}
