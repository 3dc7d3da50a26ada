//! Prompt templates for Podweave.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("Invalid regex"));

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub dialogue: DialoguePrompts,
    /// Position-specific instructions for long-form generation.
    pub parts: PartPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for dialogue generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialoguePrompts {
    pub system: String,
    pub user: String,
    /// Appended to the system prompt when generating in long-form mode.
    pub longform_instructions: String,
}

impl Default for DialoguePrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a world-class podcast producer tasked with transforming the provided input text into an engaging and informative podcast script for "{{podcast_name}} - {{podcast_tagline}}".

The podcast has exactly two hosts:
- <Person1> is the {{roles_person1}}.
- <Person2> is the {{roles_person2}}.

Guidelines:
1. Write the whole conversation in {{output_language}}.
2. Conversation style: {{conversation_style}}.
3. Dialogue structure: {{dialogue_structure}}.
4. Engagement techniques to use: {{engagement_techniques}}.
5. Wrap every turn in speaker tags, e.g. <Person1>text</Person1> followed by <Person2>text</Person2>. Never use any other speaker tag.
6. Write only what is spoken aloud. No stage directions, sound effects, bracketed notes, markdown or scratchpad reasoning.
7. Do not use placeholders such as [Host Name]; the hosts do not introduce themselves by name.
8. Stay factual to the input; do not invent statistics or quotes.

[[MAKE SURE TO FOLLOW THESE INSTRUCTIONS OVERRIDING THE PROMPT TEMPLATE IN CASE OF CONFLICT: {{user_instructions}}]]"#
                .to_string(),

            user: r#"{{instruction}}

CONTEXT (summary of the conversation so far):
{{context}}

INPUT:
{{input_text}}"#
                .to_string(),

            longform_instructions: r#"Additional Instructions:
1. Provide extensive examples and real-world applications
2. Include detailed analysis and multiple perspectives
3. Use the "yes, and" technique to build upon points
4. Incorporate relevant anecdotes and case studies
5. Balance detailed explanations with engaging dialogue
6. Maintain consistent voice throughout the extended discussion
7. Generate a long conversation, using the full output budget"#
                .to_string(),
        }
    }
}

/// Instructions for the introduction, interior and final parts of a long conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartPrompts {
    /// Used when the whole conversation is generated in one call.
    pub single: String,
    pub introduction: String,
    pub middle: String,
    pub final_part: String,
    /// Shared continuation rules for every part after the first.
    pub continuation: String,
}

impl Default for PartPrompts {
    fn default() -> Self {
        Self {
            single: r#"You are generating a complete podcast conversation.
ALWAYS START THE CONVERSATION GREETING THE AUDIENCE: Welcome to {{podcast_name}} - {{podcast_tagline}}.
Discuss the INPUT below and END THE CONVERSATION WITH BOTH HOSTS SAYING GOODBYE TO THE AUDIENCE."#
                .to_string(),

            introduction: r#"You are generating the introduction, part 1 of {{total_parts}} of a long podcast conversation.
ALWAYS START THE CONVERSATION GREETING THE AUDIENCE: Welcome to {{podcast_name}} - {{podcast_tagline}}.
Introduce the topic and discuss the INPUT below. Do NOT say goodbye or wrap up; the conversation continues in later parts."#
                .to_string(),

            middle: r#"You are generating part {{part_number}} of {{total_parts}} of a long podcast conversation.
{{continuation}}
Discuss the INPUT below. Do NOT greet the audience again and do NOT say goodbye; the conversation continues afterwards."#
                .to_string(),

            final_part: r#"You are generating the last part ({{part_number}} of {{total_parts}}) of a long podcast conversation.
{{continuation}}
Discuss the INPUT below, then make concluding remarks and END THE CONVERSATION WITH BOTH HOSTS SAYING GOODBYE TO THE AUDIENCE. Do NOT greet the audience again."#
                .to_string(),

            continuation: r#"The conversation so far is summarized in CONTEXT. Continue its natural flow and follow up on the last point without repeating topics already discussed.
The first speaker in this part must be {{next_speaker}}, because {{previous_speaker}} spoke last.
This is a live conversation without breaks: avoid phrases such as "welcome back", "after the break" or "picking up where we left off"."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let dialogue_path = custom_path.join("dialogue.toml");
            if dialogue_path.exists() {
                let content = std::fs::read_to_string(&dialogue_path)?;
                prompts.dialogue = toml::from_str(&content)?;
            }

            let parts_path = custom_path.join("parts.toml");
            if parts_path.exists() {
                let content = std::fs::read_to_string(&parts_path)?;
                prompts.parts = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are substituted in one pass over the template, so values
    /// are inserted verbatim even when they contain `{{...}}` themselves.
    /// Unknown placeholders are left as they are.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
