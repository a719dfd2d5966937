use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};
use crate::types::{Message, Tool, ToolChoice};

/// Messages sent to a chat model in one call, plus per-call options
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub messages: Vec<Message>,
    pub options: Option<ChatOptions>,
}

impl Prompt {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            options: None,
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Text of every message, concatenated in order
    pub fn contents(&self) -> String {
        self.messages.iter().map(Message::text).collect()
    }

    /// First system message, if any
    pub fn system_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .find(|m| matches!(m, Message::System { .. }))
    }

    /// Most recent user message, if any
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| matches!(m, Message::User { .. }))
    }

    /// Append messages, keeping the per-call options.
    pub fn augment(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }
}

impl From<&str> for Prompt {
    fn from(text: &str) -> Self {
        Self::new(vec![Message::user(text)])
    }
}

impl From<String> for Prompt {
    fn from(text: String) -> Self {
        Self::new(vec![Message::user(text)])
    }
}

impl From<Vec<Message>> for Prompt {
    fn from(messages: Vec<Message>) -> Self {
        Self::new(messages)
    }
}

impl From<Message> for Prompt {
    fn from(message: Message) -> Self {
        Self::new(vec![message])
    }
}

/// Text with `{name}` placeholders, rendered into a user message or prompt.
///
/// Placeholder names are letters, digits and `_`. Any other brace text, such
/// as inline JSON, is copied as is. Rendering fails if a placeholder has no
/// value.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    template: String,
    variables: HashMap<String, String>,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(LlmError::InvalidRequest(
                "template must not be empty".to_string(),
            ));
        }
        Ok(Self {
            template,
            variables: HashMap::new(),
        })
    }

    pub fn with_variables(mut self, variables: HashMap<String, String>) -> Self {
        self.variables.extend(variables);
        self
    }

    /// Set a variable, replacing any earlier value of the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl ToString) {
        self.variables.insert(name.into(), value.to_string());
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    /// Render with the stored variables; `additional` wins on name clashes.
    pub fn render(&self, additional: &HashMap<String, String>) -> Result<String> {
        let lookup = |name: &str| additional.get(name).or_else(|| self.variables.get(name));

        let mut rendered = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('}').map(|end| &after[..end]) {
                Some(name) if is_placeholder(name) => {
                    let value = lookup(name).ok_or_else(|| {
                        LlmError::InvalidRequest(format!("no value for template variable `{name}`"))
                    })?;
                    rendered.push_str(value);
                    rest = &after[name.len() + 1..];
                }
                _ => {
                    rendered.push('{');
                    rest = after;
                }
            }
        }
        rendered.push_str(rest);
        Ok(rendered)
    }

    /// Single user message prompt from the stored variables.
    pub fn create(&self, options: Option<ChatOptions>) -> Result<Prompt> {
        let prompt = Prompt::from(self.render(&HashMap::new())?);
        Ok(match options {
            Some(options) => prompt.with_options(options),
            None => prompt,
        })
    }

    pub fn create_message(&self) -> Result<Message> {
        Ok(Message::user(self.render(&HashMap::new())?))
    }
}

fn is_placeholder(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Portable chat options. Unset fields fall back to the model defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn n(mut self, n: u32) -> Self {
        self.n = Some(n);
        self
    }

    pub fn frequency_penalty(mut self, penalty: f32) -> Self {
        self.frequency_penalty = Some(penalty);
        self
    }

    pub fn presence_penalty(mut self, penalty: f32) -> Self {
        self.presence_penalty = Some(penalty);
        self
    }

    pub fn stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Layer `overrides` on top of `self`: every field set in `overrides`
    /// wins, everything else keeps its current value.
    pub fn merge(&self, overrides: &ChatOptions) -> ChatOptions {
        let overrides = overrides.clone();
        let base = self.clone();
        ChatOptions {
            model: overrides.model.or(base.model),
            max_tokens: overrides.max_tokens.or(base.max_tokens),
            temperature: overrides.temperature.or(base.temperature),
            top_p: overrides.top_p.or(base.top_p),
            n: overrides.n.or(base.n),
            frequency_penalty: overrides.frequency_penalty.or(base.frequency_penalty),
            presence_penalty: overrides.presence_penalty.or(base.presence_penalty),
            stop: overrides.stop.or(base.stop),
            tools: overrides.tools.or(base.tools),
            tool_choice: overrides.tool_choice.or(base.tool_choice),
            user: overrides.user.or(base.user),
        }
    }
}
