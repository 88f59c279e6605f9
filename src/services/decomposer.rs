use async_trait::async_trait;

use crate::foundation::core::ServiceKind;
use crate::foundation::error::{ThumbError, ThumbResult};
use crate::services::gateway::GatewayClient;
use crate::services::{Decomposer, Decomposition};

const MAX_TITLE_WORDS: usize = 5;
const TITLE_FALLBACK_CHARS: usize = 40;
const MIN_METAPHOR_CHARS: usize = 15;

const SYSTEM_PROMPT: &str = "You are a thumbnail art director. Decompose a video topic into a punchy title \
and a symbolic, cinematic background description.\n\
Background rules: zero text, letters, numbers or words; zero humans, faces, hands, characters or \
silhouettes; no objects that inherently carry text or faces (bank notes, newspapers, screens with code, ID cards). \
Prefer grounded visual metaphors (physical objects, environments, lighting) over abstract shapes.\n\
Reply with exactly 2 lines.\n\
Line 1: title, catchy, at most 5 words.\n\
Line 2: background description, detailed and metaphorical, no humans, no text.";

#[derive(serde::Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: serde_json::Value,
}

#[derive(serde::Serialize)]
pub(crate) struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

impl<'a> ChatRequest<'a> {
    pub(crate) fn new(model: &'a str, temperature: f32) -> Self {
        Self {
            model,
            messages: Vec::new(),
            temperature,
        }
    }

    pub(crate) fn message(mut self, role: &'a str, content: serde_json::Value) -> Self {
        self.messages.push(ChatMessage { role, content });
        self
    }
}

#[derive(serde::Deserialize)]
pub(crate) struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(serde::Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice, if any.
    pub(crate) fn into_text(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.message.content)
    }
}

/// Chat-completions backed decomposer.
#[derive(Clone, Debug)]
pub struct HttpDecomposer {
    client: GatewayClient,
}

impl HttpDecomposer {
    pub fn new(client: GatewayClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Decomposer for HttpDecomposer {
    async fn decompose(&self, topic: &str, restriction: &str) -> ThumbResult<Decomposition> {
        let cfg = self.client.config();
        let mut system = SYSTEM_PROMPT.to_string();
        if !restriction.is_empty() {
            system.push_str("\nAdditional background restrictions: ");
            system.push_str(restriction);
        }
        let request = ChatRequest::new(&cfg.chat_model, 0.7)
            .message("system", serde_json::Value::String(system))
            .message("user", serde_json::Value::String(topic.to_string()));

        let response: ChatResponse = self
            .client
            .post_json(
                ServiceKind::Decomposition,
                &cfg.endpoint("chat/completions"),
                &request,
            )
            .await?;
        let raw = response
            .into_text()
            .ok_or_else(|| ThumbError::decomposition("no completion choices returned"))?;
        parse_decomposition(&raw, topic)
    }
}

/// Parse the two-line `title / metaphor` reply.
///
/// The title loses any `Title:` prefix and is cut to five words, falling back
/// to the start of the topic. A metaphor that is too short or a bare tone word
/// falls back to the topic itself. A blank reply is an error.
pub fn parse_decomposition(raw: &str, topic: &str) -> ThumbResult<Decomposition> {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let Some(first) = lines.first() else {
        return Err(ThumbError::decomposition("text model returned an empty reply"));
    };

    let title_line = strip_label(first, "title");
    let words: Vec<&str> = title_line.split_whitespace().take(MAX_TITLE_WORDS).collect();
    let title = if words.is_empty() {
        topic.chars().take(TITLE_FALLBACK_CHARS).collect::<String>().trim().to_string()
    } else {
        words.join(" ")
    };

    let metaphor = lines
        .get(1)
        .map(|l| strip_label(l, "background").to_string())
        .filter(|m| {
            let bare = m.trim_end_matches('.').to_lowercase();
            m.chars().count() >= MIN_METAPHOR_CHARS && bare != "dark" && bare != "light"
        })
        .unwrap_or_else(|| topic.to_string());

    if title.is_empty() {
        return Err(ThumbError::decomposition("no usable title in reply or topic"));
    }
    Ok(Decomposition { metaphor, title })
}

/// Drop a leading `Label:` (case-insensitive) and surrounding quotes.
fn strip_label<'a>(line: &'a str, label: &str) -> &'a str {
    let rest = match line.split_once(':') {
        Some((head, tail)) if head.trim().eq_ignore_ascii_case(label) => tail,
        _ => line,
    };
    rest.trim().trim_matches(|c| c == '"' || c == '\'').trim()
}

#[cfg(test)]
#[path = "../../tests/unit/services/decomposer.rs"]
mod tests;
