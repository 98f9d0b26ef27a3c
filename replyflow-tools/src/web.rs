use std::time::Duration;

use async_trait::async_trait;
use replyflow_core::SharedState;
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    core::{Tool, ToolCategory, ToolParameters},
    error::{Result, ToolError},
};

/// Browser-like user agent; some sites refuse requests without one.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Fetches a web page and returns its visible text.
///
/// Parameters:
/// - url (string, required): page to fetch.
///
/// Non-2xx responses are errors. Markup is stripped, whitespace collapsed and
/// the text cut to `max_chars` characters (4000 by default).
pub struct ScrapeWebPageTool {
    client: reqwest::Client,
    max_chars: usize,
}

impl ScrapeWebPageTool {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_MAX_CHARS: usize = 4000;

    pub fn new() -> Result<Self> {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ToolError::internal(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            client,
            max_chars: Self::DEFAULT_MAX_CHARS,
        })
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

#[async_trait]
impl Tool for ScrapeWebPageTool {
    fn name(&self) -> &str {
        "scrape_web_page"
    }

    fn description(&self) -> &str {
        "Fetch a web page and return its text content"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Web
    }

    fn parameter_schema(&self) -> Value {
        ToolParameters::new_schema()
            .add_required("url", "string", "URL of the page to scrape")
            .into()
    }

    async fn invoke(&self, params: ToolParameters, _state: &SharedState) -> Result<Value> {
        let url: String = params.get("url")?;
        debug!(url = %url, "scraping page");

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let html = response.text().await?;
        let content: String = strip_html(&html).chars().take(self.max_chars).collect();

        Ok(json!({"status": "success", "content": content}))
    }
}

/// Entities decoded after markup is dropped. `&amp;` goes last so that an
/// escaped entity such as `&amp;lt;` stays literal text.
const ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&amp;", "&"),
];

/// Drop markup, decode common entities and collapse whitespace runs to
/// single spaces.
///
/// A `<` opens a tag only when a letter, `/` or `!` follows it; anything else
/// is kept as text.
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut chars = html.chars().peekable();
    let mut in_tag = false;
    while let Some(ch) = chars.next() {
        if in_tag {
            in_tag = ch != '>';
            continue;
        }
        let opens_tag = ch == '<'
            && chars
                .peek()
                .is_some_and(|next| next.is_ascii_alphabetic() || matches!(next, '/' | '!'));
        if opens_tag {
            in_tag = true;
            text.push(' ');
        } else {
            text.push(ch);
        }
    }

    let text = ENTITIES
        .iter()
        .fold(text, |text, (entity, decoded)| text.replace(entity, decoded));
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
