//! RFC 822 message decoding via `mail-parser`.

use mail_parser::{MessageParser, MimeHeaders, PartType};

use crate::error::{Result, ToolError};

/// Sender address and plain-text body of a fetched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEmail {
    pub sender: String,
    pub body: String,
}

/// Decode a raw message.
///
/// The sender is the bare address of the first `From` mailbox (empty when the
/// header is missing). For multipart messages the body is the first
/// `text/plain` part, or empty when there is none; otherwise it is the decoded
/// payload of the single part whatever its content type.
pub fn parse_email(raw: &[u8]) -> Result<ParsedEmail> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| ToolError::transport("message could not be parsed"))?;

    let sender = message
        .from()
        .and_then(|addr| addr.first())
        .and_then(|a| a.address())
        .unwrap_or_default()
        .to_string();

    let root = message
        .parts
        .first()
        .ok_or_else(|| ToolError::transport("message has no body part"))?;

    let body = if matches!(root.body, PartType::Multipart(_)) {
        message
            .parts
            .iter()
            .find(|part| {
                part.content_type().is_some_and(|ct| {
                    ct.ctype().eq_ignore_ascii_case("text")
                        && ct
                            .subtype()
                            .is_some_and(|sub| sub.eq_ignore_ascii_case("plain"))
                })
            })
            .map(part_text)
            .unwrap_or_default()
    } else {
        part_text(root)
    };

    Ok(ParsedEmail { sender, body })
}

fn part_text(part: &mail_parser::MessagePart<'_>) -> String {
    match part.text_contents() {
        Some(text) => text.to_string(),
        None => String::from_utf8_lossy(part.contents()).into_owned(),
    }
}
