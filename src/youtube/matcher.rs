//! Classifies provider URLs and extracts them from annotated message text.
//!
//! Messages arrive with an ordered list of entity annotations over their
//! display text: plain URL spans (the substring itself is the link) and text
//! links (markdown-style, carrying an explicit target). This module decides
//! whether a string is a recognized provider URL and digs qualifying links
//! out of a message and its reply.

use std::sync::LazyLock;

use regex::Regex;

/// Regex matching the provider's known URL shapes: optional protocol,
/// optional `www.`/`m.`/`music.` subdomain, watch/shorts/playlist paths or
/// the short-link host, an 11-character video id or a `PL`-prefixed playlist
/// id, and an optional trailing query. Anchored at the start only.
static YOUTUBE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(https?://)?(www\.|m\.|music\.)?(youtube\.com/(watch\?v=|shorts/|playlist\?list=)|youtu\.be/)([A-Za-z0-9_-]{11}|PL[A-Za-z0-9_-]+)([&?][^\s]*)?",
    )
    .expect("youtube url regex must compile")
});

/// The kinds of annotation a message entity can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    /// A span of the display text that is itself a URL.
    Url,
    /// A text link whose target URL is carried by the annotation.
    TextLink(String),
}

/// One annotation over a message's display text.
///
/// `offset` and `length` are in characters of the display text.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEntity {
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
}

/// A message as the matcher sees it: display text plus its annotations.
#[derive(Debug, Clone, Default)]
pub struct ChatMessage {
    pub text: String,
    pub entities: Vec<MessageEntity>,
}

/// True iff `text` matches one of the provider's known URL shapes.
pub fn valid(text: &str) -> bool {
    YOUTUBE_REGEX.is_match(text)
}

/// Scans a message (then its reply) for a link annotation and returns the
/// canonical URL, or `None` if nothing qualifies.
///
/// Scan order per message: first `Url` span, then first `TextLink`. Each find
/// overwrites the previous one, so the last qualifying annotation across the
/// whole scan wins: a text link beats a URL span in the same message, and
/// the reply beats the primary message. Last-wins is a deliberate design
/// choice, not a first-match rule.
///
/// Whatever survives has its tracking suffix removed: everything from the
/// first `&si` or `?si` on is dropped.
pub fn extract(message: &ChatMessage, reply: Option<&ChatMessage>) -> Option<String> {
    let mut link: Option<String> = None;

    for message in std::iter::once(message).chain(reply) {
        if let Some(entity) = message
            .entities
            .iter()
            .find(|entity| entity.kind == EntityKind::Url)
        {
            link = Some(span_text(&message.text, entity.offset, entity.length));
        }

        if let Some(url) = message.entities.iter().find_map(|entity| match &entity.kind {
            EntityKind::TextLink(url) => Some(url),
            EntityKind::Url => None,
        }) {
            link = Some(url.clone());
        }
    }

    link.map(|link| strip_tracking(&link))
}

/// Extracts the annotated substring by character offset and length.
fn span_text(text: &str, offset: usize, length: usize) -> String {
    text.chars().skip(offset).take(length).collect()
}

/// Drops the `si` tracking parameter and anything after it.
fn strip_tracking(link: &str) -> String {
    let link = link.split("&si").next().unwrap_or(link);
    let link = link.split("?si").next().unwrap_or(link);
    link.to_string()
}
