//! Local news connector: polls a fixed list of RSS/Atom feeds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mwatch_core::{Project, RawMention};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::connector::{Connector, ConnectorCapabilities};
use crate::error::SourceError;
use crate::http::send_text;
use crate::types::NewsFeed;

pub const SOURCE: &str = "local_news";

pub struct LocalNewsConnector {
    client: reqwest::Client,
    feeds: Vec<NewsFeed>,
}

impl LocalNewsConnector {
    #[must_use]
    pub fn new(client: reqwest::Client, feeds: Vec<NewsFeed>) -> Self {
        Self { client, feeds }
    }
}

#[async_trait]
impl Connector for LocalNewsConnector {
    fn id(&self) -> &'static str {
        "localNews"
    }

    fn display_name(&self) -> &'static str {
        "Nepal Local News"
    }

    fn enabled_by_default(&self) -> bool {
        true
    }

    fn capabilities(&self) -> ConnectorCapabilities {
        ConnectorCapabilities {
            realtime: false,
            search: true,
            limits: "RSS feeds only; respects robots.txt; no full-site scraping.",
        }
    }

    /// Poll every feed. A feed that fails is skipped; the call fails only
    /// when nothing was collected and at least one feed failed.
    async fn fetch(
        &self,
        _project: &Project,
        _since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawMention>, SourceError> {
        let mut mentions = Vec::new();
        let mut errors: Vec<SourceError> = Vec::new();

        for feed in &self.feeds {
            let result = match send_text(self.client.get(&feed.url), SOURCE).await {
                Ok(body) => parse_feed(&body),
                Err(e) => Err(e),
            };
            match result {
                Ok(items) => {
                    tracing::debug!(feed = feed.name.as_str(), count = items.len(), "parsed feed");
                    mentions.extend(items);
                }
                Err(e) => {
                    tracing::warn!(feed = feed.name.as_str(), error = %e, "news feed failed");
                    errors.push(e);
                }
            }
        }

        if mentions.is_empty() {
            if let Some(first) = errors.first() {
                return Err(SourceError::AllFeedsFailed {
                    count: errors.len(),
                    first: first.to_string(),
                });
            }
        }
        Ok(mentions)
    }
}

#[derive(Default)]
struct Entry {
    title: String,
    link: String,
    description: String,
    /// Set once a body element closes with text; later body elements
    /// (`<content:encoded>` after `<description>`) are ignored.
    description_done: bool,
    published: String,
    author: String,
}

fn is_body_tag(tag: &str) -> bool {
    matches!(tag, "description" | "summary" | "content" | "encoded")
}

impl Entry {
    fn into_mention(self) -> Option<RawMention> {
        if self.title.is_empty() && self.link.is_empty() {
            return None;
        }
        Some(RawMention {
            source: SOURCE.to_string(),
            title: self.title,
            text: strip_html(&self.description),
            author: self.author,
            url: (!self.link.is_empty()).then_some(self.link),
            published_at: parse_feed_date(&self.published),
            ..RawMention::default()
        })
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn href(e: &BytesStart<'_>) -> Option<String> {
    e.try_get_attribute("href")
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parse an RSS 2.0 (`<item>`) or Atom (`<entry>`) document into raw
/// mentions. Entries without both a title and a link are dropped.
///
/// # Errors
///
/// Returns [`SourceError::Xml`] if the document is malformed.
pub fn parse_feed(xml: &str) -> Result<Vec<RawMention>, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut mentions = Vec::new();
    let mut entry: Option<Entry> = None;
    let mut in_author = false;
    let mut current_tag = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                match name.as_str() {
                    "item" | "entry" => entry = Some(Entry::default()),
                    "author" => in_author = true,
                    "link" => {
                        if let (Some(entry), Some(href)) = (entry.as_mut(), href(&e)) {
                            entry.link = href;
                        }
                    }
                    _ => {}
                }
                current_tag = name;
            }
            Ok(Event::Empty(e)) => {
                // Atom: <link href="..." rel="alternate"/>
                if local_name(&e) == "link" {
                    if let (Some(entry), Some(href)) = (entry.as_mut(), href(&e)) {
                        if entry.link.is_empty() {
                            entry.link = href;
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "item" | "entry" => {
                        if let Some(mention) = entry.take().and_then(Entry::into_mention) {
                            mentions.push(mention);
                        }
                    }
                    "author" => in_author = false,
                    tag if is_body_tag(tag) => {
                        if let Some(entry) = entry.as_mut() {
                            entry.description_done |= !entry.description.trim().is_empty();
                        }
                    }
                    _ => {}
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                if let Some(entry) = entry.as_mut() {
                    let text = e.unescape().unwrap_or_default().into_owned();
                    assign(entry, &current_tag, in_author, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(entry) = entry.as_mut() {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    assign(entry, &current_tag, in_author, &text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Xml(e)),
            _ => {}
        }
    }

    Ok(mentions)
}

fn assign(entry: &mut Entry, tag: &str, in_author: bool, text: &str) {
    let field = match tag {
        "title" => &mut entry.title,
        "link" => &mut entry.link,
        tag if is_body_tag(tag) => {
            if entry.description_done {
                return;
            }
            &mut entry.description
        }
        "pubDate" | "published" | "updated" | "date" => {
            if !entry.published.is_empty() {
                return;
            }
            &mut entry.published
        }
        "author" | "creator" => &mut entry.author,
        "name" if in_author => &mut entry.author,
        _ => return,
    };
    field.push_str(text);
}

/// Parse RFC 2822 (RSS) or RFC 3339 (Atom) timestamps.
fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Strip HTML tags from a string and normalize whitespace.
pub(crate) fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Local News</title>
    <item>
      <title>Budget session opens in Kathmandu</title>
      <link>https://example.com/budget</link>
      <description><![CDATA[<p>The <b>budget</b> was tabled today.</p>]]></description>
      <pubDate>Tue, 03 Mar 2026 10:15:00 +0545</pubDate>
      <dc:creator>Staff Reporter</dc:creator>
    </item>
    <item>
      <title>Weather update</title>
      <link>https://example.com/weather</link>
    </item>
  </channel>
</rss>"#;

    const SAMPLE_ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom News</title>
  <entry>
    <title>Election results announced</title>
    <link rel="alternate" href="https://example.com/election"/>
    <summary>Counting finished overnight.</summary>
    <published>2026-03-03T04:30:00Z</published>
    <author><name>Desk</name></author>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_items() {
        let mentions = parse_feed(SAMPLE_RSS).expect("valid RSS");
        assert_eq!(mentions.len(), 2);

        let first = &mentions[0];
        assert_eq!(first.source, SOURCE);
        assert_eq!(first.title, "Budget session opens in Kathmandu");
        assert_eq!(first.text, "The budget was tabled today.");
        assert_eq!(first.url.as_deref(), Some("https://example.com/budget"));
        assert_eq!(first.author, "Staff Reporter");
        assert_eq!(
            first.published_at,
            Some(Utc.with_ymd_and_hms(2026, 3, 3, 4, 30, 0).unwrap())
        );
        assert!(mentions[1].published_at.is_none());
    }

    #[test]
    fn parses_atom_entries() {
        let mentions = parse_feed(SAMPLE_ATOM).expect("valid Atom");
        assert_eq!(mentions.len(), 1);
        assert_eq!(
            mentions[0].url.as_deref(),
            Some("https://example.com/election")
        );
        assert_eq!(mentions[0].text, "Counting finished overnight.");
        assert_eq!(mentions[0].author, "Desk");
        assert!(mentions[0].published_at.is_some());
    }

    #[test]
    fn first_body_element_wins_over_full_content() {
        let xml = r#"<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <item>
      <title>Budget passed</title>
      <link>https://example.com/passed</link>
      <description>Short summary</description>
      <content:encoded><![CDATA[<p>Full body</p>]]></content:encoded>
    </item>
    <item>
      <title>Teaser only in content</title>
      <link>https://example.com/teaser</link>
      <description></description>
      <content:encoded>Body from content</content:encoded>
    </item>
  </channel>
</rss>"#;
        let mentions = parse_feed(xml).expect("valid RSS");
        assert_eq!(mentions[0].text, "Short summary");
        assert_eq!(mentions[1].text, "Body from content");
    }

    #[test]
    fn empty_channel_returns_empty_vec() {
        let xml = r#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#;
        assert!(parse_feed(xml).expect("valid RSS").is_empty());
    }

    #[test]
    fn mismatched_tags_are_an_error() {
        let xml = "<rss><channel><item><title>x</link></item></channel></rss>";
        assert!(matches!(parse_feed(xml), Err(SourceError::Xml(_))));
    }

    #[test]
    fn strip_html_collapses_whitespace() {
        assert_eq!(strip_html("<p>Hello<br/>world</p>  "), "Hello world");
    }
}
