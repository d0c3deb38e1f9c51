// src/pipeline/feeds.rs

//! RSS 2.0, Atom 1.0 and JSON Feed 1.1 rendering.
//!
//! Rendering is a pure function of the records, the channel metadata and
//! the render time. Items are ordered by announcement date, newest first;
//! the stored order is left alone.

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{Config, OutputRecord};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const JSON_FEED_VERSION: &str = "https://jsonfeed.org/version/1.1";

/// Channel-level metadata shared by all three formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub title: String,
    pub description: String,
    pub generator: String,
    pub home_url: String,
}

impl Channel {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            title: config.feed.title.clone(),
            description: config.feed.description.clone(),
            generator: config.feed.generator.clone(),
            home_url: config.portal.index_url()?.to_string(),
        })
    }
}

/// The three rendered documents.
#[derive(Debug, Clone)]
pub struct Feeds {
    pub rss: String,
    pub atom: String,
    pub json: String,
}

/// Render every format for the same records and render time.
pub fn render_all(
    records: &[OutputRecord],
    channel: &Channel,
    now: DateTime<Utc>,
) -> Result<Feeds> {
    Ok(Feeds {
        rss: render_rss(records, channel, now)?,
        atom: render_atom(records, channel, now)?,
        json: render_json_feed(records, channel)?,
    })
}

/// Records by `page.date`, newest first; equal dates keep stored order.
fn newest_first(records: &[OutputRecord]) -> Vec<&OutputRecord> {
    let mut sorted: Vec<&OutputRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.page.date.cmp(&a.page.date));
    sorted
}

/// Item text: body, attachment summary, then the posting unit.
pub fn build_content(record: &OutputRecord) -> String {
    let detail = &record.detail;
    let mut content = detail.body.clone();

    let files: Vec<&str> = detail.file_items().map(|i| i.title.as_str()).collect();
    if files.is_empty() {
        content.push_str("\n【添付ファイル】無し");
    } else {
        content.push_str("\n【添付ファイル】\n");
        content.push_str(&numbered(&files));
    }

    let urls: Vec<&str> = detail.url_items().map(|i| i.location.as_str()).collect();
    if !urls.is_empty() {
        content.push_str("\n【添付URL】\n");
        content.push_str(&numbered(&urls));
    }

    content.push_str("\n\n【所属】");
    content.push_str(&detail.footer.display_affiliation());
    content
}

fn numbered(lines: &[&str]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("  {}. {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

fn rfc3339(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ============================================================================
// XML helpers
// ============================================================================

type XmlWriter = Writer<Vec<u8>>;

fn xml_writer() -> Result<XmlWriter> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(AppError::feed)?;
    Ok(writer)
}

fn start(writer: &mut XmlWriter, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut element = BytesStart::new(tag);
    for attr in attrs {
        element.push_attribute(*attr);
    }
    writer
        .write_event(Event::Start(element))
        .map_err(AppError::feed)
}

fn end(writer: &mut XmlWriter, tag: &str) -> Result<()> {
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(AppError::feed)
}

fn empty(writer: &mut XmlWriter, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut element = BytesStart::new(tag);
    for attr in attrs {
        element.push_attribute(*attr);
    }
    writer
        .write_event(Event::Empty(element))
        .map_err(AppError::feed)
}

fn text_element(
    writer: &mut XmlWriter,
    tag: &str,
    attrs: &[(&str, &str)],
    text: &str,
) -> Result<()> {
    start(writer, tag, attrs)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(AppError::feed)?;
    end(writer, tag)
}

fn finish(writer: XmlWriter) -> Result<String> {
    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(AppError::feed)
}

// ============================================================================
// Formats
// ============================================================================

/// RSS 2.0 document.
pub fn render_rss(
    records: &[OutputRecord],
    channel: &Channel,
    now: DateTime<Utc>,
) -> Result<String> {
    let mut w = xml_writer()?;
    start(&mut w, "rss", &[("version", "2.0")])?;
    start(&mut w, "channel", &[])?;
    text_element(&mut w, "title", &[], &channel.title)?;
    text_element(&mut w, "link", &[], &channel.home_url)?;
    text_element(&mut w, "description", &[], &channel.description)?;
    text_element(&mut w, "lastBuildDate", &[], &now.to_rfc2822())?;
    text_element(&mut w, "generator", &[], &channel.generator)?;

    for record in newest_first(records) {
        start(&mut w, "item", &[])?;
        text_element(&mut w, "title", &[], &record.page.title)?;
        text_element(&mut w, "link", &[], &record.url)?;
        text_element(&mut w, "description", &[], &build_content(record))?;
        text_element(
            &mut w,
            "guid",
            &[("isPermaLink", "false")],
            &record.feed_id(),
        )?;
        text_element(&mut w, "pubDate", &[], &record.updated_at.to_rfc2822())?;
        end(&mut w, "item")?;
    }

    end(&mut w, "channel")?;
    end(&mut w, "rss")?;
    finish(w)
}

/// Atom 1.0 document.
pub fn render_atom(
    records: &[OutputRecord],
    channel: &Channel,
    now: DateTime<Utc>,
) -> Result<String> {
    let mut w = xml_writer()?;
    start(&mut w, "feed", &[("xmlns", ATOM_NS)])?;
    text_element(&mut w, "title", &[], &channel.title)?;
    text_element(&mut w, "id", &[], &channel.home_url)?;
    empty(&mut w, "link", &[("href", channel.home_url.as_str())])?;
    text_element(&mut w, "updated", &[], &rfc3339(&now))?;
    text_element(&mut w, "subtitle", &[], &channel.description)?;
    text_element(&mut w, "generator", &[], &channel.generator)?;

    for record in newest_first(records) {
        start(&mut w, "entry", &[])?;
        text_element(&mut w, "title", &[], &record.page.title)?;
        empty(&mut w, "link", &[("href", record.url.as_str())])?;
        text_element(&mut w, "id", &[], &record.feed_id())?;
        let published = format!("{}T00:00:00Z", record.page.date);
        text_element(&mut w, "published", &[], &published)?;
        text_element(&mut w, "updated", &[], record.updated_text())?;
        let content = build_content(record);
        text_element(&mut w, "content", &[("type", "text")], &content)?;
        end(&mut w, "entry")?;
    }

    end(&mut w, "feed")?;
    finish(w)
}

#[derive(Serialize)]
struct JsonFeed<'a> {
    version: &'static str,
    title: &'a str,
    home_page_url: &'a str,
    description: &'a str,
    items: Vec<JsonFeedItem<'a>>,
}

#[derive(Serialize)]
struct JsonFeedItem<'a> {
    id: String,
    url: &'a str,
    title: &'a str,
    content_text: String,
    date_published: &'a str,
}

/// JSON Feed 1.1 document. Has no build time, so it does not take one.
pub fn render_json_feed(records: &[OutputRecord], channel: &Channel) -> Result<String> {
    let feed = JsonFeed {
        version: JSON_FEED_VERSION,
        title: &channel.title,
        home_page_url: &channel.home_url,
        description: &channel.description,
        items: newest_first(records)
            .into_iter()
            .map(|record| JsonFeedItem {
                id: record.feed_id(),
                url: &record.url,
                title: &record.page.title,
                content_text: build_content(record),
                date_published: record.updated_text(),
            })
            .collect(),
    };

    let mut json = serde_json::to_string_pretty(&feed)?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AnnouncementId, Attachment, AttachmentItem, CanonicalDate, DetailRecord, DetailTitle,
        Footer, IndexRecord, Period,
    };
    use chrono::TimeZone;
    use url::Url;

    fn channel() -> Channel {
        Channel::from_config(&Config::default()).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 12, 30, 0).unwrap()
    }

    fn item(title: &str, location: &str) -> AttachmentItem {
        AttachmentItem {
            title: title.into(),
            location: location.into(),
        }
    }

    fn record(
        seq_no: u64,
        title: &str,
        date: (u32, u32, u32),
        attachments: Vec<Attachment>,
    ) -> OutputRecord {
        let date = CanonicalDate::from_parts(date.0, date.1, date.2);
        let page = IndexRecord {
            title: title.into(),
            id: AnnouncementId::new(1, 2, seq_no),
            date: date.clone(),
        };
        let detail = DetailRecord {
            title: DetailTitle {
                text: title.into(),
                date: date.clone(),
            },
            body: "本文1行目\n本文2行目".into(),
            attachments,
            footer: Footer {
                affiliation: "教育推進部".into(),
                sub_affiliation: "教育推進課".into(),
                period: Period {
                    start: date.clone(),
                    end: date,
                },
            },
        };
        let base = Url::parse("https://twins.tsukuba.ac.jp").unwrap();
        OutputRecord::new(page, detail, &base).unwrap()
    }

    #[test]
    fn test_channel_defaults() {
        let channel = channel();
        assert_eq!(channel.home_url, "https://twins.tsukuba.ac.jp/campusweb/");
        assert_eq!(channel.title, "筑波大学TWINS 在学生へのお知らせ");
    }

    #[test]
    fn test_content_without_attachments() {
        let content = build_content(&record(1, "a", (2025, 12, 4), Vec::new()));
        assert_eq!(
            content,
            "本文1行目\n本文2行目\n【添付ファイル】無し\n\n【所属】教育推進部 / 教育推進課"
        );
    }

    #[test]
    fn test_content_lists_files_and_urls() {
        let record = record(
            1,
            "a",
            (2025, 12, 4),
            vec![
                Attachment::File {
                    items: vec![item("案内.pdf", "attachments/1-2-1/x_案内.pdf")],
                },
                Attachment::Url {
                    items: vec![item("https://example.jp/", "https://example.jp/")],
                },
                Attachment::File {
                    items: vec![item("様式.docx", "attachments/1-2-1/y_様式.docx")],
                },
            ],
        );
        let content = build_content(&record);
        assert!(content.contains("\n【添付ファイル】\n  1. 案内.pdf\n  2. 様式.docx"));
        assert!(content.contains("\n【添付URL】\n  1. https://example.jp/"));
        assert!(content.ends_with("\n\n【所属】教育推進部 / 教育推進課"));
    }

    #[test]
    fn test_content_without_sub_affiliation() {
        let mut record = record(1, "a", (2025, 12, 4), Vec::new());
        record.detail.footer.sub_affiliation.clear();
        assert!(build_content(&record).ends_with("【所属】教育推進部"));
    }

    #[test]
    fn test_items_sorted_newest_first_without_touching_input() {
        let records = vec![
            record(1, "old", (2025, 4, 1), Vec::new()),
            record(2, "new", (2025, 12, 4), Vec::new()),
            record(3, "mid", (2025, 9, 30), Vec::new()),
        ];
        let order: Vec<u64> = newest_first(&records)
            .iter()
            .map(|r| r.page.id.seq_no)
            .collect();
        assert_eq!(order, vec![2, 3, 1]);
        assert_eq!(records[0].page.id.seq_no, 1);
    }

    #[test]
    fn test_equal_dates_keep_stored_order() {
        let records = vec![
            record(5, "first", (2025, 12, 4), Vec::new()),
            record(4, "second", (2025, 12, 4), Vec::new()),
        ];
        let order: Vec<u64> = newest_first(&records)
            .iter()
            .map(|r| r.page.id.seq_no)
            .collect();
        assert_eq!(order, vec![5, 4]);
    }

    #[test]
    fn test_rss_document() {
        let records = vec![record(3, "履修 & 登録 <重要>", (2025, 12, 4), Vec::new())];
        let rss = render_rss(&records, &channel(), now()).unwrap();

        assert!(rss.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(rss.contains("<rss version=\"2.0\">"));
        assert!(rss.contains("<title>履修 &amp; 登録 &lt;重要&gt;</title>"));
        assert!(rss.contains("<guid isPermaLink=\"false\">twins-1-2-3</guid>"));
        assert!(rss.contains("Dec 2025 15:00:00 +0000</pubDate>"));
        assert!(rss.contains("Jan 2026 12:30:00 +0000</lastBuildDate>"));
        assert!(rss.contains("&amp;genrecd=2&amp;seqNo=3</link>"));
        assert!(!rss.contains("<重要>"));
    }

    #[test]
    fn test_atom_document() {
        let records = vec![record(3, "a", (2025, 12, 4), Vec::new())];
        let atom = render_atom(&records, &channel(), now()).unwrap();

        assert!(atom.contains("<feed xmlns=\"http://www.w3.org/2005/Atom\">"));
        assert!(atom.contains("<updated>2026-01-05T12:30:00Z</updated>"));
        assert!(atom.contains("<id>twins-1-2-3</id>"));
        assert!(atom.contains("<published>2025-12-04T00:00:00Z</published>"));
        assert!(atom.contains("<updated>2025-12-03T15:00:00Z</updated>"));
        assert!(atom.contains("<content type=\"text\">本文1行目\n本文2行目"));
    }

    #[test]
    fn test_json_feed_document() {
        let records = vec![
            record(1, "old", (2025, 4, 1), Vec::new()),
            record(2, "new \"quoted\"", (2025, 12, 4), Vec::new()),
        ];
        let json = render_json_feed(&records, &channel()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], JSON_FEED_VERSION);
        assert_eq!(value["home_page_url"], "https://twins.tsukuba.ac.jp/campusweb/");
        assert_eq!(value["items"][0]["id"], "twins-1-2-2");
        assert_eq!(value["items"][0]["title"], "new \"quoted\"");
        assert_eq!(value["items"][0]["date_published"], "2025-12-03T15:00:00Z");
        assert_eq!(value["items"][1]["id"], "twins-1-2-1");
    }

    #[test]
    fn test_stored_updated_text_is_emitted_as_is() {
        let fresh = record(3, "a", (2025, 12, 4), Vec::new());
        let mut stored = serde_json::to_value(&fresh).unwrap();
        stored["updated"] = "2025-12-03T15:00:00.000Z".into();
        let raw = serde_json::to_vec(&vec![stored]).unwrap();
        let base = Url::parse("https://twins.tsukuba.ac.jp").unwrap();
        let records = crate::pipeline::diff::decode_snapshot(Some(&raw), &base).unwrap();

        let atom = render_atom(&records, &channel(), now()).unwrap();
        assert!(atom.contains("<updated>2025-12-03T15:00:00.000Z</updated>"));

        let json = render_json_feed(&records, &channel()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["items"][0]["date_published"], "2025-12-03T15:00:00.000Z");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let records = vec![
            record(1, "a", (2025, 4, 1), Vec::new()),
            record(2, "b", (2025, 12, 4), Vec::new()),
        ];
        let first = render_all(&records, &channel(), now()).unwrap();
        let second = render_all(&records, &channel(), now()).unwrap();
        assert_eq!(first.rss, second.rss);
        assert_eq!(first.atom, second.atom);
        assert_eq!(first.json, second.json);
    }

    #[test]
    fn test_empty_feeds_render() {
        let feeds = render_all(&[], &channel(), now()).unwrap();
        assert!(!feeds.rss.contains("<item>"));
        assert!(!feeds.atom.contains("<entry>"));
        assert!(feeds.json.contains("\"items\": []"));
    }
}
