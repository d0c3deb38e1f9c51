//! Announcement detail page extractor.
//!
//! The page is walked along a fixed path:
//!
//! ```text
//! html > body > div > #-PortalLoginZenbunForm
//!     #webpage-list-title-box > div > a         title + date
//!     #webpage-contents                         body text
//!     table*                                    attachment tables
//!     #webpage-contents-list-footer-box > div   affiliation + period
//! ```
//!
//! Each step fails on the first deviation; no partial record is returned.

use scraper::{ElementRef, Html};

use crate::error::{AppError, Result};
use crate::models::{
    Attachment, AttachmentItem, AttachmentKind, DetailRecord, DetailTitle, Footer,
};
use crate::parser::date::{parse_date, parse_period};
use crate::parser::dom::{
    child_by_id, child_by_tag, children_by_tag, mixed_text, required_attr, required_text,
};

pub const FORM_ID: &str = "-PortalLoginZenbunForm";
pub const TITLE_BOX_ID: &str = "webpage-list-title-box";
pub const CONTENTS_ID: &str = "webpage-contents";
pub const FOOTER_BOX_ID: &str = "webpage-contents-list-footer-box";

/// Two non-breaking spaces separate title/date and the footer fields.
pub const SEPARATOR: &str = "\u{a0}\u{a0}";

/// Label preceding the posting period in the footer.
pub const PERIOD_LABEL: &str = "掲示期間";

/// Parse one detail page.
pub fn parse_detail_page(html: &str) -> Result<DetailRecord> {
    let document = Html::parse_document(html);
    extract_detail(&document)
}

/// Extract title, body, attachments and footer from a parsed page.
pub fn extract_detail(document: &Html) -> Result<DetailRecord> {
    let page = child_by_tag(document.root_element(), "body")?;
    let portlet = child_by_tag(page, "div")?;
    let form = child_by_id(portlet, FORM_ID)?;

    let title = extract_title(form)?;
    let body = mixed_text(child_by_id(form, CONTENTS_ID)?)?
        .trim()
        .to_string();
    let attachments = children_by_tag(form, "table")
        .enumerate()
        .map(|(i, table)| {
            extract_attachment_table(table).map_err(|e| match e {
                AppError::Structure(msg) => {
                    AppError::structure(format!("attachment table {i}: {msg}"))
                }
                other => other,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let footer = extract_footer(form)?;

    Ok(DetailRecord {
        title,
        body,
        attachments,
        footer,
    })
}

fn extract_title(form: ElementRef<'_>) -> Result<DetailTitle> {
    let title_box = child_by_id(form, TITLE_BOX_ID)?;
    let inner = child_by_tag(title_box, "div")?;
    let anchor = child_by_tag(inner, "a")?;
    let text = required_text(anchor)?;

    // The title itself may contain the separator; the date follows the last one.
    let split = text
        .rfind(SEPARATOR)
        .ok_or_else(|| AppError::structure("title has no date separator"))?;
    let title_text = text[..split].trim();
    let date_text = text[split + SEPARATOR.len()..].trim();

    if title_text.is_empty() || date_text.is_empty() {
        return Err(AppError::structure("title or title date is empty"));
    }

    Ok(DetailTitle {
        text: title_text.to_string(),
        date: parse_date(date_text)?,
    })
}

fn extract_attachment_table(table: ElementRef<'_>) -> Result<Attachment> {
    let tbody = child_by_tag(table, "tbody")?;
    let mut rows = children_by_tag(tbody, "tr");

    let header = rows
        .next()
        .ok_or_else(|| AppError::structure("attachment table has no header row"))?;
    let header_cells: Vec<_> = children_by_tag(header, "th").collect();
    let [header_cell] = header_cells.as_slice() else {
        return Err(AppError::structure(format!(
            "header row has {} <th> cells, expected 1",
            header_cells.len()
        )));
    };
    let kind = AttachmentKind::from_header(required_text(*header_cell)?.trim())?;

    let items = rows
        .map(|tr| extract_attachment_item(tr, kind))
        .collect::<Result<Vec<_>>>()?;

    Ok(kind.with_items(items))
}

fn extract_attachment_item(tr: ElementRef<'_>, kind: AttachmentKind) -> Result<AttachmentItem> {
    let cells: Vec<_> = children_by_tag(tr, "td").collect();
    let [cell] = cells.as_slice() else {
        return Err(AppError::structure(format!(
            "attachment row has {} <td> cells, expected 1",
            cells.len()
        )));
    };

    let anchors: Vec<_> = children_by_tag(*cell, "a").collect();
    let [anchor] = anchors.as_slice() else {
        return Err(AppError::structure(format!(
            "attachment cell has {} <a> links, expected 1",
            anchors.len()
        )));
    };
    let anchor = *anchor;
    let href = required_attr(anchor, "href")?;
    if href.is_empty() {
        return Err(AppError::structure("attachment link has an empty href"));
    }
    let title = required_text(anchor)?.trim().to_string();
    if title.is_empty() {
        return Err(AppError::structure("attachment title is empty"));
    }

    // URL tables print the target as the label; a mismatch means we misread the row.
    if kind == AttachmentKind::Url {
        if title != href {
            return Err(AppError::structure(format!(
                "URL attachment label {title:?} does not match href {href:?}"
            )));
        }
        if !href.starts_with("http://") && !href.starts_with("https://") {
            return Err(AppError::structure(format!(
                "URL attachment is not absolute: {href:?}"
            )));
        }
    }

    Ok(AttachmentItem {
        title,
        location: href.to_string(),
    })
}

fn extract_footer(form: ElementRef<'_>) -> Result<Footer> {
    let footer_box = child_by_id(form, FOOTER_BOX_ID)?;
    let inner = child_by_tag(footer_box, "div")?;
    let text = mixed_text(inner)?;

    let segments: Vec<&str> = text.split(SEPARATOR).collect();
    let [affiliation, middle, period] = segments.as_slice() else {
        return Err(AppError::structure(format!(
            "footer has {} segments, expected 3",
            segments.len()
        )));
    };

    let lines: Vec<&str> = middle.trim().split('\n').collect();
    let [sub_affiliation, label] = lines.as_slice() else {
        return Err(AppError::structure(format!(
            "footer middle segment has {} lines, expected 2",
            lines.len()
        )));
    };

    let affiliation = affiliation.trim();
    let sub_affiliation = sub_affiliation.trim();
    let label = label.trim();
    let period = period.trim();

    if affiliation.is_empty() || sub_affiliation.is_empty() || period.is_empty() {
        return Err(AppError::structure("footer field is empty"));
    }
    if label != PERIOD_LABEL {
        return Err(AppError::structure(format!(
            "footer label is {label:?}, expected {PERIOD_LABEL:?}"
        )));
    }

    Ok(Footer {
        affiliation: affiliation.to_string(),
        sub_affiliation: sub_affiliation.to_string(),
        period: parse_period(period)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const FILE_TABLE: &str = r#"<table class="attachment"><tbody>
<tr><th>添付ファイル</th></tr>
<tr><td><a href="/campusweb/download?fileId=11">履修案内.pdf</a></td></tr>
<tr><td><a href="/campusweb/download?fileId=12">時間割.xlsx</a></td></tr>
</tbody></table>"#;

    pub(crate) const URL_TABLE: &str = r#"<table class="attachment"><tbody>
<tr><th>URL</th></tr>
<tr><td><a href="https://www.tsukuba.ac.jp/news">https://www.tsukuba.ac.jp/news</a></td></tr>
</tbody></table>"#;

    pub(crate) fn detail_page(title: &str, tables: &[&str], footer: &str) -> String {
        format!(
            r##"<!DOCTYPE html>
<html><head><title>TWINS</title></head>
<body>
<div id="portlet-body">
<div id="-PortalLoginZenbunForm">
<div id="webpage-list-title-box"><div><a href="#">{title}</a></div></div>
<div id="webpage-contents">履修登録期間は以下のとおりです。<br>期限を守ってください。<br></div>
{}
<div id="webpage-contents-list-footer-box"><div>{footer}</div></div>
</div>
</div>
</body></html>"##,
            tables.join("\n")
        )
    }

    pub(crate) const FOOTER: &str =
        "教育推進部&nbsp;&nbsp;教育推進課<br>掲示期間&nbsp;&nbsp;2025/12/23 - 2026/1/23";

    fn sample_page(tables: &[&str]) -> String {
        detail_page("履修登録について&nbsp;&nbsp;2025/12/4", tables, FOOTER)
    }

    #[test]
    fn test_parse_full_page() {
        let record = parse_detail_page(&sample_page(&[FILE_TABLE, URL_TABLE])).unwrap();

        assert_eq!(record.title.text, "履修登録について");
        assert_eq!(record.title.date.as_str(), "2025-12-04");
        assert_eq!(
            record.body,
            "履修登録期間は以下のとおりです。\n期限を守ってください。"
        );

        assert_eq!(record.attachments.len(), 2);
        match &record.attachments[0] {
            Attachment::File { items } => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].title, "履修案内.pdf");
                assert_eq!(items[0].location, "/campusweb/download?fileId=11");
            }
            other => panic!("expected file table, got {other:?}"),
        }
        assert_eq!(record.attachments[1].kind(), AttachmentKind::Url);

        assert_eq!(record.footer.affiliation, "教育推進部");
        assert_eq!(record.footer.sub_affiliation, "教育推進課");
        assert_eq!(record.footer.period.start.as_str(), "2025-12-23");
        assert_eq!(record.footer.period.end.as_str(), "2026-01-23");
    }

    #[test]
    fn test_no_tables_means_no_attachments() {
        let record = parse_detail_page(&sample_page(&[])).unwrap();
        assert!(record.attachments.is_empty());
    }

    #[test]
    fn test_title_splits_on_last_separator() {
        let page = detail_page(
            "説明会&nbsp;&nbsp;第2回&nbsp;&nbsp;2025/12/4",
            &[],
            FOOTER,
        );
        let record = parse_detail_page(&page).unwrap();
        assert_eq!(record.title.text, "説明会\u{a0}\u{a0}第2回");
        assert_eq!(record.title.date.as_str(), "2025-12-04");
    }

    #[test]
    fn test_title_without_separator_fails() {
        let page = detail_page("履修登録について 2025/12/4", &[], FOOTER);
        assert!(matches!(parse_detail_page(&page), Err(AppError::Structure(_))));
    }

    #[test]
    fn test_empty_title_part_fails() {
        let page = detail_page("&nbsp;&nbsp;2025/12/4", &[], FOOTER);
        assert!(matches!(parse_detail_page(&page), Err(AppError::Structure(_))));
    }

    #[test]
    fn test_url_label_mismatch_fails() {
        let table = r#"<table><tbody>
<tr><th>URL</th></tr>
<tr><td><a href="https://example.com/a">リンク</a></td></tr>
</tbody></table>"#;
        let err = parse_detail_page(&sample_page(&[table])).unwrap_err();
        assert!(matches!(err, AppError::Structure(_)));
        assert!(err.to_string().contains("attachment table 0"));
    }

    #[test]
    fn test_url_must_be_absolute() {
        let table = r#"<table><tbody>
<tr><th>URL</th></tr>
<tr><td><a href="ftp://example.com/a">ftp://example.com/a</a></td></tr>
</tbody></table>"#;
        assert!(matches!(
            parse_detail_page(&sample_page(&[table])),
            Err(AppError::Structure(_))
        ));
    }

    #[test]
    fn test_file_label_may_differ_from_href() {
        let table = r#"<table><tbody>
<tr><th>添付ファイル</th></tr>
<tr><td><a href="https://example.com/a">資料</a></td></tr>
</tbody></table>"#;
        let record = parse_detail_page(&sample_page(&[table])).unwrap();
        let items = record.attachments[0].items();
        assert_eq!(items[0].title, "資料");
        assert_eq!(items[0].location, "https://example.com/a");
    }

    #[test]
    fn test_unknown_header_fails() {
        let table = r#"<table><tbody>
<tr><th>関連リンク</th></tr>
<tr><td><a href="https://example.com">https://example.com</a></td></tr>
</tbody></table>"#;
        let err = parse_detail_page(&sample_page(&[table])).unwrap_err();
        assert!(err.to_string().contains("unknown attachment type"));
    }

    #[test]
    fn test_header_only_table_is_empty_attachment() {
        let table = "<table><tbody><tr><th>添付ファイル</th></tr></tbody></table>";
        let record = parse_detail_page(&sample_page(&[table])).unwrap();
        assert!(record.attachments[0].items().is_empty());
    }

    #[test]
    fn test_row_with_two_cells_fails() {
        let table = r#"<table><tbody>
<tr><th>添付ファイル</th></tr>
<tr><td><a href="a.pdf">a.pdf</a></td><td>extra</td></tr>
</tbody></table>"#;
        assert!(parse_detail_page(&sample_page(&[table])).is_err());
    }

    #[test]
    fn test_cell_with_two_links_fails() {
        let table = r#"<table><tbody>
<tr><th>添付ファイル</th></tr>
<tr><td><a href="/download?fileId=1">a.pdf</a><a href="/download?fileId=2">b.pdf</a></td></tr>
</tbody></table>"#;
        let err = parse_detail_page(&sample_page(&[table])).unwrap_err();
        assert!(matches!(err, AppError::Structure(_)), "{err}");
        assert!(err.to_string().contains("2 <a> links"), "{err}");
    }

    #[test]
    fn test_footer_wrong_label_fails() {
        let footer = "教育推進部&nbsp;&nbsp;教育推進課<br>公開期間&nbsp;&nbsp;2025/12/23 - 2026/1/23";
        let page = detail_page("t&nbsp;&nbsp;2025/12/4", &[], footer);
        let err = parse_detail_page(&page).unwrap_err();
        assert!(err.to_string().contains("掲示期間"));
    }

    #[test]
    fn test_footer_segment_count() {
        let footer = "教育推進部<br>掲示期間&nbsp;&nbsp;2025/12/23 - 2026/1/23";
        let page = detail_page("t&nbsp;&nbsp;2025/12/4", &[], footer);
        assert!(matches!(parse_detail_page(&page), Err(AppError::Structure(_))));
    }

    #[test]
    fn test_footer_bad_period_is_format_error() {
        let footer = "教育推進部&nbsp;&nbsp;教育推進課<br>掲示期間&nbsp;&nbsp;2025/12/23 ~ 2026/1/23";
        let page = detail_page("t&nbsp;&nbsp;2025/12/4", &[], footer);
        assert!(matches!(parse_detail_page(&page), Err(AppError::Format(_))));
    }

    #[test]
    fn test_missing_form_fails() {
        let html = "<html><body><div><div id=\"other\"></div></div></body></html>";
        let err = parse_detail_page(html).unwrap_err();
        assert!(err.to_string().contains(FORM_ID));
    }
}
