//! Announcement listing extractor.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

use crate::error::{AppError, Result};
use crate::models::{AnnouncementId, IndexRecord};
use crate::parser::date::parse_date;
use crate::parser::dom::{
    child_by_tag, child_elements, children_by_tag, describe, find_by_id, required_attr, required_text,
};

/// Id of the `div` holding the announcement table.
pub const CONTAINER_ID: &str = "keiji-portlet";

static ONCLICK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^showKeijiDetail\('([0-9]+)', '([0-9]+)', '([0-9]+)'\);$")
        .expect("valid onclick pattern")
});

/// Minimum children of a listing cell: text, anchor, br, date, br, br, text.
const CELL_CHILDREN: usize = 7;
const TITLE_SLOT: usize = 1;
const DATE_SLOT: usize = 3;

/// Parse listing HTML into records, top of the listing first.
pub fn parse_index_page(html: &str) -> Result<Vec<IndexRecord>> {
    let document = Html::parse_document(html);
    extract_index(&document)
}

/// Extract every row of the listing. One bad row fails the whole page.
pub fn extract_index(document: &Html) -> Result<Vec<IndexRecord>> {
    let container = find_by_id(document.root_element(), "div", CONTAINER_ID).ok_or_else(|| {
        AppError::structure(format!("listing container #{CONTAINER_ID} not found"))
    })?;

    let table = child_by_tag(container, "table")?;
    let tbody = child_by_tag(table, "tbody")?;

    child_elements(tbody)
        .enumerate()
        .map(|(row, tr)| {
            parse_row(tr).map_err(|e| match e {
                AppError::Structure(msg) => {
                    AppError::structure(format!("listing row {row}: {msg}"))
                }
                AppError::Format(msg) => AppError::format(format!("listing row {row}: {msg}")),
                other => other,
            })
        })
        .collect()
}

fn parse_row(tr: ElementRef<'_>) -> Result<IndexRecord> {
    let tds: Vec<_> = children_by_tag(tr, "td").collect();
    let [td] = tds.as_slice() else {
        return Err(AppError::structure(format!(
            "listing row has {} <td> cells, expected 1",
            tds.len()
        )));
    };
    let cells: Vec<_> = td.children().collect();

    if cells.len() < CELL_CHILDREN {
        return Err(AppError::structure(format!(
            "<td> has {} child nodes, expected at least {CELL_CHILDREN}",
            cells.len()
        )));
    }

    let layout = [
        (0, false),
        (2, true),
        (3, false),
        (4, true),
        (5, true),
        (6, false),
    ];
    for (slot, expected_br) in layout {
        let node = cells[slot].value();
        let ok = if expected_br {
            matches!(node, Node::Element(el) if el.name() == "br")
        } else {
            node.is_text()
        };
        if !ok {
            return Err(AppError::structure(format!(
                "child {slot} of <td> is {}, expected {}",
                describe(node),
                if expected_br { "<br>" } else { "text" }
            )));
        }
    }

    let anchor = ElementRef::wrap(cells[TITLE_SLOT])
        .filter(|el| el.value().name() == "a")
        .ok_or_else(|| {
            AppError::structure(format!(
                "title slot is {}, expected <a>",
                describe(cells[TITLE_SLOT].value())
            ))
        })?;

    let title = required_text(anchor)?;
    let id = parse_onclick(required_attr(anchor, "onclick")?)?;

    let date_text = cells[DATE_SLOT]
        .value()
        .as_text()
        .map(|t| t.trim())
        .unwrap_or_default();
    let date = parse_date(date_text)?;

    Ok(IndexRecord {
        title: title.trim().to_string(),
        id,
        date,
    })
}

/// Parse `showKeijiDetail('1', '2', '3');` into an identity.
pub fn parse_onclick(onclick: &str) -> Result<AnnouncementId> {
    let caps = ONCLICK_PATTERN.captures(onclick).ok_or_else(|| {
        AppError::structure(format!("unexpected onclick handler: {onclick:?}"))
    })?;

    let number = |i: usize| -> Result<u64> {
        caps[i]
            .parse()
            .map_err(|e| AppError::format(format!("identity part {:?}: {e}", &caps[i])))
    };

    Ok(AnnouncementId::new(number(1)?, number(2)?, number(3)?))
}
