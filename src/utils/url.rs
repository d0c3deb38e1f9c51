// src/utils/url.rs

//! Portal URL construction.

use url::Url;

use crate::error::Result;
use crate::models::AnnouncementId;

const FLOW_PATH: &str = "/campusweb/campussquare.do";
const ATTACHMENT_BASE: &str = "/campusweb/";
const FLOW_ID: &str = "POW1200000-flow";

/// Public link to an announcement, stored with each record.
///
/// # Examples
/// ```
/// use twins_crawler::models::AnnouncementId;
/// use twins_crawler::utils::url::announcement_url;
///
/// let base = url::Url::parse("https://twins.tsukuba.ac.jp").unwrap();
/// assert_eq!(
///     announcement_url(&base, &AnnouncementId::new(1, 2, 3)).unwrap(),
///     "https://twins.tsukuba.ac.jp/campusweb/campussquare.do?_flowId=POW1200000-flow&calledFlow=keiji&keijitype=1&genrecd=2&seqNo=3"
/// );
/// ```
pub fn announcement_url(base: &Url, id: &AnnouncementId) -> Result<String> {
    flow_url(base, id, &[])
}

/// URL that starts the detail page handshake for a portlet request.
pub fn detail_fetch_url(base: &Url, id: &AnnouncementId) -> Result<String> {
    flow_url(
        base,
        id,
        &[
            ("_campus_new_portal", "true"),
            ("_action_id", "displayPortletRequest"),
        ],
    )
}

fn flow_url(base: &Url, id: &AnnouncementId, extra: &[(&str, &str)]) -> Result<String> {
    let mut url = base.join(FLOW_PATH)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("_flowId", FLOW_ID);
        for (key, value) in extra {
            query.append_pair(key, value);
        }
        query
            .append_pair("calledFlow", "keiji")
            .append_pair("keijitype", &id.keijitype.to_string())
            .append_pair("genrecd", &id.genrecd.to_string())
            .append_pair("seqNo", &id.seq_no.to_string());
    }
    Ok(url.to_string())
}

/// Resolve an attachment download reference against `/campusweb/`.
pub fn attachment_url(base: &Url, location: &str) -> Result<Url> {
    Ok(base.join(ATTACHMENT_BASE)?.join(location)?)
}

/// Make an attachment title safe to use as a file name.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://twins.tsukuba.ac.jp").unwrap()
    }

    #[test]
    fn test_detail_fetch_url_carries_portlet_params() {
        let url = detail_fetch_url(&base(), &AnnouncementId::new(1, 2, 3)).unwrap();
        assert_eq!(
            url,
            "https://twins.tsukuba.ac.jp/campusweb/campussquare.do?_flowId=POW1200000-flow\
             &_campus_new_portal=true&_action_id=displayPortletRequest\
             &calledFlow=keiji&keijitype=1&genrecd=2&seqNo=3"
        );
    }

    #[test]
    fn test_announcement_url_ignores_base_path() {
        let base = Url::parse("http://localhost:8080/some/path").unwrap();
        let url = announcement_url(&base, &AnnouncementId::new(4, 5, 6)).unwrap();
        assert!(url.starts_with("http://localhost:8080/campusweb/campussquare.do?"));
    }

    #[test]
    fn test_attachment_url_relative_and_absolute() {
        assert_eq!(
            attachment_url(&base(), "campussquare.do?_flowId=DL&fileId=9")
                .unwrap()
                .as_str(),
            "https://twins.tsukuba.ac.jp/campusweb/campussquare.do?_flowId=DL&fileId=9"
        );
        assert_eq!(
            attachment_url(&base(), "/other/file.pdf").unwrap().as_str(),
            "https://twins.tsukuba.ac.jp/other/file.pdf"
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("履修案内.pdf"), "履修案内.pdf");
        assert_eq!(sanitize_filename("a/b\\c:d?.pdf"), "a_b_c_d_.pdf");
        assert_eq!(sanitize_filename(" .. "), "attachment");
        assert_eq!(sanitize_filename("../secret"), "_secret");
    }
}
