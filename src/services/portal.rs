// src/services/portal.rs

//! HTTP access to the portal.
//!
//! Detail pages sit behind a redirect that issues a session cookie; the
//! same cookie is needed afterwards to download that page's attachments.

use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::{Client, Response};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{AnnouncementId, Config};
use crate::utils::http::{create_async_client, create_manual_redirect_client};
use crate::utils::url::{attachment_url, detail_fetch_url};

/// Cookies issued by the detail page handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    cookies: Vec<(String, String)>,
}

impl Session {
    /// Collect `name=value` pairs from `Set-Cookie` header values.
    ///
    /// Attributes after the first `;` are dropped; a later cookie with the
    /// same name replaces an earlier one.
    pub fn from_set_cookie<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut session = Self::default();
        for value in values {
            let pair = value.split(';').next().unwrap_or_default().trim();
            let (name, val) = pair.split_once('=').unwrap_or((pair, ""));
            if name.is_empty() {
                continue;
            }
            match session.cookies.iter_mut().find(|(n, _)| n == name) {
                Some(existing) => existing.1 = val.to_string(),
                None => session.cookies.push((name.to_string(), val.to_string())),
            }
        }
        session
    }

    /// Value for a `Cookie` request header.
    pub fn header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// A fetched detail page and the session it was served under.
#[derive(Debug, Clone)]
pub struct DetailPage {
    pub html: String,
    pub session: Session,
}

/// Client for the portal's listing, detail and download endpoints.
#[derive(Debug, Clone)]
pub struct PortalClient {
    base_url: Url,
    index_url: Url,
    client: Client,
    handshake: Client,
}

impl PortalClient {
    /// Create a portal client with the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            base_url: config.portal.base_url()?,
            index_url: config.portal.index_url()?,
            client: create_async_client(&config.crawler)?,
            handshake: create_manual_redirect_client(&config.crawler)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the announcement listing page.
    pub async fn fetch_index(&self) -> Result<String> {
        log::debug!("Fetching index page {}", self.index_url);
        let response = self.client.get(self.index_url.clone()).send().await?;
        Ok(response.error_for_status()?.text().await?)
    }

    /// Fetch one detail page through the redirect handshake.
    pub async fn fetch_detail(&self, id: &AnnouncementId) -> Result<DetailPage> {
        let url = detail_fetch_url(&self.base_url, id)?;
        log::debug!("Fetching detail page {url}");

        let first = self.handshake.get(&url).send().await?;
        let session = Session::from_set_cookie(
            first
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );
        let location = first
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::crawl(
                    format!("detail {id}"),
                    format!("no redirect location (status {})", first.status()),
                )
            })?;
        let target = self.base_url.join(location)?;

        let response = self
            .client
            .get(target)
            .header(COOKIE, session.header_value())
            .send()
            .await?;
        let html = response.error_for_status()?.text().await?;

        Ok(DetailPage { html, session })
    }

    /// Download one file attachment with the detail page's session.
    pub async fn fetch_attachment(&self, location: &str, session: &Session) -> Result<Vec<u8>> {
        let url = attachment_url(&self.base_url, location)?;
        log::debug!("Fetching attachment {url}");

        let response: Response = self
            .handshake
            .get(url)
            .header(COOKIE, session.header_value())
            .send()
            .await?;
        let response = response.error_for_status()?;
        if response.status().is_redirection() {
            return Err(AppError::crawl(
                format!("attachment {location}"),
                format!("unexpected redirect (status {})", response.status()),
            ));
        }
        Ok(response.bytes().await?.to_vec())
    }
}
