use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use scraper::{Html, Selector};
use url::Url;

use crate::entry_date::EntryDate;
use crate::title_row::TitleRow;

pub const DEFAULT_BASE_URL: &str = "https://news.ycombinator.com";

/// Produces the ranked front-page titles for one day.
///
/// Implementations fail rather than return anything but exactly 30 non-empty titles.
#[async_trait]
pub trait TitleSource: Send + Sync {
    async fn get_titles(&self, date: EntryDate) -> anyhow::Result<TitleRow>;
}

/// Reads the dated front-page snapshots served at `{base}/front?day=Y-M-D`.
#[derive(Debug, Clone)]
pub struct HackerNewsSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HackerNewsSource {
    pub fn new(base_url: Url, request_timeout: Duration) -> anyhow::Result<Self> {
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            anyhow::bail!("base url must be http/https: {base_url}");
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build front page http client")?;

        Ok(Self { client, base_url })
    }

    pub fn page_url(&self, date: EntryDate) -> anyhow::Result<Url> {
        let mut url = self
            .base_url
            .join("front")
            .with_context(|| format!("join front page path onto {}", self.base_url))?;
        url.set_query(Some(&format!(
            "day={}-{}-{}",
            date.year(),
            date.month(),
            date.day()
        )));
        Ok(url)
    }
}

#[async_trait]
impl TitleSource for HackerNewsSource {
    async fn get_titles(&self, date: EntryDate) -> anyhow::Result<TitleRow> {
        let url = self.page_url(date)?;

        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, "hn-frontpage/0.1")
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("read body of {url}"))?;
        if !status.is_success() {
            anyhow::bail!("unexpected status {status} from {url}: {body}");
        }

        parse_titles(&body).with_context(|| format!("parse titles from {url}"))
    }
}

/// Extracts the ranked titles from a front-page document.
///
/// Only the text directly inside each title link counts; the site badge next to it does not.
pub fn parse_titles(html: &str) -> anyhow::Result<TitleRow> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"span[class="titleline"] > a"#)
        .map_err(|err| anyhow::anyhow!("build title selector: {err}"))?;

    let titles = document
        .select(&selector)
        .flat_map(|link| {
            link.children()
                .filter_map(|node| node.value().as_text().map(|text| (**text).to_owned()))
        })
        .collect::<Vec<_>>();

    TitleRow::from_titles(titles).context("front page titles")
}
