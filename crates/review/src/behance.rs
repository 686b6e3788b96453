//! Behance project links as a submission source.
//!
//! A shared project page is reduced to its cover image, which then enters the
//! normal review flow like an uploaded photo.

use std::{path::Path, sync::LazyLock, time::Duration};

use {regex::Regex, tracing::debug, url::Url};

use crate::{
    error::{Error, Result},
    image::ImageRef,
};

/// Some CDNs refuse requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0";
const UNTITLED: &str = "Untitled";

static PROJECT_LINK: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"https?://(?:www\.)?behance\.net/gallery/\d+[^\s<>]*").ok()
});
static META_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").ok());
static ATTRIBUTE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i)([a-z][a-z0-9:_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).ok()
});
static CDN_IMG: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*\bsrc\s*=\s*["'](https://mir-s3-cdn-cf\.behance\.net/project_modules[^"']+)["']"#)
        .ok()
});

/// Metadata scraped from a project page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehanceProject {
    pub title: String,
    pub image_url: String,
    pub url: String,
}

impl BehanceProject {
    /// Short description sent back to the user.
    pub fn summary(&self) -> String {
        format!("Project: {}\nLink: {}", self.title, self.url)
    }
}

/// First Behance gallery link in `text`, if any.
pub fn find_project_link(text: &str) -> Option<String> {
    let re = PROJECT_LINK.as_ref()?;
    re.find(text).map(|m| {
        m.as_str()
            .trim_end_matches(['.', ',', ')', '!', '?'])
            .to_string()
    })
}

/// Pull the title and cover image out of a project page.
///
/// Uses the Open Graph tags; when `og:image` is missing, falls back to the
/// first image served from the project CDN.
pub fn parse_project_page(html: &str, url: &str) -> Result<BehanceProject> {
    let title = meta_content(html, "og:title")
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let image_url = meta_content(html, "og:image")
        .filter(|src| !src.is_empty())
        .or_else(|| {
            let re = CDN_IMG.as_ref()?;
            re.captures(html)
                .and_then(|caps| caps.get(1))
                .map(|m| decode_entities(m.as_str()))
        })
        .ok_or_else(|| Error::message(format!("no image found on {url}")))?;

    Ok(BehanceProject {
        title,
        image_url,
        url: url.to_string(),
    })
}

fn meta_content(html: &str, property: &str) -> Option<String> {
    let (tags, attrs) = (META_TAG.as_ref()?, ATTRIBUTE.as_ref()?);
    tags.find_iter(html).find_map(|tag| {
        let mut key = None;
        let mut content = None;
        for caps in attrs.captures_iter(tag.as_str()) {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str();
            match name.as_str() {
                "property" | "name" => key = Some(value.to_string()),
                "content" => content = Some(value.to_string()),
                _ => {},
            }
        }
        (key.as_deref() == Some(property))
            .then_some(content)
            .flatten()
            .map(|c| decode_entities(&c))
    })
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Fetches project pages and their cover images.
pub struct BehanceImporter {
    client: reqwest::Client,
}

impl BehanceImporter {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch_project(&self, url: &str) -> Result<BehanceProject> {
        let parsed = Url::parse(url)?;
        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::message(format!(
                "Behance returned HTTP {status} for {url}"
            )));
        }
        let html = response.text().await?;
        let project = parse_project_page(&html, url)?;
        debug!(url, title = %project.title, image = %project.image_url, "parsed behance project");
        Ok(project)
    }

    /// Download the project's cover image into `dir`.
    pub async fn download_cover(&self, project: &BehanceProject, dir: &Path) -> Result<ImageRef> {
        let response = self
            .client
            .get(Url::parse(&project.image_url)?)
            .send()
            .await?
            .error_for_status()?;
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("image/"))
            .map_or("image/jpeg", |v| v.split(';').next().unwrap_or(v).trim())
            .to_string();
        let bytes = response.bytes().await?;
        ImageRef::store(dir, "behance-", &mime_type, &bytes).await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    const PAGE: &str = r#"<html><head>
        <meta property="og:title" content="Brand identity for &quot;Nord&quot; coffee">
        <meta content="https://mir-s3-cdn-cf.behance.net/projects/404/cover.jpg" property="og:image" />
        </head><body></body></html>"#;

    #[rstest]
    #[case(
        "look https://www.behance.net/gallery/123456/Nord-Coffee.",
        Some("https://www.behance.net/gallery/123456/Nord-Coffee")
    )]
    #[case("http://behance.net/gallery/42", Some("http://behance.net/gallery/42"))]
    #[case("https://www.behance.net/someone", None)]
    #[case("no links here", None)]
    fn finds_project_links(#[case] text: &str, #[case] expected: Option<&str>) {
        assert_eq!(find_project_link(text).as_deref(), expected);
    }

    #[test]
    fn reads_open_graph_tags_in_any_attribute_order() {
        let project = parse_project_page(PAGE, "https://www.behance.net/gallery/1/x").unwrap();
        assert_eq!(project.title, "Brand identity for \"Nord\" coffee");
        assert_eq!(
            project.image_url,
            "https://mir-s3-cdn-cf.behance.net/projects/404/cover.jpg"
        );
        assert_eq!(
            project.summary(),
            "Project: Brand identity for \"Nord\" coffee\nLink: https://www.behance.net/gallery/1/x"
        );
    }

    #[test]
    fn falls_back_to_first_cdn_image_and_default_title() {
        let html = r#"<img src="/static/logo.png">
            <img class="grid" src="https://mir-s3-cdn-cf.behance.net/project_modules/1400/a.png">
            <img src="https://mir-s3-cdn-cf.behance.net/project_modules/1400/b.png">"#;
        let project = parse_project_page(html, "u").unwrap();
        assert_eq!(project.title, UNTITLED);
        assert_eq!(
            project.image_url,
            "https://mir-s3-cdn-cf.behance.net/project_modules/1400/a.png"
        );
    }

    #[test]
    fn page_without_images_is_an_error() {
        assert!(parse_project_page("<html></html>", "u").is_err());
    }

    #[tokio::test]
    async fn fetches_page_with_browser_agent_and_downloads_cover() {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("GET", "/gallery/1/x")
            .match_header("user-agent", USER_AGENT)
            .with_status(200)
            .with_body(format!(
                r#"<meta property="og:title" content="Poster"><meta property="og:image" content="{}/cover.png">"#,
                server.url()
            ))
            .create_async()
            .await;
        let cover = server
            .mock("GET", "/cover.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body("png")
            .create_async()
            .await;

        let importer = BehanceImporter::new().unwrap();
        let project = importer
            .fetch_project(&format!("{}/gallery/1/x", server.url()))
            .await
            .unwrap();
        assert_eq!(project.title, "Poster");

        let dir = tempfile::tempdir().unwrap();
        let image = importer.download_cover(&project, dir.path()).await.unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(std::fs::read(&image.path).unwrap(), b"png");
        page.assert_async().await;
        cover.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/gallery/9")
            .with_status(404)
            .create_async()
            .await;
        let importer = BehanceImporter::new().unwrap();
        let err = importer
            .fetch_project(&format!("{}/gallery/9", server.url()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
