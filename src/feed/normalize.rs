use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::article::{Article, Category, DEFAULT_CATEGORY};
use crate::feed::parser::FeedEntry;

static IMG_ALT_DOUBLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img([^>]*?)\s*alt="[^"]*"([^>]*?)>"#).unwrap());
static IMG_ALT_SINGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img([^>]*?)\s*alt='[^']*'([^>]*?)>"#).unwrap());
static IMG_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img[^>]+src="([^">]+)""#).unwrap());

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Turn a parsed entry into an article. Entries without a link are dropped,
/// since the link is what de-duplication keys on.
pub fn build_article(entry: &FeedEntry, feed_url: &str) -> Option<Article> {
    let Some(url) = entry.link.clone() else {
        debug!("Dropping entry without link from {}", feed_url);
        return None;
    };

    Some(Article {
        id: Uuid::new_v4().to_string(),
        title: entry.title.clone().unwrap_or_default(),
        content: clean_content(entry.summary.as_deref().unwrap_or_default()),
        source: source_host(feed_url),
        timestamp: parse_date(entry),
        url,
        image_url: extract_image_url(entry),
        categories: extract_categories(entry),
    })
}

pub fn source_host(feed_url: &str) -> String {
    feed_url.split('/').nth(2).unwrap_or_default().to_string()
}

/// First parseable date field, rendered as RFC 3339. Falls back to now.
pub fn parse_date(entry: &FeedEntry) -> String {
    for (field, raw) in entry.date_candidates() {
        match parse_timestamp(raw) {
            Some(parsed) => return parsed,
            None => debug!("Failed to parse date '{}' from field '{}'", raw, field),
        }
    }

    let now = Utc::now().to_rfc3339();
    warn!("No valid date found in entry, using current UTC time: {}", now);
    now
}

pub fn parse_timestamp(raw: &str) -> Option<String> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.to_rfc3339());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.to_rfc3339());
    }

    // no offset given: assume UTC
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc().to_rfc3339())
}

pub fn extract_categories(entry: &FeedEntry) -> Vec<Category> {
    let mut categories: Vec<Category> = entry
        .categories
        .iter()
        .map(|term| term.trim())
        .filter(|term| !term.is_empty())
        .map(|term| Category::new(term.to_string()))
        .collect();

    if categories.is_empty() {
        categories.push(Category::new(DEFAULT_CATEGORY.to_string()));
    }

    categories
}

pub fn extract_image_url(entry: &FeedEntry) -> String {
    if let Some(media) = entry.media_content.iter().find(|m| m.is_image()) {
        return media.url.clone();
    }

    if let Some(thumbnail) = entry.media_thumbnails.first() {
        return thumbnail.clone();
    }

    if let Some(enclosure) = entry.enclosures.iter().find(|e| e.is_image()) {
        return enclosure.url.clone();
    }

    [entry.encoded_content.as_deref(), entry.summary.as_deref()]
        .into_iter()
        .flatten()
        .find_map(|html| IMG_SRC.captures(html))
        .map(|caps| caps[1].to_string())
        .unwrap_or_default()
}

/// Strip `alt` attributes from `<img>` tags.
pub fn clean_content(content: &str) -> String {
    let cleaned = IMG_ALT_DOUBLE.replace_all(content, "<img${1}${2}>");
    IMG_ALT_SINGLE
        .replace_all(&cleaned, "<img${1}${2}>")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::parser::MediaRef;
    use pretty_assertions::assert_eq;

    fn entry() -> FeedEntry {
        FeedEntry {
            title: Some("Title".to_string()),
            link: Some("https://news.example.com/a".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_rfc2822_keeps_offset() {
        assert_eq!(
            parse_timestamp("Tue, 02 Jan 2024 10:00:00 +0200").as_deref(),
            Some("2024-01-02T10:00:00+02:00")
        );
        assert_eq!(
            parse_timestamp("Tue, 02 Jan 2024 10:00:00 GMT").as_deref(),
            Some("2024-01-02T10:00:00+00:00")
        );
    }

    #[test]
    fn test_iso_and_naive_dates() {
        assert_eq!(
            parse_timestamp("2024-03-01T12:30:00Z").as_deref(),
            Some("2024-03-01T12:30:00+00:00")
        );
        assert_eq!(
            parse_timestamp("2024-03-01T12:30:00").as_deref(),
            Some("2024-03-01T12:30:00+00:00")
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_date_field_precedence() {
        let entry = FeedEntry {
            published: Some("garbage".to_string()),
            pub_date: Some("Tue, 02 Jan 2024 10:00:00 GMT".to_string()),
            updated: Some("2025-01-01T00:00:00Z".to_string()),
            ..entry()
        };

        assert_eq!(parse_date(&entry), "2024-01-02T10:00:00+00:00");
    }

    #[test]
    fn test_missing_date_uses_now() {
        let stamp = parse_date(&entry());
        let parsed = DateTime::parse_from_rfc3339(&stamp).unwrap();
        assert!((Utc::now() - parsed.with_timezone(&Utc)).num_seconds().abs() < 5);
    }

    #[test]
    fn test_categories_default() {
        assert_eq!(
            extract_categories(&entry()),
            vec![Category::new("Cryptocurrency".to_string())]
        );

        let tagged = FeedEntry {
            categories: vec!["DeFi".to_string(), "  ".to_string()],
            ..entry()
        };
        assert_eq!(
            extract_categories(&tagged),
            vec![Category::new("DeFi".to_string())]
        );
    }

    #[test]
    fn test_image_precedence() {
        let mut e = FeedEntry {
            encoded_content: Some(r#"<p><img src="https://img/inline.png"></p>"#.to_string()),
            enclosures: vec![MediaRef {
                url: "https://img/enclosure.png".to_string(),
                media_type: Some("image/png".to_string()),
            }],
            ..entry()
        };
        assert_eq!(extract_image_url(&e), "https://img/enclosure.png");

        e.media_thumbnails.push("https://img/thumb.png".to_string());
        assert_eq!(extract_image_url(&e), "https://img/thumb.png");

        e.media_content.push(MediaRef {
            url: "https://img/video.mp4".to_string(),
            media_type: Some("video/mp4".to_string()),
        });
        e.media_content.push(MediaRef {
            url: "https://img/media.jpg".to_string(),
            media_type: Some("image/jpeg".to_string()),
        });
        assert_eq!(extract_image_url(&e), "https://img/media.jpg");
    }

    #[test]
    fn test_image_from_inline_html() {
        let e = FeedEntry {
            encoded_content: Some(r#"<img class="x" src="https://img/inline.png" />"#.to_string()),
            ..entry()
        };
        assert_eq!(extract_image_url(&e), "https://img/inline.png");
        assert_eq!(extract_image_url(&entry()), "");
    }

    #[test]
    fn test_clean_content_strips_alt() {
        assert_eq!(
            clean_content(r#"<p>x</p><img src="a.png" alt="an image" width="10">"#),
            r#"<p>x</p><img src="a.png" width="10">"#
        );
        assert_eq!(
            clean_content("<img alt='quoted' src='b.png'>"),
            "<img src='b.png'>"
        );
        assert_eq!(clean_content("no images"), "no images");
    }

    #[test]
    fn test_build_article() {
        let article = build_article(&entry(), "https://news.example.com/rss").unwrap();

        assert_eq!(article.source, "news.example.com");
        assert_eq!(article.url, "https://news.example.com/a");
        assert_eq!(article.title, "Title");
        assert!(Uuid::parse_str(&article.id).is_ok());

        let no_link = FeedEntry {
            link: None,
            ..entry()
        };
        assert!(build_article(&no_link, "https://news.example.com/rss").is_none());
    }
}
