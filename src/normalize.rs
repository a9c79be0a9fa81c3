use chrono::{DateTime, Utc};
use feed_rs::model::Entry;

/// An article as it arrives from a feed, before any defaults are applied.
/// Every field is optional; blank strings are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct RawItem {
    pub guid: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub author: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

impl RawItem {
    /// Boundary with the feed parser: pull the loosely-shaped fields out of
    /// a parsed entry without assuming any of them are present.
    pub fn from_entry(entry: Entry) -> Self {
        Self {
            guid: non_blank(Some(entry.id)),
            link: non_blank(entry.links.first().map(|l| l.href.clone())),
            title: non_blank(entry.title.map(|t| t.content)),
            summary: non_blank(entry.summary.map(|t| t.content)),
            author: non_blank(entry.authors.into_iter().next().map(|p| p.name)),
            published: entry.published,
            updated: entry.updated,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// A normalized article. Every field is guaranteed present; construction
/// never fails regardless of how malformed the raw item was.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Dedup key: lowercased guid, link or title, whichever exists first.
    /// Empty when all three are missing.
    pub id: String,
    pub title: String,
    pub link: String,
    pub author: Option<String>,
    /// Host of the feed this item came from, e.g. "nytimes.com"
    pub source: String,
    pub summary: String,
    pub published_at: DateTime<Utc>,
}

/// Normalize raw feed items into the common article shape.
///
/// Pure function: no I/O, and every missing or malformed field resolves to
/// a total default. Items without a usable date fall back to the Unix epoch
/// so they sort last.
pub fn normalize(raw_items: Vec<RawItem>, source_host: &str) -> Vec<Item> {
    raw_items
        .into_iter()
        .map(|raw| {
            let id = raw
                .guid
                .as_deref()
                .or(raw.link.as_deref())
                .or(raw.title.as_deref())
                .unwrap_or("")
                .to_lowercase();

            Item {
                id,
                title: raw.title.unwrap_or_else(|| "(no title)".to_string()),
                link: raw.link.unwrap_or_default(),
                author: raw.author,
                source: source_host.to_string(),
                summary: raw.summary.unwrap_or_default(),
                published_at: raw
                    .published
                    .or(raw.updated)
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            }
        })
        .collect()
}

/// Host component of a URL with any leading "www." stripped.
/// Returns an empty string when the URL doesn't parse.
pub fn host(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.host_str()
                .map(|h| h.strip_prefix("www.").unwrap_or(h).to_string())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use feed_rs::model::Link;

    fn raw(guid: Option<&str>, link: Option<&str>, title: Option<&str>) -> RawItem {
        RawItem {
            guid: guid.map(String::from),
            link: link.map(String::from),
            title: title.map(String::from),
            ..Default::default()
        }
    }

    fn create_test_entry(id: &str, links: Vec<&str>) -> Entry {
        Entry {
            id: id.to_string(),
            links: links
                .into_iter()
                .map(|href| Link {
                    href: href.to_string(),
                    rel: None,
                    media_type: None,
                    href_lang: None,
                    title: None,
                    length: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    mod id_derivation_tests {
        use super::*;

        #[test]
        fn test_id_prefers_guid() {
            let items = normalize(
                vec![raw(Some("GUID-1"), Some("https://a.com/1"), Some("Title"))],
                "a.com",
            );
            assert_eq!(items[0].id, "guid-1");
        }

        #[test]
        fn test_id_falls_back_to_link() {
            let items = normalize(
                vec![raw(None, Some("https://a.com/Article"), Some("Title"))],
                "a.com",
            );
            assert_eq!(items[0].id, "https://a.com/article");
        }

        #[test]
        fn test_id_falls_back_to_title() {
            let items = normalize(vec![raw(None, None, Some("Some Headline"))], "a.com");
            assert_eq!(items[0].id, "some headline");
        }

        #[test]
        fn test_id_empty_when_nothing_usable() {
            let items = normalize(vec![raw(None, None, None)], "a.com");
            assert_eq!(items[0].id, "");
        }

        #[test]
        fn test_id_is_lowercased() {
            let items = normalize(vec![raw(Some("ABC-Def"), None, None)], "a.com");
            assert_eq!(items[0].id, "abc-def");
        }
    }

    mod total_defaults_tests {
        use super::*;

        #[test]
        fn test_all_fields_defaulted_for_empty_raw_item() {
            let items = normalize(vec![RawItem::default()], "example.com");

            assert_eq!(items.len(), 1);
            let item = &items[0];
            assert_eq!(item.id, "");
            assert_eq!(item.title, "(no title)");
            assert_eq!(item.link, "");
            assert_eq!(item.author, None);
            assert_eq!(item.source, "example.com");
            assert_eq!(item.summary, "");
            assert_eq!(item.published_at, DateTime::<Utc>::UNIX_EPOCH);
        }

        #[test]
        fn test_missing_dates_fall_back_to_epoch() {
            let items = normalize(vec![raw(Some("x"), None, None)], "a.com");
            assert_eq!(items[0].published_at.timestamp(), 0);
        }

        #[test]
        fn test_published_preferred_over_updated() {
            let published = Utc.with_ymd_and_hms(2024, 12, 9, 12, 0, 0).unwrap();
            let updated = Utc.with_ymd_and_hms(2024, 12, 10, 12, 0, 0).unwrap();
            let item = RawItem {
                guid: Some("x".to_string()),
                published: Some(published),
                updated: Some(updated),
                ..Default::default()
            };

            let items = normalize(vec![item], "a.com");
            assert_eq!(items[0].published_at, published);
        }

        #[test]
        fn test_updated_used_when_published_missing() {
            let updated = Utc.with_ymd_and_hms(2024, 12, 10, 12, 0, 0).unwrap();
            let item = RawItem {
                guid: Some("x".to_string()),
                updated: Some(updated),
                ..Default::default()
            };

            let items = normalize(vec![item], "a.com");
            assert_eq!(items[0].published_at, updated);
        }

        #[test]
        fn test_normalize_is_deterministic() {
            let make = || {
                vec![
                    raw(Some("a"), Some("https://a.com/1"), Some("One")),
                    raw(None, None, None),
                ]
            };

            let first = normalize(make(), "a.com");
            let second = normalize(make(), "a.com");
            assert_eq!(first, second);
        }
    }

    mod from_entry_tests {
        use super::*;

        #[test]
        fn test_entry_guid_and_link_extracted() {
            let entry = create_test_entry("guid-123", vec!["https://example.com/article"]);
            let item = RawItem::from_entry(entry);

            assert_eq!(item.guid, Some("guid-123".to_string()));
            assert_eq!(item.link, Some("https://example.com/article".to_string()));
            assert_eq!(item.title, None);
        }

        #[test]
        fn test_blank_entry_id_treated_as_absent() {
            let entry = create_test_entry("  ", vec!["https://example.com/article"]);
            let item = RawItem::from_entry(entry);

            assert_eq!(item.guid, None);
        }

        #[test]
        fn test_entry_without_links() {
            let entry = create_test_entry("guid-123", vec![]);
            let item = RawItem::from_entry(entry);

            assert_eq!(item.link, None);
        }
    }

    mod host_tests {
        use super::*;

        #[test]
        fn test_host_plain() {
            assert_eq!(host("https://example.com/feed.xml"), "example.com");
        }

        #[test]
        fn test_host_strips_www() {
            assert_eq!(host("https://www.theguardian.com/world/rss"), "theguardian.com");
        }

        #[test]
        fn test_host_ignores_port_and_path() {
            assert_eq!(host("http://news.example.com:8080/a/b?c=d"), "news.example.com");
        }

        #[test]
        fn test_host_unparseable_url() {
            assert_eq!(host("not a url"), "");
        }

        #[test]
        fn test_host_empty_input() {
            assert_eq!(host(""), "");
        }
    }
}
