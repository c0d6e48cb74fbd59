//! sitemap.xml and robots.txt rendering.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use fp_schemas::ALL_LOCALES;

pub const MAIN_PAGES: [&str; 3] = ["events", "places", "ads"];
pub const ROBOTS_DISALLOW: [&str; 5] = ["/api/", "/admin/", "/account/", "/_next/", "/auth/error"];

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub url: String,
    pub last_modified: DateTime<Utc>,
    pub change_frequency: &'static str,
    pub priority: f32,
}

/// Home and main pages per locale, then one entry per locale for every
/// published event and place.
pub fn sitemap_entries(
    base_url: &str,
    now: DateTime<Utc>,
    events: &[(Uuid, DateTime<Utc>)],
    places: &[(Uuid, DateTime<Utc>)],
) -> Vec<SitemapEntry> {
    let base = base_url.trim_end_matches('/');
    let mut out = Vec::with_capacity(ALL_LOCALES.len() * (1 + MAIN_PAGES.len() + events.len() + places.len()));

    for locale in ALL_LOCALES {
        out.push(SitemapEntry {
            url: format!("{base}/{}", locale.as_str()),
            last_modified: now,
            change_frequency: "daily",
            priority: 1.0,
        });
    }
    for locale in ALL_LOCALES {
        for page in MAIN_PAGES {
            out.push(SitemapEntry {
                url: format!("{base}/{}/{page}", locale.as_str()),
                last_modified: now,
                change_frequency: "hourly",
                priority: 0.8,
            });
        }
    }
    for (id, updated) in events {
        for locale in ALL_LOCALES {
            out.push(SitemapEntry {
                url: format!("{base}/{}/events/{id}", locale.as_str()),
                last_modified: *updated,
                change_frequency: "weekly",
                priority: 0.7,
            });
        }
    }
    for (id, updated) in places {
        for locale in ALL_LOCALES {
            out.push(SitemapEntry {
                url: format!("{base}/{}/places/{id}", locale.as_str()),
                last_modified: *updated,
                change_frequency: "weekly",
                priority: 0.6,
            });
        }
    }
    out
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn render_sitemap(entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for e in entries {
        xml.push_str(&format!(
            "<url>\n<loc>{}</loc>\n<lastmod>{}</lastmod>\n<changefreq>{}</changefreq>\n<priority>{:.1}</priority>\n</url>\n",
            xml_escape(&e.url),
            e.last_modified.to_rfc3339_opts(SecondsFormat::Millis, true),
            e.change_frequency,
            e.priority,
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

pub fn render_robots(base_url: &str) -> String {
    let mut out = String::from("User-Agent: *\nAllow: /\n");
    for path in ROBOTS_DISALLOW {
        out.push_str(&format!("Disallow: {path}\n"));
    }
    out.push_str(&format!(
        "\nSitemap: {}/sitemap.xml\n",
        base_url.trim_end_matches('/')
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn static_pages_for_every_locale() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let entries = sitemap_entries("https://fanplace.com/", now, &[], &[]);
        assert_eq!(entries.len(), 4 + 4 * 3);
        assert_eq!(entries[0].url, "https://fanplace.com/ko");
        assert_eq!(entries[0].priority, 1.0);
        assert!(entries.iter().any(|e| e.url == "https://fanplace.com/zh/ads"));
    }

    #[test]
    fn events_and_places_get_locale_urls() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let ev = Uuid::nil();
        let entries = sitemap_entries("https://fanplace.com", now, &[(ev, now)], &[(ev, now)]);
        let event_urls: Vec<_> = entries.iter().filter(|e| e.priority == 0.7).collect();
        let place_urls: Vec<_> = entries.iter().filter(|e| e.priority == 0.6).collect();
        assert_eq!(event_urls.len(), 4);
        assert_eq!(place_urls.len(), 4);
        assert_eq!(
            event_urls[1].url,
            format!("https://fanplace.com/en/events/{ev}")
        );
    }

    #[test]
    fn sitemap_xml_shape() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let xml = render_sitemap(&sitemap_entries("https://fanplace.com", now, &[], &[]));
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://fanplace.com/ja/places</loc>"));
        assert!(xml.contains("<lastmod>2025-03-01T12:00:00.000Z</lastmod>"));
        assert!(xml.contains("<priority>0.8</priority>"));
        assert!(xml.trim_end().ends_with("</urlset>"));
    }

    #[test]
    fn robots_lists_disallowed_paths_and_sitemap() {
        let txt = render_robots("https://fanplace.com");
        assert!(txt.contains("Disallow: /admin/\n"));
        assert!(txt.contains("Disallow: /auth/error\n"));
        assert!(txt.ends_with("Sitemap: https://fanplace.com/sitemap.xml\n"));
    }
}
