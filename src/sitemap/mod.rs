// XML sitemaps built from the search index.
//
// `/sitemap.xml` is an index pointing at one sitemap per catalog page;
// every page lists at most `asset_limit` searchable assets.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{json, Value};

use crate::config::AppConfig;

pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
pub const IMAGE_NAMESPACE: &str = "http://www.google.com/schemas/sitemap-image/1.1";
pub const VIDEO_NAMESPACE: &str = "http://www.google.com/schemas/sitemap-video/1.1";

/// Size of the image linked from every sitemap entry.
const SITEMAP_IMAGE_SIZE: u32 = 1200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogBucket {
    pub key: String,
    pub doc_count: u64,
}

/// Searchable documents per catalog.
pub fn index_query() -> Value {
    json!({
        "size": 0,
        "aggs": {
            "searchable": {
                "filter": { "term": { "is_searchable": true } },
                "aggs": {
                    "catalogs": { "terms": { "field": "catalog" } }
                }
            }
        }
    })
}

/// One page of searchable assets in a catalog, ordered by id.
pub fn catalog_query(catalog: &str, offset: u64, limit: u64) -> Value {
    json!({
        "size": limit,
        "from": offset.saturating_mul(limit),
        "sort": [{ "id": "asc" }],
        "query": {
            "bool": {
                "filter": [
                    { "match": { "catalog": catalog } },
                    { "match": { "is_searchable": true } }
                ]
            }
        }
    })
}

pub fn parse_catalog_buckets(aggregations: &Value) -> Vec<CatalogBucket> {
    aggregations
        .pointer("/searchable/catalogs/buckets")
        .and_then(Value::as_array)
        .map(|buckets| {
            buckets
                .iter()
                .filter_map(|bucket| {
                    let key = match bucket.get("key")? {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    let doc_count = bucket.get("doc_count")?.as_u64()?;
                    Some(CatalogBucket { key, doc_count })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Number of sitemap pages needed for `doc_count` assets.
pub fn page_count(doc_count: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    doc_count.div_ceil(limit)
}

/// Offset query parameter; anything unparseable or negative is page 0.
pub fn parse_offset(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n >= 0)
        .map(|n| n as u64)
        .unwrap_or(0)
}

pub fn render_index(scheme: &str, host: &str, buckets: &[CatalogBucket], limit: u64) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push_str(&format!(r#"<sitemapindex xmlns="{}">"#, SITEMAP_NAMESPACE));

    for bucket in buckets {
        for page in 0..page_count(bucket.doc_count, limit) {
            let loc = format!(
                "{}://{}/{}/sitemap.xml?offset={}",
                scheme,
                host,
                bucket.key.to_uppercase(),
                page
            );
            xml.push_str(&format!("<sitemap><loc>{}</loc></sitemap>", xml_escape(&loc)));
        }
    }

    xml.push_str("</sitemapindex>");
    xml
}

/// `<urlset>` for the `_source` documents of one catalog page.
pub fn render_urlset(scheme: &str, host: &str, sources: &[Value], config: &AppConfig) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!(
        "<urlset xmlns=\"{}\" xmlns:image=\"{}\" xmlns:video=\"{}\">\n",
        SITEMAP_NAMESPACE, IMAGE_NAMESPACE, VIDEO_NAMESPACE
    ));

    for source in sources {
        xml.push_str(&render_url(scheme, host, source, config));
    }

    xml.push_str("</urlset>");
    xml
}

fn render_url(scheme: &str, host: &str, source: &Value, config: &AppConfig) -> String {
    let catalog = string_field(source, "catalog");
    let id = string_field(source, "id");
    let title = string_field(source, "short_title");
    let description = string_field(source, "description");
    let license_url = crate::imaging::license_id(source)
        .and_then(|id| config.license_url(id))
        .unwrap_or("");

    let url = format!("{}://{}/{}/{}", scheme, host, catalog, id);

    let mut entry = String::from("<url>\n");
    entry.push_str(&format!("  <loc>{}</loc>\n", xml_escape(&url)));
    entry.push_str("  <changefreq>weekly</changefreq>\n");
    if let Some(lastmod) = source.get("modification_time").and_then(format_lastmod) {
        entry.push_str(&format!("  <lastmod>{}</lastmod>\n", lastmod));
    }
    entry.push_str("  <image:image>\n");
    entry.push_str(&format!(
        "    <image:loc>{}/image/{}</image:loc>\n",
        xml_escape(&url),
        SITEMAP_IMAGE_SIZE
    ));
    entry.push_str(&format!("    <image:title>{}</image:title>\n", cdata(&title)));
    entry.push_str(&format!("    <image:caption>{}</image:caption>\n", cdata(&description)));
    entry.push_str(&format!("    <image:license>{}</image:license>\n", xml_escape(license_url)));
    entry.push_str("  </image:image>\n");
    entry.push_str("</url>\n");
    entry
}

fn string_field(source: &Value, key: &str) -> String {
    match source.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// ISO-8601 UTC with milliseconds, from epoch millis or a date string.
pub fn format_lastmod(value: &Value) -> Option<String> {
    let timestamp: DateTime<Utc> = match value {
        Value::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single()?,
        Value::String(s) => parse_date(s)?,
        _ => return None,
    };
    Some(timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub fn xml_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// CDATA section; a literal `]]>` is split across two sections.
pub fn cdata(raw: &str) -> String {
    format!("<![CDATA[{}]]>", raw.replace("]]>", "]]]]><![CDATA[>"))
}
