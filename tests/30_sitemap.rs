mod common;

use anyhow::Result;
use reqwest::{header, StatusCode};

#[tokio::test]
async fn sitemap_index_lists_catalog_pages() -> Result<()> {
    let app = common::spawn_app().await?;

    let res = app
        .client
        .get(app.url("/sitemap.xml"))
        .header("x-forwarded-host", "www.kbharkiv.dk")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()[header::CONTENT_TYPE].to_str()?.starts_with("text/xml"));

    let xml = res.text().await?;
    assert!(xml.contains("<sitemapindex"));
    assert!(xml.contains("<loc>http://www.kbharkiv.dk/KBH-MUSEUM/sitemap.xml?offset=0</loc>"));
    assert!(xml.contains("<loc>http://www.kbharkiv.dk/KBH-ARKIV/sitemap.xml?offset=0</loc>"));
    assert!(!xml.contains("offset=1"));
    Ok(())
}

#[tokio::test]
async fn sitemap_index_paginates_large_catalogs() -> Result<()> {
    let app = common::spawn_app_with(|config| config.sitemap.asset_limit = 1).await?;

    let xml = app.get("/sitemap.xml").await?.text().await?;
    // Two searchable assets in kbh-museum, one in kbh-arkiv
    assert!(xml.contains("/KBH-MUSEUM/sitemap.xml?offset=1"));
    assert!(!xml.contains("/KBH-MUSEUM/sitemap.xml?offset=2"));
    assert!(!xml.contains("/KBH-ARKIV/sitemap.xml?offset=1"));
    Ok(())
}

#[tokio::test]
async fn catalog_sitemap_lists_assets_with_images() -> Result<()> {
    let app = common::spawn_app().await?;

    let res = app.get("/KBH-MUSEUM/sitemap.xml?offset=0").await?;
    assert_eq!(res.status(), StatusCode::OK);
    let xml = res.text().await?;

    let host = app.base_url.trim_start_matches("http://");
    assert!(xml.contains(&format!("<loc>http://{}/kbh-museum/26893</loc>", host)));
    assert!(xml.contains(&format!("<image:loc>http://{}/kbh-museum/26893/image/1200</image:loc>", host)));
    assert!(xml.contains("<image:title><![CDATA[Rundetårn]]></image:title>"));
    assert!(xml.contains("<lastmod>2016-05-10T12:00:00.000Z</lastmod>"));
    assert!(xml.contains("<image:license>https://creativecommons.org/licenses/by/4.0/</image:license>"));
    // Not searchable
    assert!(!xml.contains("Hidden"));
    Ok(())
}

#[tokio::test]
async fn catalog_sitemap_treats_bad_offset_as_first_page() -> Result<()> {
    let app = common::spawn_app().await?;

    let first = app.get("/kbh-museum/sitemap.xml").await?.text().await?;
    let bad = app.get("/kbh-museum/sitemap.xml?offset=-4").await?.text().await?;
    assert_eq!(first, bad);

    let beyond = app.get("/kbh-museum/sitemap.xml?offset=9").await?.text().await?;
    assert!(!beyond.contains("<url>"));
    Ok(())
}
