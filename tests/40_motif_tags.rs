mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn suggestions_are_translated_and_filtered() -> Result<()> {
    let app = common::spawn_app().await?;

    let res = app.get("/api/motif-tags/kbh-museum/26893/suggestions").await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<Value>().await?;
    // "himmel" is blacklisted; duplicates collapse; result is sorted
    assert_eq!(body, json!({ "tags": ["bygning", "gade", "rundetårn"] }));
    Ok(())
}

#[tokio::test]
async fn saving_tags_requires_a_session() -> Result<()> {
    let app = common::spawn_app().await?;

    let res = app
        .client
        .post(app.url("/api/motif-tags/kbh-museum/26893"))
        .json(&json!({ "tag": "kirke" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn saved_tags_show_up_in_typeahead() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.login().await?;

    let res = app
        .client
        .post(app.url("/api/motif-tags/kbh-museum/26893"))
        .bearer_auth(&token)
        .json(&json!({ "tag": ["Kirke", "kirketårn", " "] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["collection"], "kbh-museum");
    assert_eq!(body["id"], "26893");
    assert_eq!(body["tags"], json!(["kirke", "kirketårn"]));

    // Saving the same tag twice keeps one copy
    let res = app
        .client
        .post(app.url("/api/motif-tags/kbh-museum/26893"))
        .header("cookie", format!("collections_session={}", token))
        .json(&json!({ "tag": "kirke" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["tags"], json!(["kirke", "kirketårn"]));

    let document = app.upstream.document("kbh-museum-26893").unwrap();
    assert_eq!(document["tags"], json!(["tårn", "kirke", "kirketårn"]));

    let body = app.get("/api/motif-tags/typeahead?text=KIRKE").await?.json::<Value>().await?;
    assert_eq!(body, json!(["kirke", "kirketårn"]));

    // No text matches every known tag
    let body = app.get("/api/motif-tags/typeahead").await?.json::<Value>().await?;
    assert_eq!(body, json!(["kirke", "kirketårn", "tårn"]));
    Ok(())
}

#[tokio::test]
async fn typeahead_returns_a_bare_array() -> Result<()> {
    let app = common::spawn_app().await?;

    let res = app.get("/api/motif-tags/typeahead?text=t").await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?, json!(["tårn"]));

    let body = app.get("/api/motif-tags/typeahead?text=zz").await?.json::<Value>().await?;
    assert_eq!(body, json!([]));
    Ok(())
}

#[tokio::test]
async fn saving_tags_on_unknown_asset_is_not_found() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.login().await?;

    let res = app
        .client
        .post(app.url("/api/motif-tags/kbh-museum/404"))
        .bearer_auth(&token)
        .json(&json!({ "tag": "kirke" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn motif_tagging_can_be_switched_off() -> Result<()> {
    let app = common::spawn_app_with(|config| config.features.motif_tagging = false).await?;

    let res = app.get("/api/motif-tags/kbh-museum/26893/suggestions").await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
