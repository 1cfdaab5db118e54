mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn archived_and_tag_filters_select_the_right_notes() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (token, _) = common::register_account(&client, &server.base_url, "filters").await?;

    // Two tagged "work", one archived
    common::create_note(
        &client,
        &server.base_url,
        &token,
        json!({ "title": "standup", "content": "notes", "tags": ["work"] }),
    )
    .await?;
    common::create_note(
        &client,
        &server.base_url,
        &token,
        json!({ "title": "retro", "content": "notes", "tags": ["work"] }),
    )
    .await?;
    common::create_note(
        &client,
        &server.base_url,
        &token,
        json!({ "title": "old plans", "content": "notes", "isArchived": true }),
    )
    .await?;

    let res = client
        .get(format!("{}/notes?archived=true", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    let notes = body["data"]["notes"].as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["title"], "old plans");

    let res = client
        .get(format!("{}/notes?tags=work", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["notes"].as_array().unwrap().len(), 2);

    // Any-of: either tag qualifies
    let res = client
        .get(format!("{}/notes?tags=work,missing", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["notes"].as_array().unwrap().len(), 2);

    // A tags filter that cleans down to nothing is omitted entirely
    let res = client
        .get(format!("{}/notes?tags=%20,%20", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["notes"].as_array().unwrap().len(), 3);
    Ok(())
}

#[tokio::test]
async fn search_matches_title_and_content() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (token, _) = common::register_account(&client, &server.base_url, "search").await?;

    common::create_note(
        &client,
        &server.base_url,
        &token,
        json!({ "title": "Groceries", "content": "eggs and milk" }),
    )
    .await?;
    common::create_note(
        &client,
        &server.base_url,
        &token,
        json!({ "title": "Errands", "content": "pick up groceries after work" }),
    )
    .await?;
    common::create_note(
        &client,
        &server.base_url,
        &token,
        json!({ "title": "Laundry", "content": "whites only" }),
    )
    .await?;

    let res = client
        .get(format!("{}/notes?search=groceries", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["notes"].as_array().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn tags_are_sanitized_on_create_and_update() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (token, _) = common::register_account(&client, &server.base_url, "tags").await?;

    let note = common::create_note(
        &client,
        &server.base_url,
        &token,
        json!({ "title": "tagged", "content": "body", "tags": ["a", "", "   ", "b"] }),
    )
    .await?;
    assert_eq!(note["tags"], json!(["a", "b"]));

    let res = client
        .patch(format!("{}/notes/{}", server.base_url, note["id"].as_str().unwrap()))
        .bearer_auth(&token)
        .json(&json!({ "tags": ["  c  ", "", "d"] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["tags"], json!(["c", "d"]));
    Ok(())
}

#[tokio::test]
async fn owner_comes_from_the_token_not_the_body() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (token, account) = common::register_account(&client, &server.base_url, "owner").await?;

    // The body tries to plant a different owner; it is ignored
    let note = common::create_note(
        &client,
        &server.base_url,
        &token,
        json!({
            "title": "mine",
            "content": "body",
            "ownerId": uuid::Uuid::new_v4().to_string(),
        }),
    )
    .await?;

    assert_eq!(note["ownerId"], account["id"]);
    Ok(())
}

#[tokio::test]
async fn cross_account_access_is_an_indistinguishable_404() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let (owner_token, _) = common::register_account(&client, &server.base_url, "victim").await?;
    let (intruder_token, _) = common::register_account(&client, &server.base_url, "intruder").await?;

    let note = common::create_note(
        &client,
        &server.base_url,
        &owner_token,
        json!({ "title": "secret", "content": "do not share" }),
    )
    .await?;
    let note_id = note["id"].as_str().unwrap();
    let note_url = format!("{}/notes/{}", server.base_url, note_id);
    let missing_url = format!("{}/notes/{}", server.base_url, uuid::Uuid::new_v4());

    // Get, update and delete on someone else's note all 404
    let res = client.get(&note_url).bearer_auth(&intruder_token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let foreign: Value = res.json().await?;

    let res = client
        .patch(&note_url)
        .bearer_auth(&intruder_token)
        .json(&json!({ "title": "hijacked" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.delete(&note_url).bearer_auth(&intruder_token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Identical body for a genuinely nonexistent id
    let res = client.get(&missing_url).bearer_auth(&intruder_token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let nonexistent: Value = res.json().await?;
    assert_eq!(foreign, nonexistent);

    // The note is unchanged and still reachable by its owner
    let res = client.get(&note_url).bearer_auth(&owner_token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["title"], "secret");
    Ok(())
}

#[tokio::test]
async fn listing_never_leaks_other_accounts_notes() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let (token_a, account_a) = common::register_account(&client, &server.base_url, "lister-a").await?;
    let (token_b, _) = common::register_account(&client, &server.base_url, "lister-b").await?;

    common::create_note(
        &client,
        &server.base_url,
        &token_a,
        json!({ "title": "a's note", "content": "body" }),
    )
    .await?;
    common::create_note(
        &client,
        &server.base_url,
        &token_b,
        json!({ "title": "b's note", "content": "body" }),
    )
    .await?;

    let res = client
        .get(format!("{}/notes", server.base_url))
        .bearer_auth(&token_a)
        .send()
        .await?;
    let body: Value = res.json().await?;
    let notes = body["data"]["notes"].as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["ownerId"], account_a["id"]);
    Ok(())
}

#[tokio::test]
async fn pagination_metadata_follows_the_law() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (token, _) = common::register_account(&client, &server.base_url, "pager").await?;

    for i in 0..15 {
        common::create_note(
            &client,
            &server.base_url,
            &token,
            json!({ "title": format!("note {}", i), "content": "body" }),
        )
        .await?;
    }

    let res = client
        .get(format!("{}/notes?page=1&limit=10", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    let body: Value = res.json().await?;
    let data = &body["data"];
    assert_eq!(data["notes"].as_array().unwrap().len(), 10);
    assert_eq!(data["currentPage"], 1);
    assert_eq!(data["totalPages"], 2);
    assert_eq!(data["totalNotes"], 15);
    assert_eq!(data["hasNext"], true);
    assert_eq!(data["hasPrev"], false);

    // Newest first
    assert_eq!(data["notes"][0]["title"], "note 14");

    let res = client
        .get(format!("{}/notes?page=2&limit=10", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    let body: Value = res.json().await?;
    let data = &body["data"];
    assert_eq!(data["notes"].as_array().unwrap().len(), 5);
    assert_eq!(data["hasNext"], false);
    assert_eq!(data["hasPrev"], true);

    // Zero matches: zero pages, both flags false
    let res = client
        .get(format!("{}/notes?tags=no-such-tag", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    let body: Value = res.json().await?;
    let data = &body["data"];
    assert_eq!(data["totalNotes"], 0);
    assert_eq!(data["totalPages"], 0);
    assert_eq!(data["hasNext"], false);
    assert_eq!(data["hasPrev"], false);
    Ok(())
}

#[tokio::test]
async fn update_merges_partially_and_rejects_empty_bodies() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (token, _) = common::register_account(&client, &server.base_url, "updater").await?;

    let note = common::create_note(
        &client,
        &server.base_url,
        &token,
        json!({ "title": "draft", "content": "original body", "tags": ["keep"] }),
    )
    .await?;
    let url = format!("{}/notes/{}", server.base_url, note["id"].as_str().unwrap());

    // Only the title changes
    let res = client
        .patch(&url)
        .bearer_auth(&token)
        .json(&json!({ "title": "final" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["title"], "final");
    assert_eq!(body["data"]["content"], "original body");
    assert_eq!(body["data"]["tags"], json!(["keep"]));

    // A body with zero recognized fields is rejected before the store
    let res = client
        .patch(&url)
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "no updates provided");

    // PUT shares the partial-merge semantics
    let res = client
        .put(&url)
        .bearer_auth(&token)
        .json(&json!({ "isArchived": true }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["isArchived"], true);
    assert_eq!(body["data"]["title"], "final");
    Ok(())
}

#[tokio::test]
async fn note_validation_enforces_length_limits() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (token, _) = common::register_account(&client, &server.base_url, "limits").await?;

    let res = client
        .post(format!("{}/notes", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "title": "x".repeat(201), "content": "fine" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert!(body["fieldErrors"]["title"].is_string());

    let res = client
        .post(format!("{}/notes", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "title": "fine", "content": "", "tags": ["z".repeat(31)] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert!(body["fieldErrors"]["content"].is_string());
    assert!(body["fieldErrors"]["tags"].is_string());
    Ok(())
}

#[tokio::test]
async fn delete_removes_the_note_for_its_owner() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (token, _) = common::register_account(&client, &server.base_url, "deleter").await?;

    let note = common::create_note(
        &client,
        &server.base_url,
        &token,
        json!({ "title": "ephemeral", "content": "body" }),
    )
    .await?;
    let url = format!("{}/notes/{}", server.base_url, note["id"].as_str().unwrap());

    let res = client.delete(&url).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(&url).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Deleting again is the same 404
    let res = client.delete(&url).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
