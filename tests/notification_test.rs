mod common;

use serde_json::{json, Value};
use taskboard_notify::models::NotificationType;
use taskboard_notify::store::NotificationStore;

fn ids(body: &Value) -> Vec<String> {
    body["notifications"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|n| n["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn list_requires_authentication() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url("/notifications"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Not authenticated");

    let resp = app
        .client
        .get(app.url("/notifications"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let app = common::spawn_app().await;
    let (user, token) = app.user();
    app.seed(user, NotificationType::Mention, 1);

    let resp = app
        .client
        .get(app.url("/notifications/stats"))
        .header("Cookie", format!("theme=dark; session_token={}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn list_empty() {
    let app = common::spawn_app().await;
    let (_, token) = app.user();

    let resp = app
        .client
        .get(app.url("/notifications"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["notifications"], json!([]));
    assert_eq!(body["unreadCount"], 0);
    assert_eq!(
        body["pagination"],
        json!({"page": 1, "limit": 20, "totalCount": 0, "totalPages": 0, "hasNext": false})
    );
}

#[tokio::test]
async fn list_is_newest_first_and_paginated() {
    let app = common::spawn_app().await;
    let (user, token) = app.user();
    let seeded = app.seed(user, NotificationType::Comment, 5);

    let resp = app
        .client
        .get(app.url("/notifications?page=1&limit=2"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        ids(&body),
        vec![seeded[0].to_string(), seeded[1].to_string()]
    );
    assert_eq!(body["pagination"]["totalCount"], 5);
    assert_eq!(body["pagination"]["totalPages"], 3);
    assert_eq!(body["pagination"]["hasNext"], true);

    let resp = app
        .client
        .get(app.url("/notifications?page=3&limit=2"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(ids(&body), vec![seeded[4].to_string()]);
    assert_eq!(body["pagination"]["hasNext"], false);

    let first = &body["notifications"][0];
    assert_eq!(first["type"], "comment");
    assert_eq!(first["isRead"], false);
    assert_eq!(first["entityType"], "task");
    assert!(first.get("userId").is_none());
}

#[tokio::test]
async fn garbage_query_values_fall_back_to_defaults() {
    let app = common::spawn_app().await;
    let (user, token) = app.user();
    app.seed(user, NotificationType::Mention, 3);

    let resp = app
        .client
        .get(app.url("/notifications?page=abc&limit=999&unread=yes&type=reaction"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 50);
    assert_eq!(ids(&body).len(), 3);
}

#[tokio::test]
async fn page_past_the_offset_range_is_clamped() {
    let app = common::spawn_app().await;
    let (user, token) = app.user();
    app.seed(user, NotificationType::Mention, 2);

    let resp = app
        .client
        .get(app.url("/notifications?page=18446744073709551615&limit=50"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["pagination"]["page"],
        taskboard_notify::services::notification::MAX_PAGE
    );
    assert_eq!(body["pagination"]["hasNext"], false);
    assert!(ids(&body).is_empty());
}

#[tokio::test]
async fn unread_count_is_global_regardless_of_filters() {
    let app = common::spawn_app().await;
    let (user, token) = app.user();
    app.seed(user, NotificationType::Comment, 3);
    let mentions = app.seed(user, NotificationType::Mention, 2);

    app.client
        .patch(app.url(&format!("/notifications/{}", mentions[0])))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    let expected = app.store.count_unread(user).await.unwrap();
    assert_eq!(expected, 4);

    for query in [
        "",
        "?unread=true",
        "?type=mention",
        "?type=assignment",
        "?page=7&limit=1",
        "?unread=true&type=comment&limit=1",
    ] {
        let resp = app
            .client
            .get(app.url(&format!("/notifications{}", query)))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["unreadCount"], expected, "query {:?}", query);
    }

    let resp = app
        .client
        .get(app.url("/notifications?unread=true&type=mention"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["pagination"]["totalCount"], 1);
    assert_eq!(ids(&body), vec![mentions[1].to_string()]);
}

#[tokio::test]
async fn mark_read_twice_is_idempotent() {
    let app = common::spawn_app().await;
    let (user, token) = app.user();
    let id = app.seed(user, NotificationType::Assignment, 1)[0];

    for _ in 0..2 {
        let resp = app
            .client
            .patch(app.url(&format!("/notifications/{}", id)))
            .bearer_auth(&token)
            .json(&json!({ "isRead": true }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["id"], id.to_string());
        assert_eq!(body["isRead"], true);
    }
}

#[tokio::test]
async fn mark_read_cannot_unread() {
    let app = common::spawn_app().await;
    let (user, token) = app.user();
    let id = app.seed(user, NotificationType::Assignment, 1)[0];

    let resp = app
        .client
        .patch(app.url(&format!("/notifications/{}", id)))
        .bearer_auth(&token)
        .json(&json!({ "isRead": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(app.store.count_unread(user).await.unwrap(), 1);
}

#[tokio::test]
async fn other_users_notifications_are_not_found() {
    let app = common::spawn_app().await;
    let (owner, _) = app.user();
    let (intruder, intruder_token) = app.user();
    let id = app.seed(owner, NotificationType::Comment, 1)[0];
    app.seed(intruder, NotificationType::Comment, 3);

    let resp = app
        .client
        .patch(app.url(&format!("/notifications/{}", id)))
        .bearer_auth(&intruder_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let foreign: Value = resp.json().await.unwrap();

    let resp = app
        .client
        .delete(app.url(&format!("/notifications/{}", id)))
        .bearer_auth(&intruder_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Same answer as for an id that never existed.
    let resp = app
        .client
        .patch(app.url(&format!("/notifications/{}", uuid::Uuid::new_v4())))
        .bearer_auth(&intruder_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let missing: Value = resp.json().await.unwrap();
    assert_eq!(foreign, missing);

    let resp = app
        .client
        .get(app.url("/notifications"))
        .bearer_auth(&intruder_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(!ids(&body).contains(&id.to_string()));

    let row = app.store.find_by_id(id).await.unwrap().unwrap();
    assert!(!row.is_read);
}

#[tokio::test]
async fn malformed_id_is_not_found() {
    let app = common::spawn_app().await;
    let (_, token) = app.user();

    let resp = app
        .client
        .delete(app.url("/notifications/12345"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn stats_and_mark_all_scenario() {
    let app = common::spawn_app().await;
    let (user, token) = app.user();
    app.seed(user, NotificationType::Comment, 2);
    app.seed(user, NotificationType::Assignment, 1);
    let mentions = app.seed(user, NotificationType::Mention, 2);
    for id in &mentions {
        app.client
            .patch(app.url(&format!("/notifications/{}", id)))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
    }

    let resp = app
        .client
        .get(app.url("/notifications/stats"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({"total": 5, "unread": 3, "unreadByType": {"comment": 2, "assignment": 1}})
    );

    let resp = app
        .client
        .patch(app.url("/notifications/read-all"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({"success": true, "updatedCount": 3, "unreadCount": 0})
    );

    let resp = app
        .client
        .get(app.url("/notifications/stats"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"total": 5, "unread": 0, "unreadByType": {}}));
}

#[tokio::test]
async fn mark_all_twice_converges() {
    let app = common::spawn_app().await;
    let (user, token) = app.user();
    app.seed(user, NotificationType::TaskUpdate, 4);

    let mut counts = Vec::new();
    for _ in 0..2 {
        let resp = app
            .client
            .patch(app.url("/notifications/read-all"))
            .bearer_auth(&token)
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        counts.push((body["updatedCount"].clone(), body["unreadCount"].clone()));
    }
    assert_eq!(counts, vec![(json!(4), json!(0)), (json!(0), json!(0))]);
}

#[tokio::test]
async fn mark_all_by_type_leaves_other_types() {
    let app = common::spawn_app().await;
    let (user, token) = app.user();
    app.seed(user, NotificationType::Comment, 2);
    app.seed(user, NotificationType::ProjectUpdate, 3);

    let resp = app
        .client
        .patch(app.url("/notifications/read-all"))
        .bearer_auth(&token)
        .json(&json!({ "type": "project_update" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["updatedCount"], 3);
    assert_eq!(body["unreadCount"], 2);

    // Unknown types are ignored, so this marks everything.
    let resp = app
        .client
        .patch(app.url("/notifications/read-all"))
        .bearer_auth(&token)
        .json(&json!({ "type": "reaction" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["updatedCount"], 2);
    assert_eq!(body["unreadCount"], 0);
}

#[tokio::test]
async fn delete_removes_the_row() {
    let app = common::spawn_app().await;
    let (user, token) = app.user();
    let seeded = app.seed(user, NotificationType::Mention, 2);

    let resp = app
        .client
        .delete(app.url(&format!("/notifications/{}", seeded[0])))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "success": true }));

    let resp = app
        .client
        .delete(app.url(&format!("/notifications/{}", seeded[0])))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    assert_eq!(app.store.count(user).await.unwrap(), 1);
}
