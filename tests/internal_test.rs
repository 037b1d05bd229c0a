mod common;

use serde_json::{json, Value};
use taskboard_notify::config::internal::InternalApiConfig;
use taskboard_notify::middleware::internal::INTERNAL_TOKEN_HEADER;
use taskboard_notify::models::NotificationType;
use taskboard_notify::store::NotificationStore;
use uuid::Uuid;

#[tokio::test]
async fn fan_out_creates_one_row_per_distinct_recipient() {
    let app = common::spawn_app().await;
    let (x, x_token) = app.user();
    let (y, _) = app.user();

    let resp = app
        .client
        .post(app.internal_url("/notifications/fan-out"))
        .header(INTERNAL_TOKEN_HEADER, common::INTERNAL_TOKEN)
        .json(&json!({
            "type": "project_update",
            "message": "Project \"Apollo\" was archived",
            "entityType": "project",
            "entityId": "p-42",
            "targetUserIds": [x, y, x],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    assert_eq!(app.store.len(), 2);
    assert_eq!(app.store.count(x).await.unwrap(), 1);
    assert_eq!(app.store.count(y).await.unwrap(), 1);

    let resp = app
        .client
        .get(app.url("/notifications"))
        .bearer_auth(&x_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let row = &body["notifications"][0];
    assert_eq!(row["type"], "project_update");
    assert_eq!(row["message"], "Project \"Apollo\" was archived");
    assert_eq!(row["entityId"], "p-42");
    assert_eq!(row["isRead"], false);
}

#[tokio::test]
async fn fan_out_to_nobody_is_accepted() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.internal_url("/notifications/fan-out"))
        .header(INTERNAL_TOKEN_HEADER, common::INTERNAL_TOKEN)
        .json(&json!({ "type": "mention", "message": "hi", "targetUserIds": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn fan_out_rejects_empty_message() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.internal_url("/notifications/fan-out"))
        .header(INTERNAL_TOKEN_HEADER, common::INTERNAL_TOKEN)
        .json(&json!({ "type": "mention", "message": "", "targetUserIds": [Uuid::new_v4()] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn internal_routes_require_the_token() {
    let app = common::spawn_app().await;
    let body = json!({ "type": "mention", "message": "hi", "targetUserIds": [Uuid::new_v4()] });

    let resp = app
        .client
        .post(app.internal_url("/notifications/fan-out"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = app
        .client
        .post(app.internal_url("/notifications/fan-out"))
        .header(INTERNAL_TOKEN_HEADER, "wrong-token")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // A user session is not a substitute.
    let (_, token) = app.user();
    let resp = app
        .client
        .post(app.internal_url("/notifications/fan-out"))
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    assert!(app.store.is_empty());
}

#[tokio::test]
async fn internal_routes_are_absent_without_a_token() {
    let app = common::spawn_app_with(InternalApiConfig::default()).await;

    let resp = app
        .client
        .post(app.internal_url("/notifications/fan-out"))
        .header(INTERNAL_TOKEN_HEADER, common::INTERNAL_TOKEN)
        .json(&json!({ "type": "mention", "message": "hi", "targetUserIds": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn entity_cleanup_by_type_and_in_full() {
    let app = common::spawn_app().await;
    let (user, _) = app.user();
    // All seeded rows reference task-0..task-n by creation offset.
    app.insert(user, NotificationType::Comment, "c1", 1);
    app.insert(user, NotificationType::Assignment, "a1", 1);
    app.insert(user, NotificationType::Comment, "c2", 2);

    let resp = app
        .client
        .delete(app.internal_url("/notifications/by-entity/task/task-1?type=comment"))
        .header(INTERNAL_TOKEN_HEADER, common::INTERNAL_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "success": true, "deletedCount": 1 }));

    let resp = app
        .client
        .delete(app.internal_url("/notifications/by-entity/task/task-1"))
        .header(INTERNAL_TOKEN_HEADER, common::INTERNAL_TOKEN)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["deletedCount"], 1);

    assert_eq!(app.store.len(), 1);
    let remaining = app
        .store
        .list(user, Default::default(), 1, 10)
        .await
        .unwrap()
        .0;
    assert_eq!(remaining[0].message, "c2");
}
