mod common;

use flowstore::{GroupStorage, StoreError};
use serde_json::json;

async fn test_groups() -> GroupStorage {
    GroupStorage::new(common::test_pool().await)
}

async fn user_count(pool: &sqlx::SqlitePool) -> i64 {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .unwrap();
    n
}

#[tokio::test]
async fn create_and_fetch_group_with_ordered_members() {
    let pool = common::test_pool().await;
    let groups = GroupStorage::new(pool.clone());

    let id = groups
        .create_group(&json!({
            "name": "Finance",
            "color": "#00aa88",
            "team_id": "team-1",
            "accept_any": 1,
            "members": [
                {"name": "Zoe", "email": "zoe@example.com"},
                {"name": "Adam", "email": " adam@example.com "},
            ],
        }))
        .await
        .unwrap();

    let group = groups.get_group(&id).await.unwrap().expect("group exists");
    assert_eq!(group.name, "Finance");
    assert_eq!(group.color, "#00aa88");
    assert_eq!(group.team_id.as_deref(), Some("team-1"));
    assert!(group.accept_any);
    let emails: Vec<_> = group.members.iter().map(|m| m.email.as_str()).collect();
    assert_eq!(emails, vec!["zoe@example.com", "adam@example.com"]);
    assert_eq!(user_count(&pool).await, 2);
}

#[tokio::test]
async fn users_are_shared_between_groups_by_email() {
    let pool = common::test_pool().await;
    let groups = GroupStorage::new(pool.clone());
    let member = json!({"name": "Kim", "email": "kim@example.com"});

    groups
        .create_group(&json!({"name": "Ops", "members": [member.clone()]}))
        .await
        .unwrap();
    groups
        .create_group(&json!({"name": "Sales", "members": [member]}))
        .await
        .unwrap();

    assert_eq!(user_count(&pool).await, 1);
    let listed = groups.list_groups().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|g| g.members.len() == 1));
}

#[tokio::test]
async fn update_replaces_memberships() {
    let groups = test_groups().await;
    let id = groups
        .create_group(&json!({
            "name": "Legal",
            "members": [{"name": "A", "email": "a@example.com"}, {"name": "B", "email": "b@example.com"}],
        }))
        .await
        .unwrap();

    groups
        .update_group(
            &id,
            &json!({"name": "Legal team", "members": [{"name": "C", "email": "c@example.com"}]}),
        )
        .await
        .unwrap();

    let group = groups.get_group(&id).await.unwrap().unwrap();
    assert_eq!(group.name, "Legal team");
    assert_eq!(group.color, "");
    assert!(!group.accept_any);
    assert_eq!(group.members.len(), 1);
    assert_eq!(group.members[0].email, "c@example.com");
}

#[tokio::test]
async fn update_of_unknown_group_is_not_found() {
    let groups = test_groups().await;
    let err = groups
        .update_group("missing", &json!({"name": "Nobody"}))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn invalid_member_rejects_create() {
    let groups = test_groups().await;
    let err = groups
        .create_group(&json!({"name": "Broken", "members": [{"name": "No mail"}]}))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(groups.list_groups().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_group_keeps_users() {
    let pool = common::test_pool().await;
    let groups = GroupStorage::new(pool.clone());
    let id = groups
        .create_group(&json!({"name": "Temp", "members": [{"email": "t@example.com"}]}))
        .await
        .unwrap();

    assert!(groups.delete_group(&id).await.unwrap());
    assert!(groups.get_group(&id).await.unwrap().is_none());
    assert!(!groups.delete_group(&id).await.unwrap());

    let (links,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM group_members")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(links, 0);
    assert_eq!(user_count(&pool).await, 1);
}
