/// SQLite persistence for groups and their members
///
/// Users are shared across groups and deduplicated by email. Membership is
/// replaced wholesale on update, inside the same transaction as the group row.

use crate::error::{StoreError, StoreResult};
use crate::group::types::{Group, GroupDraft, Member};
use crate::storage::codec::now_timestamp;
use crate::storage::rollback;
use serde_json::Value;
use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;

#[derive(Debug, Clone, sqlx::FromRow)]
struct GroupRow {
    id: String,
    name: String,
    color: String,
    team_id: Option<String>,
    accept_any: bool,
    created_at: Option<String>,
    updated_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GroupStorage {
    pool: SqlitePool,
}

impl GroupStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        let rows: Vec<GroupRow> = sqlx::query_as(
            "SELECT id, name, color, team_id, accept_any, created_at, updated_at \
             FROM flow_groups ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            let members = self.load_members(&row.id).await?;
            groups.push(into_group(row, members));
        }
        Ok(groups)
    }

    pub async fn get_group(&self, id: &str) -> StoreResult<Option<Group>> {
        let row: Option<GroupRow> = sqlx::query_as(
            "SELECT id, name, color, team_id, accept_any, created_at, updated_at \
             FROM flow_groups WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let members = self.load_members(&row.id).await?;
                Ok(Some(into_group(row, members)))
            }
            None => Ok(None),
        }
    }

    pub async fn create_group(&self, body: &Value) -> StoreResult<String> {
        let draft = GroupDraft::from_body(body)?;
        let id = uuid::Uuid::new_v4().to_string();

        let mut tx = self.pool.begin().await?;
        let result: StoreResult<()> = async {
            let now = now_timestamp();
            sqlx::query(
                "INSERT INTO flow_groups (id, name, color, team_id, accept_any, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(&draft.name)
            .bind(&draft.color)
            .bind(&draft.team_id)
            .bind(draft.accept_any)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            link_members(&mut *tx, &id, &draft.members).await
        }
        .await;

        match result {
            Ok(()) => {
                tx.commit().await?;
                tracing::info!("👥 Created group: {} ({}) with {} members", id, draft.name, draft.members.len());
                Ok(id)
            }
            Err(e) => {
                rollback(tx, "create group", &e).await;
                Err(e)
            }
        }
    }

    /// Update a group and replace all of its memberships
    pub async fn update_group(&self, id: &str, body: &Value) -> StoreResult<()> {
        let draft = GroupDraft::from_body(body)?;

        let mut tx = self.pool.begin().await?;
        let result: StoreResult<()> = async {
            let updated = sqlx::query(
                "UPDATE flow_groups SET name = ?, color = ?, team_id = ?, accept_any = ?, updated_at = ? \
                 WHERE id = ?",
            )
            .bind(&draft.name)
            .bind(&draft.color)
            .bind(&draft.team_id)
            .bind(draft.accept_any)
            .bind(now_timestamp())
            .bind(id)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(StoreError::not_found(format!("Group not found: {id}")));
            }

            sqlx::query("DELETE FROM group_members WHERE group_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            link_members(&mut *tx, id, &draft.members).await
        }
        .await;

        match result {
            Ok(()) => {
                tx.commit().await?;
                tracing::info!("👥 Updated group: {} ({})", id, draft.name);
                Ok(())
            }
            Err(e) => {
                rollback(tx, &format!("update group {id}"), &e).await;
                Err(e)
            }
        }
    }

    /// Delete a group; memberships cascade, users are kept
    pub async fn delete_group(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM flow_groups WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn load_members(&self, group_id: &str) -> StoreResult<Vec<Member>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT u.name, u.email FROM group_members gm \
             JOIN users u ON u.id = gm.user_id \
             WHERE gm.group_id = ? ORDER BY gm.position",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, email)| Member { name, email })
            .collect())
    }
}

fn into_group(row: GroupRow, members: Vec<Member>) -> Group {
    Group {
        id: row.id,
        name: row.name,
        color: row.color,
        team_id: row.team_id,
        accept_any: row.accept_any,
        members,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

async fn link_members(conn: &mut SqliteConnection, group_id: &str, members: &[Member]) -> StoreResult<()> {
    for (position, member) in members.iter().enumerate() {
        let user_id = find_or_create_user(conn, member).await?;
        sqlx::query(
            "INSERT OR IGNORE INTO group_members (group_id, user_id, position) VALUES (?, ?, ?)",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Look up a user by email, creating it on first sight
async fn find_or_create_user(conn: &mut SqliteConnection, member: &Member) -> StoreResult<i64> {
    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(&member.email)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some((id,)) = existing {
        return Ok(id);
    }

    let created = sqlx::query("INSERT INTO users (name, email) VALUES (?, ?)")
        .bind(&member.name)
        .bind(&member.email)
        .execute(&mut *conn)
        .await?;

    tracing::debug!("👤 Created user for {}", member.email);
    Ok(created.last_insert_rowid())
}
