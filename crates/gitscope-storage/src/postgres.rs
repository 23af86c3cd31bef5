//! `PostgreSQL` repositories
//!
//! Value objects are stored as JSONB next to a few scalar columns used for
//! lookups and ordering.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use gitscope_model::{Group, GroupEntity, ProjectEntity, ProjectRecord, Scores};
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::error::{StorageError, StorageErrorExt, StorageOperation, StorageResult};
use crate::traits::{GroupRepository, ProjectRepository};

const PROJECT_COLUMNS: &str =
    "id, name, full_name, group_id, stars, project, scores, indexed_at";

fn to_db_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_db_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: i64,
    name: String,
    full_name: String,
    group_id: Option<i64>,
    stars: i64,
    project: Json<ProjectRecord>,
    scores: Json<Scores>,
    indexed_at: DateTime<Utc>,
}

impl From<ProjectRow> for ProjectEntity {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            full_name: row.full_name,
            group_id: row.group_id,
            stars: from_db_count(row.stars),
            project: row.project.0,
            scores: row.scores.0,
            indexed_at: row.indexed_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: i64,
    name: String,
    full_name: String,
    stars: i64,
    group_data: Json<Group>,
    indexed_at: DateTime<Utc>,
}

impl From<GroupRow> for GroupEntity {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            full_name: row.full_name,
            stars: from_db_count(row.stars),
            group: row.group_data.0,
            indexed_at: row.indexed_at,
        }
    }
}

pub struct PgProjectRepository {
    pool: PgPool,
}

impl PgProjectRepository {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRepository for PgProjectRepository {
    async fn upsert(&self, entity: &ProjectEntity) -> StorageResult<()> {
        let operation = StorageOperation::UpsertProject { id: entity.id };

        sqlx::query(
            r"
            INSERT INTO projects
                (id, name, full_name, group_id, stars, activity, criticality, total_score,
                 project, scores, indexed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                full_name = EXCLUDED.full_name,
                group_id = EXCLUDED.group_id,
                stars = EXCLUDED.stars,
                activity = EXCLUDED.activity,
                criticality = EXCLUDED.criticality,
                total_score = EXCLUDED.total_score,
                project = EXCLUDED.project,
                scores = EXCLUDED.scores,
                indexed_at = EXCLUDED.indexed_at
            ",
        )
        .bind(entity.id)
        .bind(&entity.name)
        .bind(&entity.full_name)
        .bind(entity.group_id)
        .bind(to_db_count(entity.stars))
        .bind(entity.scores.activity.rank())
        .bind(entity.scores.criticality.rank())
        .bind(entity.scores.total)
        .bind(Json(&entity.project))
        .bind(Json(&entity.scores))
        .bind(entity.indexed_at)
        .execute(&self.pool)
        .await
        .map_db_err(operation)?;

        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<ProjectEntity>> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        let row = sqlx::query_as::<_, ProjectRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_db_err(StorageOperation::FindProject { id })?;

        Ok(row.map(ProjectEntity::from))
    }

    async fn find_all(&self) -> StorageResult<Vec<ProjectEntity>> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY id");
        let rows = sqlx::query_as::<_, ProjectRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_db_err(StorageOperation::FindAllProjects)?;

        Ok(rows.into_iter().map(ProjectEntity::from).collect())
    }

    async fn find_by_group(&self, group_id: i64) -> StorageResult<Vec<ProjectEntity>> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE group_id = $1 ORDER BY id");
        let rows = sqlx::query_as::<_, ProjectRow>(&query)
            .bind(group_id)
            .fetch_all(&self.pool)
            .await
            .map_db_err(StorageOperation::FindProjectsByGroup { group_id })?;

        Ok(rows.into_iter().map(ProjectEntity::from).collect())
    }

    async fn count_all(&self) -> StorageResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM projects")
            .fetch_one(&self.pool)
            .await
            .map_db_err(StorageOperation::CountProjects)?;

        let count: i64 = row.get("count");
        Ok(from_db_count(count))
    }

    fn stream_all_for_scoring(&self) -> BoxStream<'_, StorageResult<ProjectEntity>> {
        sqlx::query_as::<_, ProjectRow>(
            "SELECT id, name, full_name, group_id, stars, project, scores, indexed_at \
             FROM projects ORDER BY id",
        )
        .fetch(&self.pool)
        .map_ok(ProjectEntity::from)
        .map_err(|e| StorageError::query_failed(StorageOperation::StreamProjects, e))
        .boxed()
    }
}

pub struct PgGroupRepository {
    pool: PgPool,
}

impl PgGroupRepository {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn upsert(&self, entity: &GroupEntity) -> StorageResult<()> {
        sqlx::query(
            r"
            INSERT INTO groups (id, name, full_name, stars, criticality, group_data, indexed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                full_name = EXCLUDED.full_name,
                stars = EXCLUDED.stars,
                criticality = EXCLUDED.criticality,
                group_data = EXCLUDED.group_data,
                indexed_at = EXCLUDED.indexed_at
            ",
        )
        .bind(entity.id)
        .bind(&entity.name)
        .bind(&entity.full_name)
        .bind(to_db_count(entity.stars))
        .bind(entity.group.scores.criticality.rank())
        .bind(Json(&entity.group))
        .bind(entity.indexed_at)
        .execute(&self.pool)
        .await
        .map_db_err(StorageOperation::UpsertGroup { id: entity.id })?;

        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<GroupEntity>> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, full_name, stars, group_data, indexed_at FROM groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_db_err(StorageOperation::FindGroup { id })?;

        Ok(row.map(GroupEntity::from))
    }

    async fn find_all(&self) -> StorageResult<Vec<GroupEntity>> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, full_name, stars, group_data, indexed_at FROM groups ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_db_err(StorageOperation::FindAllGroups)?;

        Ok(rows.into_iter().map(GroupEntity::from).collect())
    }

    async fn count_all(&self) -> StorageResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM groups")
            .fetch_one(&self.pool)
            .await
            .map_db_err(StorageOperation::CountGroups)?;

        let count: i64 = row.get("count");
        Ok(from_db_count(count))
    }
}
