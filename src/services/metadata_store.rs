//! MetadataStore — durable, queryable records of committed videos.
//!
//! A record is written by a single INSERT, so readers never observe a
//! half-written video. The store refuses records whose binary is absent or
//! whose URL is not the one the grant addressed.

use crate::{
    models::video::{NewVideoRecord, VideoQuery, VideoRecord},
    services::{
        layout::StorageLayout,
        object_store::{ObjectStoreError, ObjectStoreService, is_unique_violation},
    },
    validation::{ValidationErrors, validate_video_fields},
};
use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid video metadata: {0}")]
    Validation(ValidationErrors),
    #[error("video `{0}` already exists")]
    DuplicateId(String),
    #[error("`{url}` is not the storage address of video `{video_id}`")]
    UrlMismatch { video_id: String, url: String },
    #[error("no uploaded binary found for video `{0}`")]
    BinaryMissing(String),
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone)]
pub struct MetadataStore {
    pub db: Arc<SqlitePool>,
    layout: StorageLayout,
    objects: ObjectStoreService,
    categories: Arc<Vec<String>>,
}

impl MetadataStore {
    pub fn new(
        db: Arc<SqlitePool>,
        layout: StorageLayout,
        objects: ObjectStoreService,
        categories: Vec<String>,
    ) -> Self {
        Self {
            db,
            layout,
            objects,
            categories: Arc::new(categories),
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Persist a record for an uploaded binary.
    ///
    /// `upload_date` is assigned here; any client-supplied value is ignored.
    /// An existing `video_id` is reported as [`StoreError::DuplicateId`] and
    /// never overwritten.
    pub async fn create_record(&self, new: NewVideoRecord) -> StoreResult<VideoRecord> {
        validate_video_fields(
            &new.title,
            &new.description,
            &new.category,
            Some(self.categories.as_slice()),
        )
        .into_result()
        .map_err(StoreError::Validation)?;

        let key = self
            .layout
            .canonical_key_for(&new.video_id, &new.video_url)
            .ok_or_else(|| StoreError::UrlMismatch {
                video_id: new.video_id.clone(),
                url: new.video_url.clone(),
            })?;

        match self.objects.exists(key).await {
            Ok(true) => {}
            Ok(false) => return Err(StoreError::BinaryMissing(new.video_id)),
            Err(ObjectStoreError::Sqlx(err)) => return Err(err.into()),
            Err(other) => return Err(StoreError::Unavailable(other.to_string())),
        }

        let record = VideoRecord {
            video_id: new.video_id,
            title: new.title.trim().to_string(),
            description: new.description.trim().to_string(),
            category: new.category.trim().to_string(),
            video_url: new.video_url,
            upload_date: Utc::now(),
        };

        let inserted = sqlx::query(
            "INSERT INTO videos (video_id, title, description, category, video_url, upload_date)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.video_id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.category)
        .bind(&record.video_url)
        .bind(record.upload_date)
        .execute(&*self.db)
        .await;

        match inserted {
            Ok(_) => {
                info!(video_id = %record.video_id, category = %record.category, "committed video metadata");
                Ok(record)
            }
            Err(err) if is_unique_violation(&err) => {
                warn!(video_id = %record.video_id, "rejected duplicate video id");
                Err(StoreError::DuplicateId(record.video_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// List committed records.
    ///
    /// `category` matches exactly unless it is absent, blank or `all`.
    /// `search_query` is a case-insensitive substring match against title or
    /// description. No ordering is guaranteed.
    pub async fn list_records(&self, query: &VideoQuery) -> StoreResult<Vec<VideoRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT video_id, title, description, category, video_url, upload_date FROM videos",
        );
        if let Some(category) = query.category_filter() {
            builder.push(" WHERE category = ");
            builder.push_bind(category.to_string());
        }

        let rows: Vec<VideoRecord> = builder.build_query_as().fetch_all(&*self.db).await?;

        let Some(needle) = query.search().map(str::to_lowercase) else {
            return Ok(rows);
        };
        Ok(rows
            .into_iter()
            .filter(|r| {
                r.title.to_lowercase().contains(&needle)
                    || r.description.to_lowercase().contains(&needle)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db,
        services::{object_store::SignedPut, signer::UrlSigner, test_support::temp_pool},
    };
    use bytes::Bytes;
    use futures::stream;
    use std::io;

    const BASE: &str = "http://localhost:3000";

    async fn store() -> (MetadataStore, ObjectStoreService, tempfile::TempDir) {
        let (pool, dir) = temp_pool().await;
        db::run_migrations(&pool).await.unwrap();
        let pool = Arc::new(pool);
        let objects = ObjectStoreService::new(
            pool.clone(),
            dir.path().join("objects"),
            UrlSigner::new("meta-secret"),
        );
        let store = MetadataStore::new(
            pool,
            StorageLayout::new(BASE),
            objects.clone(),
            vec!["category1".into(), "category2".into()],
        );
        (store, objects, dir)
    }

    async fn upload(objects: &ObjectStoreService, video_id: &str) -> String {
        let key = format!("videos/{}.mp4", video_id);
        let expires_at = Utc::now().timestamp() + 60;
        let signature = UrlSigner::new("meta-secret")
            .sign_put(&key, "video/mp4", expires_at)
            .unwrap();
        objects
            .put_signed_object(
                &key,
                Some("video/mp4"),
                &SignedPut {
                    expires_at,
                    signature,
                },
                stream::iter(vec![Ok::<_, io::Error>(Bytes::from_static(b"bytes"))]),
            )
            .await
            .unwrap();
        format!("{}/objects/{}", BASE, key)
    }

    fn new_record(
        video_id: &str,
        url: &str,
        title: &str,
        description: &str,
        category: &str,
    ) -> NewVideoRecord {
        NewVideoRecord {
            video_id: video_id.into(),
            title: title.into(),
            description: description.into(),
            category: category.into(),
            video_url: url.into(),
            upload_date: None,
        }
    }

    #[tokio::test]
    async fn create_then_list_returns_the_record() {
        let (store, objects, _dir) = store().await;
        assert!(store.list_records(&VideoQuery::default()).await.unwrap().is_empty());

        let url = upload(&objects, "v1").await;
        let before = Utc::now();
        let created = store
            .create_record(new_record("v1", &url, "Cat video", "A cat", "category1"))
            .await
            .unwrap();
        assert!(created.upload_date >= before);

        let listed = store.list_records(&VideoQuery::default()).await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn binary_still_being_written_cannot_be_committed() {
        let (store, objects, _dir) = store().await;
        sqlx::query(
            "INSERT INTO objects (id, key, content_type, size_bytes, etag, created_at)
             VALUES (?, 'videos/v1.mp4', 'video/mp4', 5, '', ?)",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(Utc::now())
        .execute(&*objects.db)
        .await
        .unwrap();

        let url = format!("{}/objects/videos/v1.mp4", BASE);
        let result = store
            .create_record(new_record("v1", &url, "Cat video", "A cat", "category1"))
            .await;
        assert!(matches!(result, Err(StoreError::BinaryMissing(id)) if id == "v1"));
    }

    #[tokio::test]
    async fn padded_fields_are_measured_and_stored_trimmed() {
        let (store, objects, _dir) = store().await;
        let url = upload(&objects, "v1").await;
        let title = format!("  {}  ", "t".repeat(25));
        let created = store
            .create_record(new_record("v1", &url, &title, " A cat ", "category1"))
            .await
            .unwrap();
        assert_eq!(created.title, "t".repeat(25));
        assert_eq!(created.description, "A cat");
    }

    #[tokio::test]
    async fn client_supplied_upload_date_is_ignored() {
        let (store, objects, _dir) = store().await;
        let url = upload(&objects, "v1").await;
        let mut new = new_record("v1", &url, "t", "d", "category1");
        new.upload_date = Some("2001-01-01T00:00:00Z".parse().unwrap());
        let before = Utc::now();
        let created = store.create_record(new).await.unwrap();
        assert!(created.upload_date >= before);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected_not_overwritten() {
        let (store, objects, _dir) = store().await;
        let url = upload(&objects, "v1").await;
        store
            .create_record(new_record("v1", &url, "first", "d", "category1"))
            .await
            .unwrap();
        let second = store
            .create_record(new_record("v1", &url, "second", "d", "category1"))
            .await;
        assert!(matches!(second, Err(StoreError::DuplicateId(id)) if id == "v1"));

        let listed = store.list_records(&VideoQuery::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "first");
    }

    #[tokio::test]
    async fn records_require_an_uploaded_binary() {
        let (store, _objects, _dir) = store().await;
        let url = format!("{}/objects/videos/ghost.mp4", BASE);
        let result = store
            .create_record(new_record("ghost", &url, "t", "d", "category1"))
            .await;
        assert!(matches!(result, Err(StoreError::BinaryMissing(_))));
    }

    #[tokio::test]
    async fn records_must_name_their_own_address() {
        let (store, objects, _dir) = store().await;
        let url = upload(&objects, "v1").await;
        let result = store
            .create_record(new_record("v2", &url, "t", "d", "category1"))
            .await;
        assert!(matches!(result, Err(StoreError::UrlMismatch { .. })));
    }

    #[tokio::test]
    async fn invalid_fields_never_reach_the_database() {
        let (store, objects, _dir) = store().await;
        let url = upload(&objects, "v1").await;
        let result = store
            .create_record(new_record("v1", &url, &"x".repeat(26), "d", "category7"))
            .await;
        match result {
            Err(StoreError::Validation(errors)) => {
                assert!(errors.has("title"));
                assert!(errors.has("category"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(store.list_records(&VideoQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_over_title_and_description() {
        let (store, objects, _dir) = store().await;
        for (id, title, description, category) in [
            ("a", "My CAT", "sleeping", "category1"),
            ("b", "Dogs", "the dog chases a Cat", "category2"),
            ("c", "Birds", "tweeting", "category1"),
        ] {
            let url = upload(&objects, id).await;
            store
                .create_record(new_record(id, &url, title, description, category))
                .await
                .unwrap();
        }

        let query = VideoQuery {
            search_query: Some("cat".into()),
            category: None,
        };
        let mut ids: Vec<String> = store
            .list_records(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.video_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);

        let query = VideoQuery {
            search_query: Some("cat".into()),
            category: Some("category2".into()),
        };
        let hits = store.list_records(&query).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].video_id, "b");

        let query = VideoQuery {
            search_query: None,
            category: Some("all".into()),
        };
        assert_eq!(store.list_records(&query).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn closed_pool_surfaces_as_unavailable() {
        let (store, _objects, _dir) = store().await;
        store.db.close().await;
        assert!(matches!(
            store.list_records(&VideoQuery::default()).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
