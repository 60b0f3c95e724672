//! The event store: a thin, capability-style wrapper around a MongoDB
//! collection. No client is ever pulled from a global; callers acquire an
//! `EventStore` once at service start and pass it through request/worker
//! context.

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};
use relay_domain::{AttemptRecord, Event, EventStatus, HistogramBucket, SearchSummary};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// The outcome of attempting to insert a newly-ingested event.
pub enum InsertOutcome {
    Inserted(Event),
    IdempotentReplay(Event),
}

/// Validated filter fields for a search, constructed by the caller after
/// parsing and checking the raw [`relay_domain::SearchQuery`].
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    pub event_type: Option<String>,
    pub from_timestamp: Option<DateTime<Utc>>,
    pub to_timestamp: Option<DateTime<Utc>>,
}

impl EventFilter {
    fn to_document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(status) = self.status {
            doc.insert("status", status.to_string());
        }
        if let Some(event_type) = &self.event_type {
            doc.insert("event_type", event_type.clone());
        }
        match (self.from_timestamp, self.to_timestamp) {
            (None, None) => {}
            (from, to) => {
                let mut range = Document::new();
                if let Some(from) = from {
                    range.insert("$gte", bson::DateTime::from_chrono(from));
                }
                if let Some(to) = to {
                    range.insert("$lte", bson::DateTime::from_chrono(to));
                }
                doc.insert("received_at", range);
            }
        }
        doc
    }
}

#[derive(Debug, serde::Deserialize)]
struct CountBucket {
    #[serde(rename = "_id")]
    key: Option<String>,
    count: i64,
}

pub struct EventStore {
    collection: Collection<Event>,
}

impl EventStore {
    /// Connect and ensure the indexes required by the data model exist.
    ///
    /// Pool size and retry behavior are set explicitly rather than left to
    /// driver defaults: a handful of connections per process is enough for
    /// this workload, and both read and write retries are worth enabling
    /// given the stream of transient network errors any long-lived store
    /// connection accumulates.
    pub async fn connect(mongodb_url: &str, database: &str) -> Result<Self> {
        let mut options = ClientOptions::parse(mongodb_url).await?;
        options.max_pool_size = Some(5);
        options.min_pool_size = Some(1);
        options.retry_writes = Some(true);
        options.retry_reads = Some(true);

        let client = Client::with_options(options)?;
        let collection = client.database(database).collection::<Event>("events");
        let store = Self { collection };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        use mongodb::options::IndexOptions;

        let models = vec![
            IndexModel::builder().keys(doc! {"status": 1}).build(),
            IndexModel::builder().keys(doc! {"event_type": 1}).build(),
            IndexModel::builder().keys(doc! {"received_at": 1}).build(),
            IndexModel::builder()
                .keys(doc! {"status": 1, "received_at": 1})
                .build(),
            IndexModel::builder()
                .keys(doc! {"event_type": 1, "received_at": 1})
                .build(),
            IndexModel::builder()
                .keys(doc! {"idempotency_key": 1})
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .sparse(true)
                        .build(),
                )
                .build(),
        ];

        self.collection.create_indexes(models).await?;
        Ok(())
    }

    /// Cheap connectivity check for `/health`.
    pub async fn ping(&self) -> Result<()> {
        self.collection.estimated_document_count().await?;
        Ok(())
    }

    /// Insert a freshly-received event. On a unique-index collision for
    /// `idempotency_key`, look up and return the already-stored document
    /// instead of failing the whole request.
    pub async fn insert(&self, mut event: Event) -> Result<InsertOutcome> {
        match self.collection.insert_one(&event).await {
            Ok(result) => {
                let id = result.inserted_id.as_object_id().ok_or_else(|| {
                    Error::LogicalInconsistency("insert did not return an ObjectId".into())
                })?;
                event.id = Some(id);
                Ok(InsertOutcome::Inserted(event))
            }
            Err(err) if is_duplicate_key_error(&err) => {
                let key = event.idempotency_key.clone().ok_or_else(|| {
                    Error::LogicalInconsistency(
                        "duplicate key error but the rejected document has no idempotency_key"
                            .into(),
                    )
                })?;

                match self
                    .collection
                    .find_one(doc! {"idempotency_key": &key})
                    .await?
                {
                    Some(existing) => Ok(InsertOutcome::IdempotentReplay(existing)),
                    None => Err(Error::LogicalInconsistency(format!(
                        "unique index violation for idempotency_key={key} but no document found"
                    ))),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Atomic CAS claim: `RECEIVED -> DELIVERING`. Returns `None` if no
    /// document matched (already claimed, already terminal, or missing).
    pub async fn claim(&self, id: ObjectId) -> Result<Option<Event>> {
        let locked_at = bson::DateTime::from_chrono(Utc::now());
        let updated = self
            .collection
            .find_one_and_update(
                doc! {"_id": id, "status": EventStatus::Received.to_string()},
                doc! {"$set": {
                    "status": EventStatus::Delivering.to_string(),
                    "locked_at": locked_at,
                }},
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    /// Append a delivery attempt and set the resulting status.
    pub async fn record_attempt(
        &self,
        id: ObjectId,
        attempt: AttemptRecord,
        new_status: EventStatus,
    ) -> Result<()> {
        let attempt_bson = bson::to_bson(&attempt)?;
        self.collection
            .update_one(
                doc! {"_id": id},
                doc! {
                    "$push": {"delivery_attempts": attempt_bson},
                    "$set": {"status": new_status.to_string()},
                },
            )
            .await?;
        Ok(())
    }

    /// Set status directly, with no attempt appended. Used by the worker to
    /// record terminal failure after the retry loop is exhausted.
    pub async fn set_status(&self, id: ObjectId, status: EventStatus) -> Result<()> {
        self.collection
            .update_one(doc! {"_id": id}, doc! {"$set": {"status": status.to_string()}})
            .await?;
        Ok(())
    }

    /// Look up a single event by id, for status checks in tests and tooling.
    pub async fn find_by_id(&self, id: ObjectId) -> Result<Option<Event>> {
        Ok(self.collection.find_one(doc! {"_id": id}).await?)
    }

    /// Search events matching `filter`, returning the page of matching
    /// documents plus aggregate summaries computed over the *full* matching
    /// set (not just the returned page).
    pub async fn search(
        &self,
        filter: &EventFilter,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<Event>, SearchSummary)> {
        let filter_doc = filter.to_document();

        let mut cursor = self
            .collection
            .find(filter_doc.clone())
            .sort(doc! {"received_at": -1})
            .skip(skip as u64)
            .limit(limit)
            .await?;
        let mut data = Vec::new();
        while let Some(event) = cursor.try_next().await? {
            data.push(event);
        }

        let status_counts = self.count_by(&filter_doc, "status").await?;
        let event_type_counts = self.count_by(&filter_doc, "event_type").await?;
        let hourly_histogram = self.hourly_histogram(&filter_doc).await?;

        Ok((
            data,
            SearchSummary {
                status_counts,
                event_type_counts,
                hourly_histogram,
            },
        ))
    }

    async fn count_by(&self, filter_doc: &Document, field: &str) -> Result<HashMap<String, i64>> {
        let mut pipeline = Vec::new();
        if !filter_doc.is_empty() {
            pipeline.push(doc! {"$match": filter_doc.clone()});
        }
        pipeline.push(doc! {
            "$group": {
                "_id": {"$ifNull": [format!("${field}"), "unknown"]},
                "count": {"$sum": 1},
            }
        });

        let mut cursor = self.collection.aggregate(pipeline).await?;
        let mut counts = HashMap::new();
        while let Some(doc) = cursor.try_next().await? {
            let bucket: CountBucket = bson::from_document(doc)?;
            counts.insert(bucket.key.unwrap_or_else(|| "unknown".to_string()), bucket.count);
        }
        Ok(counts)
    }

    async fn hourly_histogram(&self, filter_doc: &Document) -> Result<Vec<HistogramBucket>> {
        let mut pipeline = Vec::new();
        if !filter_doc.is_empty() {
            pipeline.push(doc! {"$match": filter_doc.clone()});
        }
        pipeline.push(doc! {
            "$group": {
                "_id": {
                    "$dateToString": {"format": "%Y-%m-%d %H:00", "date": "$received_at"},
                },
                "count": {"$sum": 1},
            }
        });
        pipeline.push(doc! {"$sort": {"_id": 1}});

        let mut cursor = self.collection.aggregate(pipeline).await?;
        let mut buckets = Vec::new();
        while let Some(doc) = cursor.try_next().await? {
            buckets.push(bson::from_document(doc)?);
        }
        Ok(buckets)
    }
}

fn is_duplicate_key_error(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        ErrorKind::BulkWrite(bulk) => bulk
            .write_errors
            .as_ref()
            .map(|errors| errors.iter().any(|e| e.code == 11000))
            .unwrap_or(false),
        _ => false,
    }
}
