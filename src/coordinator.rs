use crate::prelude::*;
use fieldx::fxstruct;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};
use tokio_stream::StreamExt;
use tracing::{debug, info_span, instrument, trace, warn, Instrument};

/// The TTL applied to every cache entry unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3 * 60 * 60);
/// Number of keys requested per page of a table-wide scan.
pub const DEFAULT_SCAN_PAGE_SIZE: usize = 100;

/// Read-through/write-through coordinator over a [`FastCache`] and the authoritative [`BackingStore`].
///
/// ```ignore
/// let coordinator = Coordinator::builder()
///     .backing_store(store)
///     .fast_cache(MokaCache::builder().max_capacity(50_000).build()?)
///     .ttl(Duration::from_secs(600))
///     .build()?;
///
/// let docs = coordinator
///     .read(&[DocRef::new("Team", "t1"), DocRef::new("User", "u7")])
///     .await?;
/// ```
///
/// The cache is never the system of record. Writes reach the store first and are mirrored into the cache only after
/// the store confirmed them. Reads that miss the cache go to the store and, by default, repopulate the cache in a
/// detached task so that the caller's latency only includes the cache and store reads.
#[fxstruct(
    sync,
    no_new,
    default(off),
    builder(
        doc("Builder object of [`Coordinator`].", "", "See [`Coordinator::builder()`] method."),
        method_doc("Implement builder pattern for [`Coordinator`]."),
    )
)]
pub struct Coordinator<BS, FC>
where
    BS: BackingStore,
    FC: FastCache,
{
    #[fieldx(get(clone), builder(required, into))]
    backing_store: Arc<BS>,

    #[fieldx(get(clone), builder(required, into))]
    fast_cache: Arc<FC>,

    /// Coordinator name. Only used in log records.
    #[fieldx(optional, get(off), builder(into))]
    name: String,

    /// Lifetime of every cache entry the coordinator writes.
    #[fieldx(get(copy), default(DEFAULT_TTL))]
    ttl: Duration,

    #[fieldx(get(copy), default(DEFAULT_SCAN_PAGE_SIZE))]
    scan_page_size: usize,

    /// Whether the read path waits for cache population after a miss.
    #[fieldx(get(copy), default(Population::Background))]
    read_population: Population,

    #[fieldx(optional, get(clone))]
    invalidation_listener: Arc<dyn InvalidationListener>,

    #[fieldx(optional, get(clone))]
    observer: Arc<dyn Observer>,

    #[fieldx(get, builder(off), default(TableSet::new()))]
    tracked_tables: TableSet,
}

impl<BS, FC> Coordinator<BS, FC>
where
    BS: BackingStore,
    FC: FastCache,
{
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anon>")
    }

    /// Fetch documents by `(table, id)`, serving from the fast cache where possible.
    ///
    /// The result has one slot per request in request order; `None` means the document does not exist. Any failure of
    /// the cache read or the store read fails the whole call.
    #[instrument(level = "debug", skip_all, fields(cache = self.name(), requested = requests.len()))]
    pub async fn read(&self, requests: &[DocRef]) -> Result<Vec<Option<Document>>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        self.track_tables(requests);

        let keys = requests.iter().map(CacheKey::from).collect::<Vec<_>>();
        let cached = self.fast_cache().multi_get(&keys).await?;
        if cached.len() != keys.len() {
            return Err(Error::cache(format!(
                "multi-get returned {} values for {} keys",
                cached.len(),
                keys.len()
            )));
        }

        let mut docs = Vec::with_capacity(keys.len());
        let mut misses = vec![];
        for (idx, (key, raw)) in keys.iter().zip(cached).enumerate() {
            let doc = raw.and_then(|raw| match Document::decode(&raw) {
                Ok(doc) => Some(doc),
                Err(err) => {
                    warn!("[{}] dropping undecodable cache entry '{key}': {err}", self.name());
                    None
                }
            });
            if doc.is_none() {
                misses.push(idx);
            }
            docs.push(doc);
        }

        if misses.is_empty() {
            debug!("[{}] all {} keys served from cache", self.name(), keys.len());
            return Ok(docs);
        }

        let mut seen = HashSet::with_capacity(misses.len());
        let missing = misses
            .iter()
            .filter(|idx| seen.insert(&keys[**idx]))
            .map(|idx| requests[*idx].clone())
            .collect::<Vec<_>>();

        debug!(
            "[{}] {} hit(s), {} miss(es), fetching {} from store",
            self.name(),
            keys.len() - misses.len(),
            misses.len(),
            missing.len()
        );

        let found = self.backing_store().batch_read(&missing).await?;

        for idx in misses {
            docs[idx] = found.get(&keys[idx]).cloned();
        }

        self.populate(found).await;

        Ok(docs)
    }

    /// Write a batch to the store, then mirror every produced document into the fast cache.
    ///
    /// Returns the store's per-record results in input order; `None` marks a no-op. Nothing is written to the cache if
    /// the store write fails.
    #[instrument(level = "debug", skip_all, fields(cache = self.name(), records = records.len()))]
    pub async fn write(&self, records: &[WriteSpec]) -> Result<Vec<Option<Document>>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let results = self.backing_store().batch_write(records).await?;
        if results.len() != records.len() {
            return Err(Error::store(format!(
                "batch write returned {} results for {} records",
                results.len(),
                records.len()
            )));
        }

        let entries = records
            .iter()
            .zip(results.iter())
            .filter_map(|(record, result)| result.as_ref().map(|doc| (record.table.as_str(), doc)))
            .map(|(table, doc)| -> Result<(CacheKey, String)> {
                let key = doc.key_in(table)?;
                let raw = doc.encode(&key)?;
                Ok((key, raw))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "[{}] store wrote {} of {} record(s), mirroring into cache",
            self.name(),
            entries.len(),
            records.len()
        );

        if !entries.is_empty() {
            self.fast_cache().multi_set_with_ttl(entries, self.ttl()).await?;
        }

        Ok(results)
    }

    /// Drop a single cache entry. Returns `true` if there was one.
    #[instrument(level = "debug", skip(self), fields(cache = self.name()))]
    pub async fn clear(&self, key: &CacheKey) -> Result<bool> {
        self.fast_cache().delete(key).await
    }

    /// Put documents obtained elsewhere into the cache in one round trip.
    #[instrument(level = "debug", skip(self, documents), fields(cache = self.name(), count = documents.len()))]
    pub async fn prime(&self, table: &str, documents: &[Document]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let entries = Self::encode_all(table, documents)?;
        self.fast_cache().multi_set_with_ttl(entries, self.ttl()).await
    }

    /// Patch every document of `table`: first in the store, then every cached copy, one scan page at a time.
    ///
    /// The next page is only requested once the current one has been written back. A failing page aborts the scan
    /// with [`Error::ScanAborted`]; pages rewritten before it stay patched.
    #[instrument(level = "debug", skip(self, patch), fields(cache = self.name()))]
    pub async fn apply_to_table(&self, table: &str, patch: &Patch) -> Result<TablePatchOutcome> {
        self.backing_store().apply_patch_to_table(table, patch).await?;

        let mut outcome = TablePatchOutcome::default();
        let abort = |pages: usize, source: Error| Error::ScanAborted {
            table: table.to_string(),
            pages,
            source: Box::new(source),
        };

        let mut pages = self
            .fast_cache()
            .scan_by_prefix(&CacheKey::table_prefix(table), self.scan_page_size())
            .await
            .map_err(|err| abort(0, err))?;

        while let Some(page) = pages.next().await {
            let keys = page.map_err(|err| abort(outcome.pages, err))?;
            let (patched, skipped) = self
                .patch_page(table, keys, patch)
                .await
                .map_err(|err| abort(outcome.pages, err))?;

            outcome.pages += 1;
            outcome.patched += patched;
            outcome.skipped += skipped;

            if let Some(observer) = self.observer() {
                observer.on_page_patched(table, patched).await;
            }
        }

        debug!(
            "[{}] table '{table}' patched: {} page(s), {} entr(ies), {} skipped",
            self.name(),
            outcome.pages,
            outcome.patched,
            outcome.skipped
        );

        Ok(outcome)
    }

    async fn patch_page(&self, table: &str, keys: Vec<CacheKey>, patch: &Patch) -> Result<(usize, usize)> {
        let keys = keys.into_iter().filter(|key| key.belongs_to(table)).collect::<Vec<_>>();
        if keys.is_empty() {
            return Ok((0, 0));
        }

        let values = self.fast_cache().multi_get(&keys).await?;
        let mut skipped = 0;
        let mut entries = Vec::with_capacity(keys.len());

        for (key, raw) in keys.into_iter().zip(values) {
            // Expired between the scan and the read.
            let Some(raw) = raw
            else {
                skipped += 1;
                continue;
            };

            match Document::decode(&raw) {
                Ok(mut doc) => {
                    doc.apply(patch);
                    let raw = doc.encode(&key)?;
                    entries.push((key, raw));
                }
                Err(err) => {
                    warn!("[{}] skipping undecodable cache entry '{key}': {err}", self.name());
                    skipped += 1;
                }
            }
        }

        let patched = entries.len();
        trace!("[{}] rewriting {patched} entr(ies) of '{table}'", self.name());
        if patched > 0 {
            self.fast_cache().multi_set_with_ttl(entries, self.ttl()).await?;
        }

        Ok((patched, skipped))
    }

    // Failures are logged and reported to the observer, never returned to the reader.
    async fn populate(&self, found: HashMap<CacheKey, Document>) {
        if found.is_empty() {
            return;
        }

        let entries = found
            .into_iter()
            .filter_map(|(key, doc)| match doc.encode(&key) {
                Ok(raw) => Some((key, raw)),
                Err(err) => {
                    warn!("[{}] not caching '{key}': {err}", self.name());
                    None
                }
            })
            .collect::<Vec<_>>();

        let task = Self::populate_task(
            self.fast_cache(),
            self.observer(),
            entries,
            self.ttl(),
            self.name().to_string(),
        );

        match self.read_population() {
            Population::Synchronous => task.await,
            Population::Background => {
                tokio::spawn(task.instrument(info_span!("populate", cache = self.name())));
            }
        }
    }

    async fn populate_task(
        fast_cache: Arc<FC>,
        observer: Option<Arc<dyn Observer>>,
        entries: Vec<(CacheKey, String)>,
        ttl: Duration,
        name: String,
    ) {
        let count = entries.len();
        match fast_cache.multi_set_with_ttl(entries, ttl).await {
            Ok(()) => {
                trace!("[{name}] populated {count} entr(ies)");
                if let Some(observer) = observer {
                    observer.on_populated(count).await;
                }
            }
            Err(err) => {
                warn!("[{name}] cache population of {count} entr(ies) failed: {err}");
                if let Some(observer) = observer {
                    observer.on_population_error(&err).await;
                }
            }
        }
    }

    // Tables are recorded right away. Listener calls run in a detached task, off the read path.
    fn track_tables(&self, requests: &[DocRef]) {
        let Some(listener) = self.invalidation_listener()
        else {
            return;
        };

        let tables = self.tracked_tables().insert_new(requests.iter().map(DocRef::table));
        if tables.is_empty() {
            return;
        }

        let name = self.name().to_string();
        tokio::spawn(
            async move {
                for table in tables {
                    debug!("[{name}] tracking invalidations of table '{table}'");
                    if let Err(err) = listener.track_table(&CacheKey::table_prefix(&table)).await {
                        warn!("[{name}] cannot track table '{table}': {err}");
                    }
                }
            }
            .instrument(info_span!("track_tables", cache = self.name())),
        );
    }

    fn encode_all(table: &str, documents: &[Document]) -> Result<Vec<(CacheKey, String)>> {
        documents
            .iter()
            .map(|doc| -> Result<(CacheKey, String)> {
                let key = doc.key_in(table)?;
                let raw = doc.encode(&key)?;
                Ok((key, raw))
            })
            .collect()
    }
}

impl<BS, FC> CoordinatorBuilder<BS, FC>
where
    BS: BackingStore,
    FC: FastCache,
{
    /// Take TTL, scan page size and read population mode from a configuration record.
    pub fn config(self, config: &CacheConfig) -> Self {
        self.ttl(config.ttl())
            .scan_page_size(config.scan_page_size)
            .read_population(config.read_population)
    }
}
