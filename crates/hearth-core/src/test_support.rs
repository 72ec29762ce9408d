//! Instrumented collaborators for unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::geocode::GeocodeResolver;
use crate::models::{GeoPoint, ImageUpload, Listing, ListingData, ListingId, UserId, UserProfile};
use crate::storage::{BlobUploader, ProgressReporter};
use crate::store::{
    ListingFilter, ListingQuery, ListingStore, MemoryListingStore, ProfileStore, QueryPage,
};
use crate::{Error, Result};

/// Store wrapper that records calls and can be told to fail.
#[derive(Clone)]
pub struct RecordingStore {
    inner: MemoryListingStore,
    state: Arc<Mutex<RecordingState>>,
}

#[derive(Default)]
struct RecordingState {
    queries: Vec<ListingQuery>,
    count_calls: usize,
    gets: usize,
    writes: usize,
    /// Queries allowed before every further query fails.
    queries_before_failure: Option<usize>,
    fail_writes: bool,
}

impl RecordingStore {
    pub fn new(inner: MemoryListingStore) -> Self {
        Self {
            inner,
            state: Arc::default(),
        }
    }

    pub const fn inner(&self) -> &MemoryListingStore {
        &self.inner
    }

    pub fn queries(&self) -> Vec<ListingQuery> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn count_calls(&self) -> usize {
        self.state.lock().unwrap().count_calls
    }

    pub fn gets(&self) -> usize {
        self.state.lock().unwrap().gets
    }

    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn fail_queries_after(&self, allowed: usize) {
        self.state.lock().unwrap().queries_before_failure = Some(allowed);
    }

    pub fn fail_writes(&self) {
        self.state.lock().unwrap().fail_writes = true;
    }

    pub fn recover(&self) {
        let mut state = self.state.lock().unwrap();
        state.queries_before_failure = None;
        state.fail_writes = false;
    }

    fn check_query(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.queries_before_failure {
            Some(0) => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            ))),
            Some(remaining) => {
                state.queries_before_failure = Some(remaining - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn check_write(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        if state.fail_writes {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "write rejected",
            )));
        }
        Ok(())
    }
}

impl ListingStore for RecordingStore {
    async fn query(&self, query: &ListingQuery) -> Result<QueryPage> {
        self.state.lock().unwrap().queries.push(query.clone());
        self.check_query()?;
        self.inner.query(query).await
    }

    async fn count(&self, filter: &ListingFilter) -> Result<Option<usize>> {
        self.state.lock().unwrap().count_calls += 1;
        self.check_query()?;
        self.inner.count(filter).await
    }

    async fn get(&self, id: &ListingId) -> Result<Option<Listing>> {
        self.state.lock().unwrap().gets += 1;
        self.inner.get(id).await
    }

    async fn create(&self, data: ListingData) -> Result<ListingId> {
        self.check_write()?;
        self.inner.create(data).await
    }

    async fn update(&self, id: &ListingId, data: ListingData) -> Result<()> {
        self.check_write()?;
        self.inner.update(id, data).await
    }

    async fn delete(&self, id: &ListingId) -> Result<()> {
        self.check_write()?;
        self.inner.delete(id).await
    }
}

impl ProfileStore for RecordingStore {
    async fn get_profile(&self, user: &UserId) -> Result<Option<UserProfile>> {
        self.inner.get_profile(user).await
    }

    async fn save_profile(&self, user: &UserId, profile: &UserProfile) -> Result<()> {
        self.inner.save_profile(user, profile).await
    }
}

/// Uploader that yields once per upload so concurrent uploads interleave.
#[derive(Clone, Default)]
pub struct FakeUploader {
    uploaded_keys: Arc<Mutex<Vec<String>>>,
    failing_files: Arc<Mutex<HashSet<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl FakeUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, file_name: &str) {
        self.failing_files
            .lock()
            .unwrap()
            .insert(file_name.to_string());
    }

    pub fn uploaded_keys(&self) -> Vec<String> {
        self.uploaded_keys.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl BlobUploader for FakeUploader {
    async fn upload(
        &self,
        object_key: &str,
        image: &ImageUpload,
        progress: &ProgressReporter,
    ) -> Result<String> {
        let total = image.bytes.len() as u64;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        progress.report(0, total);

        tokio::task::yield_now().await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing_files.lock().unwrap().contains(&image.file_name) {
            return Err(Error::Storage(format!("upload of {} failed", image.file_name)));
        }

        self.uploaded_keys
            .lock()
            .unwrap()
            .push(object_key.to_string());
        progress.report(total, total);
        Ok(format!("https://cdn.test/{object_key}"))
    }
}

/// Geocoder returning canned matches.
#[derive(Clone)]
pub struct FakeGeocoder {
    response: Arc<Mutex<Result<Vec<GeoPoint>>>>,
    calls: Arc<AtomicUsize>,
}

impl FakeGeocoder {
    pub fn found(point: GeoPoint) -> Self {
        Self::with(Ok(vec![point]))
    }

    pub fn no_match() -> Self {
        Self::with(Ok(Vec::new()))
    }

    pub fn failing() -> Self {
        Self::with(Err(Error::Geocode("service unavailable".to_string())))
    }

    fn with(response: Result<Vec<GeoPoint>>) -> Self {
        Self {
            response: Arc::new(Mutex::new(response)),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GeocodeResolver for FakeGeocoder {
    async fn resolve(&self, _address: &str) -> Result<Vec<GeoPoint>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.response.lock().unwrap() {
            Ok(points) => Ok(points.clone()),
            Err(error) => Err(Error::Geocode(error.to_string())),
        }
    }
}
