//! Listing submission: validate, geocode, upload images, persist.
//!
//! Stages run in order and any failure aborts the rest of the submit. Images
//! uploaded before a later failure are not deleted; they stay orphaned in
//! blob storage and are logged at `warn`.

mod validation;

pub use validation::validate_draft;

use futures::future::join_all;
use tokio::sync::mpsc::UnboundedSender;

use crate::geocode::GeocodeResolver;
use crate::models::{GeoPoint, ImageUpload, ListingData, ListingDraft, ListingId, UserId};
use crate::storage::{image_object_key, BlobUploader, ProgressReporter, UploadProgress};
use crate::store::ListingStore;
use crate::{Error, Result};

/// Whether a submit creates a listing or replaces an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitMode {
    Create,
    Edit(ListingId),
}

/// Turns listing drafts into persisted listings for one signed-in user.
pub struct ListingSubmissionPipeline<S, U, G> {
    store: S,
    uploader: U,
    geocoder: G,
    current_user: UserId,
    geolocation_enabled: bool,
    progress: Option<UnboundedSender<UploadProgress>>,
}

impl<S, U, G> ListingSubmissionPipeline<S, U, G>
where
    S: ListingStore,
    U: BlobUploader,
    G: GeocodeResolver,
{
    pub const fn new(store: S, uploader: U, geocoder: G, current_user: UserId) -> Self {
        Self {
            store,
            uploader,
            geocoder,
            current_user,
            geolocation_enabled: true,
            progress: None,
        }
    }

    /// Use the draft's manual coordinates instead of the geocoder.
    #[must_use]
    pub const fn with_geolocation(mut self, enabled: bool) -> Self {
        self.geolocation_enabled = enabled;
        self
    }

    /// Stream per-image upload progress to `sender`.
    #[must_use]
    pub fn with_progress(mut self, sender: UnboundedSender<UploadProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub const fn current_user(&self) -> &UserId {
        &self.current_user
    }

    /// Submit a draft.
    ///
    /// `existing_image_urls` are the already-uploaded images kept by the user
    /// (edit mode); new uploads are appended after them in draft order.
    pub async fn submit(
        &self,
        draft: ListingDraft,
        existing_image_urls: Vec<String>,
        mode: SubmitMode,
    ) -> Result<ListingId> {
        let owner_ref = match &mode {
            SubmitMode::Create => self.current_user.clone(),
            SubmitMode::Edit(id) => self.authorize_edit(id).await?,
        };

        validate_draft(&draft, &existing_image_urls, self.geolocation_enabled)?;

        let geolocation = self.resolve_geolocation(&draft).await?;

        let new_urls = if draft.new_images.is_empty() {
            Vec::new()
        } else {
            self.upload_images(&draft.new_images).await?
        };

        let mut image_urls = existing_image_urls;
        image_urls.extend(new_urls);

        let data = ListingData {
            kind: draft.kind,
            name: draft.name.trim().to_string(),
            location: draft.address.trim().to_string(),
            geolocation,
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            parking: draft.parking,
            furnished: draft.furnished,
            offer: draft.offer,
            regular_price: draft.regular_price,
            discounted_price: draft.discounted_price.filter(|_| draft.offer),
            image_urls,
            owner_ref,
        };

        self.persist(data, &mode).await
    }

    /// Read the listing being edited and check the current user owns it.
    ///
    /// Returns the listing's owner, which the edit keeps.
    async fn authorize_edit(&self, id: &ListingId) -> Result<UserId> {
        let existing = self
            .store
            .get(id)
            .await
            .map_err(|error| Error::Query(error.to_string()))?
            .ok_or_else(|| Error::NotFound(format!("Listing {id} does not exist")))?;

        if !existing.is_owned_by(&self.current_user) {
            tracing::warn!(
                listing_id = %id,
                user = %self.current_user,
                "Rejected edit of a listing owned by another user"
            );
            return Err(Error::Authorization(format!(
                "Listing {id} belongs to another user"
            )));
        }

        Ok(existing.data.owner_ref)
    }

    async fn resolve_geolocation(&self, draft: &ListingDraft) -> Result<GeoPoint> {
        if !self.geolocation_enabled {
            return draft.manual_geolocation.ok_or_else(|| {
                Error::Validation("Latitude and longitude are required".to_string())
            });
        }

        let address = draft.address.trim();
        let matches = self.geocoder.resolve(address).await.map_err(|error| match error {
            error @ Error::Geocode(_) => error,
            other => Error::Geocode(other.to_string()),
        })?;

        matches
            .into_iter()
            .next()
            .ok_or_else(|| Error::AddressNotFound(address.to_string()))
    }

    /// Upload every image concurrently; succeed only if all of them do.
    ///
    /// Every upload runs to completion before the batch is judged.
    async fn upload_images(&self, images: &[ImageUpload]) -> Result<Vec<String>> {
        let uploads = images.iter().enumerate().map(|(index, image)| {
            let object_key = image_object_key(&self.current_user, &image.file_name);
            let reporter = ProgressReporter::new(index, &image.file_name, self.progress.clone());
            async move {
                self.uploader
                    .upload(&object_key, image, &reporter)
                    .await
                    .map_err(|error| format!("{}: {error}", image.file_name))
            }
        });

        let results = join_all(uploads).await;
        let failures: Vec<&String> = results.iter().filter_map(|r| r.as_ref().err()).collect();

        if !failures.is_empty() {
            let orphaned = results.len() - failures.len();
            if orphaned > 0 {
                tracing::warn!(
                    orphaned,
                    "Image upload batch failed; successfully uploaded images are left orphaned"
                );
            }
            return Err(Error::Upload(format!(
                "{} of {} images failed to upload ({})",
                failures.len(),
                results.len(),
                failures
                    .iter()
                    .map(|failure| failure.as_str())
                    .collect::<Vec<_>>()
                    .join("; ")
            )));
        }

        tracing::debug!(count = results.len(), "Uploaded listing images");
        Ok(results.into_iter().flatten().collect())
    }

    async fn persist(&self, data: ListingData, mode: &SubmitMode) -> Result<ListingId> {
        data.check_invariants()?;

        let image_count = data.image_urls.len();
        let result = match mode {
            SubmitMode::Create => self.store.create(data).await,
            SubmitMode::Edit(id) => self.store.update(id, data).await.map(|()| id.clone()),
        };

        match result {
            Ok(id) => {
                tracing::info!(listing_id = %id, images = image_count, "Listing saved");
                Ok(id)
            }
            Err(error) => {
                tracing::warn!(
                    images = image_count,
                    "Listing write failed; uploaded images are left orphaned: {error}"
                );
                Err(Error::Persist(error.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::listing::tests::sample_data;
    use crate::models::ListingType;
    use crate::store::MemoryListingStore;
    use crate::test_support::{FakeGeocoder, FakeUploader, RecordingStore};
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    const OWNER: &str = "owner-1";

    struct Harness {
        store: RecordingStore,
        uploader: FakeUploader,
        geocoder: FakeGeocoder,
    }

    impl Harness {
        fn new(geocoder: FakeGeocoder) -> Self {
            Self {
                store: RecordingStore::new(MemoryListingStore::new()),
                uploader: FakeUploader::new(),
                geocoder,
            }
        }

        fn found() -> Self {
            Self::new(FakeGeocoder::found(GeoPoint::new(40.0, -73.0)))
        }

        fn pipeline_for(
            &self,
            user: &str,
        ) -> ListingSubmissionPipeline<RecordingStore, FakeUploader, FakeGeocoder> {
            ListingSubmissionPipeline::new(
                self.store.clone(),
                self.uploader.clone(),
                self.geocoder.clone(),
                UserId::new(user),
            )
        }

        fn pipeline(&self) -> ListingSubmissionPipeline<RecordingStore, FakeUploader, FakeGeocoder> {
            self.pipeline_for(OWNER)
        }

        fn untouched(&self) -> bool {
            self.geocoder.calls() == 0
                && self.uploader.uploaded_keys().is_empty()
                && self.store.writes() == 0
        }
    }

    fn draft(images: &[&str]) -> ListingDraft {
        ListingDraft {
            kind: ListingType::Sale,
            name: "Townhouse".to_string(),
            address: "5 Elm Street".to_string(),
            bedrooms: 3,
            bathrooms: 2,
            regular_price: 1000,
            new_images: images
                .iter()
                .map(|name| ImageUpload::new(*name, vec![1, 2, 3, 4]))
                .collect(),
            ..ListingDraft::default()
        }
    }

    #[tokio::test]
    async fn create_persists_listing_with_ordered_urls() {
        let harness = Harness::found();
        let id = harness
            .pipeline()
            .submit(draft(&["a.jpg", "b.jpg", "c.jpg"]), Vec::new(), SubmitMode::Create)
            .await
            .unwrap();

        let listing = harness.store.inner().get(&id).await.unwrap().unwrap();
        assert_eq!(listing.data.owner_ref, UserId::new(OWNER));
        assert_eq!(listing.data.geolocation, GeoPoint::new(40.0, -73.0));
        assert_eq!(listing.data.location, "5 Elm Street");
        assert_eq!(listing.data.discounted_price, None);

        let urls = &listing.data.image_urls;
        assert_eq!(urls.len(), 3);
        for (url, name) in urls.iter().zip(["a.jpg", "b.jpg", "c.jpg"]) {
            assert!(url.starts_with("https://cdn.test/images/"));
            assert!(url.ends_with(&format!("-{OWNER}-{name}")), "{url}");
        }
    }

    #[tokio::test]
    async fn uploads_run_concurrently() {
        let harness = Harness::found();
        harness
            .pipeline()
            .submit(draft(&["a.jpg", "b.jpg", "c.jpg", "d.jpg"]), Vec::new(), SubmitMode::Create)
            .await
            .unwrap();
        assert_eq!(harness.uploader.max_in_flight(), 4);
    }

    #[tokio::test]
    async fn discount_above_regular_price_is_rejected_before_any_call() {
        let harness = Harness::found();
        let mut offer = draft(&["a.jpg"]);
        offer.offer = true;
        offer.regular_price = 1000;
        offer.discounted_price = Some(1200);

        let error = harness
            .pipeline()
            .submit(offer, Vec::new(), SubmitMode::Create)
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Validation(_)));
        assert!(harness.untouched());
    }

    #[tokio::test]
    async fn image_count_boundaries() {
        for (count, ok) in [(0, false), (1, true), (6, true), (7, false)] {
            let harness = Harness::found();
            let names: Vec<String> = (0..count).map(|index| format!("{index}.jpg")).collect();
            let names: Vec<&str> = names.iter().map(String::as_str).collect();

            let result = harness
                .pipeline()
                .submit(draft(&names), Vec::new(), SubmitMode::Create)
                .await;

            assert_eq!(result.is_ok(), ok, "{count} images");
            if !ok {
                assert!(matches!(result, Err(Error::Validation(_))));
                assert!(harness.untouched());
            }
        }
    }

    #[tokio::test]
    async fn unknown_address_stops_before_upload() {
        let harness = Harness::new(FakeGeocoder::no_match());
        let error = harness
            .pipeline()
            .submit(draft(&["a.jpg"]), Vec::new(), SubmitMode::Create)
            .await
            .unwrap_err();

        assert!(matches!(error, Error::AddressNotFound(address) if address == "5 Elm Street"));
        assert_eq!(harness.geocoder.calls(), 1);
        assert!(harness.uploader.uploaded_keys().is_empty());
        assert_eq!(harness.store.writes(), 0);
    }

    #[tokio::test]
    async fn geocoder_failure_maps_to_geocode_error() {
        let harness = Harness::new(FakeGeocoder::failing());
        let error = harness
            .pipeline()
            .submit(draft(&["a.jpg"]), Vec::new(), SubmitMode::Create)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Geocode(_)));
        assert_eq!(harness.store.writes(), 0);
    }

    #[tokio::test]
    async fn manual_coordinates_bypass_geocoder() {
        let harness = Harness::found();
        let mut manual = draft(&["a.jpg"]);
        manual.manual_geolocation = Some(GeoPoint::new(-33.86, 151.21));

        let id = harness
            .pipeline()
            .with_geolocation(false)
            .submit(manual, Vec::new(), SubmitMode::Create)
            .await
            .unwrap();

        assert_eq!(harness.geocoder.calls(), 0);
        let listing = harness.store.inner().get(&id).await.unwrap().unwrap();
        assert_eq!(listing.data.geolocation, GeoPoint::new(-33.86, 151.21));
    }

    #[tokio::test]
    async fn one_failed_upload_fails_the_batch_and_persists_nothing() {
        let harness = Harness::found();
        harness.uploader.fail_on("b.jpg");

        let error = harness
            .pipeline()
            .submit(draft(&["a.jpg", "b.jpg", "c.jpg"]), Vec::new(), SubmitMode::Create)
            .await
            .unwrap_err();

        assert!(matches!(&error, Error::Upload(message) if message.contains("1 of 3")));
        // Siblings still finished and are orphaned.
        assert_eq!(harness.uploader.uploaded_keys().len(), 2);
        assert_eq!(harness.store.writes(), 0);
        assert!(harness.store.inner().is_empty().await);
    }

    #[tokio::test]
    async fn write_failure_surfaces_persist_error() {
        let harness = Harness::found();
        harness.store.fail_writes();

        let error = harness
            .pipeline()
            .submit(draft(&["a.jpg"]), Vec::new(), SubmitMode::Create)
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Persist(_)));
        assert_eq!(harness.uploader.uploaded_keys().len(), 1);
    }

    #[tokio::test]
    async fn edit_merges_kept_and_new_images_and_drops_discount() {
        let harness = Harness::found();
        let existing = ListingData {
            offer: true,
            discounted_price: Some(900),
            regular_price: 1000,
            image_urls: vec![
                "https://cdn.test/keep.jpg".to_string(),
                "https://cdn.test/drop.jpg".to_string(),
            ],
            ..sample_data(OWNER)
        };
        let id = harness.store.inner().create(existing).await.unwrap();
        let listing = harness.store.inner().get(&id).await.unwrap().unwrap();

        let (mut edit, urls) = ListingDraft::from_listing(&listing);
        let kept = crate::models::remove_image_url(&urls, "https://cdn.test/drop.jpg");
        edit.offer = false;
        edit.new_images = vec![ImageUpload::new("new.png", vec![9; 8])];

        let saved = harness
            .pipeline()
            .submit(edit, kept, SubmitMode::Edit(id.clone()))
            .await
            .unwrap();
        assert_eq!(saved, id);

        let updated = harness.store.inner().get(&id).await.unwrap().unwrap();
        assert_eq!(updated.data.discounted_price, None);
        assert_eq!(updated.data.image_urls.len(), 2);
        assert_eq!(updated.data.image_urls[0], "https://cdn.test/keep.jpg");
        assert!(updated.data.image_urls[1].ends_with("-new.png"));
        assert!(updated.created_at > listing.created_at);
    }

    #[tokio::test]
    async fn persist_rejects_documents_breaking_invariants() {
        let harness = Harness::found();
        let stray_discount = ListingData {
            offer: false,
            discounted_price: Some(900),
            ..sample_data(OWNER)
        };

        let error = harness
            .pipeline()
            .persist(stray_discount, &SubmitMode::Create)
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Validation(_)));
        assert_eq!(harness.store.writes(), 0);
    }

    #[tokio::test]
    async fn edit_by_non_owner_fails_after_ownership_read_only() {
        let harness = Harness::found();
        let id = harness.store.inner().create(sample_data(OWNER)).await.unwrap();

        let error = harness
            .pipeline_for("intruder")
            .submit(draft(&["a.jpg"]), Vec::new(), SubmitMode::Edit(id))
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Authorization(_)));
        assert_eq!(harness.store.gets(), 1);
        assert!(harness.untouched());
    }

    #[tokio::test]
    async fn edit_of_missing_listing_is_not_found() {
        let harness = Harness::found();
        let error = harness
            .pipeline()
            .submit(draft(&["a.jpg"]), Vec::new(), SubmitMode::Edit(ListingId::new("gone")))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::NotFound(_)));
        assert!(harness.untouched());
    }

    #[tokio::test]
    async fn progress_events_are_streamed_per_image() {
        let harness = Harness::found();
        let (sender, mut receiver) = mpsc::unbounded_channel();

        harness
            .pipeline()
            .with_progress(sender)
            .submit(draft(&["a.jpg", "b.jpg"]), Vec::new(), SubmitMode::Create)
            .await
            .unwrap();

        let mut completed = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            if event.percent() == 100 {
                completed.push(event.index);
            }
        }
        completed.sort_unstable();
        assert_eq!(completed, vec![0, 1]);
    }
}
