//! Store-backed marketplace operations used by the UI layer.

use crate::config::MarketplaceConfig;
use crate::geocode::GeocodeResolver;
use crate::models::{ContactLink, Listing, ListingDraft, ListingId, ListingType, UserId, UserProfile};
use crate::pagination::ListingPaginator;
use crate::pipeline::ListingSubmissionPipeline;
use crate::storage::BlobUploader;
use crate::store::{ListingFilter, ListingQuery, ListingStore, ProfileStore};
use crate::{Error, Result};

/// Shared service for listing reads, owner actions, and profile lookups.
#[derive(Debug, Clone)]
pub struct MarketplaceService<S> {
    store: S,
    config: MarketplaceConfig,
    current_user: Option<UserId>,
}

impl<S> MarketplaceService<S>
where
    S: ListingStore + ProfileStore + Clone,
{
    /// Create a service for an anonymous visitor.
    pub const fn new(store: S, config: MarketplaceConfig) -> Self {
        Self {
            store,
            config,
            current_user: None,
        }
    }

    /// Act on behalf of a signed-in user.
    #[must_use]
    pub fn signed_in(mut self, user: UserId) -> Self {
        self.current_user = Some(user);
        self
    }

    pub const fn config(&self) -> &MarketplaceConfig {
        &self.config
    }

    pub const fn current_user(&self) -> Option<&UserId> {
        self.current_user.as_ref()
    }

    fn require_user(&self) -> Result<&UserId> {
        self.current_user
            .as_ref()
            .ok_or_else(|| Error::Authorization("Sign in to manage listings".to_string()))
    }

    /// Fetch one listing for the detail page.
    pub async fn listing(&self, id: &ListingId) -> Result<Listing> {
        self.store
            .get(id)
            .await
            .map_err(|error| Error::Query(error.to_string()))?
            .ok_or_else(|| Error::NotFound(format!("Listing {id} does not exist")))
    }

    /// Newest listings of any kind, for the home slider.
    pub async fn recent_listings(&self) -> Result<Vec<Listing>> {
        let query = ListingQuery::new(ListingFilter::All).limit(self.config.recent_limit);
        let page = self
            .store
            .query(&query)
            .await
            .map_err(|error| Error::Query(error.to_string()))?;
        tracing::debug!(count = page.listings.len(), "Loaded recent listings");
        Ok(page.listings)
    }

    /// Paginator over one category (`rent` or `sale`).
    pub fn category(&self, kind: ListingType) -> ListingPaginator<S> {
        self.paginator(ListingFilter::Type(kind))
    }

    /// Paginator over listings currently on offer.
    pub fn offers(&self) -> ListingPaginator<S> {
        self.paginator(ListingFilter::Offer(true))
    }

    /// Paginator over one user's listings, for the profile page.
    pub fn owned_by(&self, user: UserId) -> ListingPaginator<S> {
        self.paginator(ListingFilter::Owner(user))
    }

    fn paginator(&self, filter: ListingFilter) -> ListingPaginator<S> {
        ListingPaginator::new(self.store.clone(), filter, self.config.page_size)
            .with_count_strategy(self.config.count_strategy)
    }

    /// Submission pipeline for the signed-in user, honoring the geolocation switch.
    pub fn submission_pipeline<U, G>(
        &self,
        uploader: U,
        geocoder: G,
    ) -> Result<ListingSubmissionPipeline<S, U, G>>
    where
        U: BlobUploader,
        G: GeocodeResolver,
    {
        let user = self.require_user()?.clone();
        Ok(
            ListingSubmissionPipeline::new(self.store.clone(), uploader, geocoder, user)
                .with_geolocation(self.config.geolocation_enabled),
        )
    }

    /// Load a listing into an edit form.
    ///
    /// Returns the prefilled draft and the listing's current image URLs.
    pub async fn edit_draft(&self, id: &ListingId) -> Result<(ListingDraft, Vec<String>)> {
        let listing = self.owned_listing(id).await?;
        Ok(ListingDraft::from_listing(&listing))
    }

    /// Delete a listing owned by the signed-in user.
    pub async fn delete_listing(&self, id: &ListingId) -> Result<()> {
        self.owned_listing(id).await?;
        self.store
            .delete(id)
            .await
            .map_err(|error| Error::Persist(error.to_string()))?;
        tracing::info!(listing_id = %id, "Listing deleted");
        Ok(())
    }

    async fn owned_listing(&self, id: &ListingId) -> Result<Listing> {
        let user = self.require_user()?;
        let listing = self.listing(id).await?;
        if !listing.is_owned_by(user) {
            return Err(Error::Authorization(format!(
                "Listing {id} belongs to another user"
            )));
        }
        Ok(listing)
    }

    /// Build a mail link to the owner of `listing`.
    pub async fn landlord_contact(&self, listing: &Listing, message: &str) -> Result<ContactLink> {
        let owner = &listing.data.owner_ref;
        let profile = self
            .store
            .get_profile(owner)
            .await
            .map_err(|error| Error::Query(error.to_string()))?
            .ok_or_else(|| Error::NotFound(format!("Could not get landlord data for {owner}")))?;
        Ok(profile.contact_link(&listing.data.name, message))
    }

    /// Change the signed-in user's display name.
    pub async fn update_display_name(&self, name: &str) -> Result<UserProfile> {
        let user = self.require_user()?;
        let current = self
            .store
            .get_profile(user)
            .await
            .map_err(|error| Error::Query(error.to_string()))?
            .ok_or_else(|| Error::NotFound(format!("No profile for {user}")))?;

        if current.name == name.trim() {
            return Ok(current);
        }

        let updated = UserProfile::new(name, current.email)?;
        self.store
            .save_profile(user, &updated)
            .await
            .map_err(|error| Error::Persist(error.to_string()))?;
        tracing::info!(user = %user, "Profile name updated");
        Ok(updated)
    }
}
