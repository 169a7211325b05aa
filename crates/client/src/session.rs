//! Session state container.
//!
//! [`SessionContext`] is the one in-memory source of truth for the cart and
//! the signed-in participant. It is created once with [`SessionContext::init`],
//! which restores the last snapshot from durable storage, and every change to
//! the login flag or profile is written back immediately.
//!
//! Profile mutations are applied locally first, stamped with `updatedAt`,
//! persisted, and then pushed to the profile API when an identity session is
//! available. Remote failures are logged and never retried or rolled back;
//! the store rejects writes older than the copy it holds. Changes made
//! without an identity session (after a restart) reach the store at the next
//! sign-in, when the local copy is newer than the remote one.
//!
//! The cart lives in memory only.

use chrono::Utc;
use secrecy::SecretString;
use thiserror::Error;

use varnothsava_core::{
    CartItem, Email, EmailError, EventId, Fee, NewProfile, ProfileCode, ProfileSummary,
    RegisteredEvent, StudentType, UserProfile,
};

use crate::gateway::{GatewayError, ProfileGateway, ProfileLookup};
use crate::identity::{IdentityError, IdentityProvider, IdentitySession};
use crate::storage::{KeyValueStore, SessionStore, StorageError};

const AVATAR_BASE_URL: &str = "https://api.dicebear.com/7.x/avataaars/svg";

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid e-mail: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("an account already exists for this e-mail")]
    AccountExists,

    #[error("not signed in")]
    NotSignedIn,

    #[error("no profile for the current session")]
    NoProfile,

    #[error("cart is empty")]
    EmptyCart,

    #[error("registration e-mail does not match the signed-in account {expected}")]
    EmailMismatch { expected: String },

    #[error("profile API refused the profile read with status {0}")]
    ProfileUnavailable(u16),

    #[error("identity provider error: {0}")]
    Identity(IdentityError),

    #[error("profile API error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<IdentityError> for SessionError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials => Self::InvalidCredentials,
            IdentityError::AccountExists => Self::AccountExists,
            other => Self::Identity(other),
        }
    }
}

impl SessionError {
    /// Text for a blocking alert.
    #[must_use]
    pub fn alert_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid e-mail address.".to_string(),
            Self::InvalidCredentials => {
                "Invalid credentials or user not found. Please register.".to_string()
            }
            Self::AccountExists => {
                "An account already exists for this e-mail. Please log in.".to_string()
            }
            Self::NotSignedIn => "Please log in first.".to_string(),
            Self::NoProfile => "Please complete your registration first.".to_string(),
            Self::EmptyCart => "Your cart is empty.".to_string(),
            Self::EmailMismatch { expected } => {
                format!("Please register with the e-mail you signed in with ({expected}).")
            }
            Self::ProfileUnavailable(_) => {
                "Could not load your profile. Please try again.".to_string()
            }
            Self::Identity(IdentityError::Rejected { message, .. }) => message.clone(),
            Self::Identity(_) => {
                "Could not reach the sign-in service. Please try again.".to_string()
            }
            Self::Gateway(_) => "Could not reach the festival server. Please try again.".to_string(),
            Self::Storage(_) => "Could not save your session on this device.".to_string(),
        }
    }
}

/// Where the UI should go after a successful sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A stored profile was found.
    SignedIn,
    /// Authenticated but no profile yet; route to registration.
    NeedsOnboarding,
}

/// What a checkout paid for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub amount: Fee,
    pub events: Vec<EventId>,
}

/// Default avatar for a new participant.
#[must_use]
pub fn default_avatar(seed: &str) -> String {
    let seed: String = url::form_urlencoded::byte_serialize(seed.as_bytes()).collect();
    format!("{AVATAR_BASE_URL}?seed={seed}")
}

/// Cart, login, onboarding and profile state.
pub struct SessionContext<I, G, S> {
    identity: I,
    gateway: G,
    storage: SessionStore<S>,
    institution_domain: String,
    cart: Vec<CartItem>,
    is_logged_in: bool,
    needs_onboarding: bool,
    profile: Option<UserProfile>,
    auth: Option<IdentitySession>,
}

impl<I, G, S> SessionContext<I, G, S>
where
    I: IdentityProvider,
    G: ProfileGateway,
    S: KeyValueStore,
{
    /// Create the context and restore the persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn init(
        identity: I,
        gateway: G,
        store: S,
        institution_domain: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let storage = SessionStore::new(store);
        let snapshot = storage.load()?;
        tracing::debug!(
            restored = snapshot.profile.is_some(),
            "session initialized"
        );

        Ok(Self {
            identity,
            gateway,
            storage,
            institution_domain: institution_domain.into(),
            cart: Vec::new(),
            is_logged_in: snapshot.is_logged_in,
            needs_onboarding: false,
            profile: snapshot.profile,
            auth: None,
        })
    }

    pub fn cart(&self) -> &[CartItem] {
        &self.cart
    }

    pub fn total_amount(&self) -> Fee {
        self.cart.iter().map(|item| item.fee).sum()
    }

    pub const fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    pub const fn needs_onboarding(&self) -> bool {
        self.needs_onboarding
    }

    pub const fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// The identity-provider session, if signed in during this run.
    pub const fn identity_session(&self) -> Option<&IdentitySession> {
        self.auth.as_ref()
    }

    /// Add an item unless one with the same id is already in the cart.
    pub fn add_to_cart(&mut self, item: CartItem) -> bool {
        if self.cart.iter().any(|existing| existing.id == item.id) {
            return false;
        }
        self.cart.push(item);
        true
    }

    pub fn remove_from_cart(&mut self, id: &EventId) -> bool {
        let before = self.cart.len();
        self.cart.retain(|item| &item.id != id);
        self.cart.len() != before
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    /// Sign in and load the stored profile.
    ///
    /// State is only touched once both the credential check and the profile
    /// fetch have succeeded. A restored profile for the same account with a
    /// newer `updatedAt` than the stored one is kept and pushed.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed e-mail, rejected credentials, a
    /// transport failure, or a profile read the API refused for a reason
    /// other than "not found"; show it with [`SessionError::alert_message`].
    #[tracing::instrument(skip(self, password))]
    pub async fn login(
        &mut self,
        email: &str,
        password: &SecretString,
    ) -> Result<LoginOutcome, SessionError> {
        let email = Email::parse(email)?;

        let auth = self
            .identity
            .sign_in(&email, password)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "sign-in failed"))?;

        let lookup = self
            .gateway
            .lookup_profile(&auth.id_token)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "profile fetch failed"))?;
        let remote = remote_profile(lookup)?;

        tracing::info!(uid = %auth.uid, stored = remote.is_some(), "signed in");
        self.auth = Some(auth);
        self.reconcile(remote).await
    }

    /// Re-read the profile from the store.
    ///
    /// The stored copy replaces the local one unless the local one carries a
    /// newer stamp, in which case it is pushed instead.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no identity session or the fetch fails.
    pub async fn refresh_profile(&mut self) -> Result<LoginOutcome, SessionError> {
        let auth = self.auth.as_ref().ok_or(SessionError::NotSignedIn)?;
        let lookup = self.gateway.lookup_profile(&auth.id_token).await?;
        let remote = remote_profile(lookup)?;
        self.reconcile(remote).await
    }

    async fn reconcile(
        &mut self,
        remote: Option<UserProfile>,
    ) -> Result<LoginOutcome, SessionError> {
        let keep_local = match (&self.auth, &self.profile) {
            (Some(auth), Some(local)) => {
                local.id == auth.uid && local.is_newer_than(remote.as_ref())
            }
            _ => false,
        };
        if !keep_local {
            return self.adopt(remote);
        }

        tracing::info!("local profile is newer than the stored copy; pushing it");
        self.is_logged_in = true;
        self.needs_onboarding = false;
        self.persist()?;
        self.push_profile().await;
        Ok(LoginOutcome::SignedIn)
    }

    fn adopt(&mut self, profile: Option<UserProfile>) -> Result<LoginOutcome, SessionError> {
        let outcome = if profile.is_some() {
            LoginOutcome::SignedIn
        } else {
            LoginOutcome::NeedsOnboarding
        };
        self.profile = profile;
        self.is_logged_in = true;
        self.needs_onboarding = outcome == LoginOutcome::NeedsOnboarding;
        self.persist()?;
        Ok(outcome)
    }

    /// Sign out and forget the profile. The cart is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleared snapshot cannot be written.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&mut self) -> Result<(), SessionError> {
        if let Some(auth) = self.auth.take()
            && let Err(e) = self.identity.sign_out(&auth).await
        {
            tracing::warn!(error = %e, "identity sign-out failed");
        }
        self.is_logged_in = false;
        self.needs_onboarding = false;
        self.profile = None;
        self.persist()
    }

    /// Create the participant's profile and store it remotely.
    ///
    /// Without an identity session a `password` creates the account first.
    /// The new account is kept even if storing the profile fails, so the
    /// registration can be retried without signing up again.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no identity session and no password, the
    /// form's e-mail is not the signed-in account's, the account cannot be
    /// created, or the profile API refuses the profile. The session flags and
    /// profile are unchanged on error.
    #[tracing::instrument(skip(self, form, password), fields(email = %form.email))]
    pub async fn register_user(
        &mut self,
        form: NewProfile,
        password: Option<&SecretString>,
    ) -> Result<UserProfile, SessionError> {
        let auth = if let Some(auth) = &self.auth {
            if !form.email.matches(&auth.email) {
                tracing::warn!(signed_in = %auth.email, "registration e-mail differs from account");
                return Err(SessionError::EmailMismatch {
                    expected: auth.email.clone(),
                });
            }
            auth.clone()
        } else {
            let password = password.ok_or(SessionError::NotSignedIn)?;
            let auth = self.identity.sign_up(&form.email, password).await?;
            self.auth = Some(auth.clone());
            auth
        };

        let student_type = StudentType::classify(&form.email, &self.institution_domain);
        let avatar = default_avatar(&form.name);
        let code = ProfileCode::generate(&mut rand::rng());
        let mut profile =
            UserProfile::from_registration(auth.uid.clone(), form, code, student_type, avatar);
        profile.updated_at = Some(Utc::now());

        if let Err(e) = self
            .gateway
            .submit_profile(&auth.id_token, &auth.uid, &profile)
            .await
        {
            tracing::error!(error = %e, uid = %auth.uid, "profile registration failed");
            return Err(e.into());
        }

        tracing::info!(uid = %auth.uid, code = %profile.profile_code, %student_type, "registered");
        self.profile = Some(profile.clone());
        self.is_logged_in = true;
        self.needs_onboarding = false;
        self.persist()?;
        Ok(profile)
    }

    /// Mark the festival fee as paid.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no profile or the change cannot be persisted.
    pub async fn mark_as_paid(&mut self) -> Result<(), SessionError> {
        self.update_profile(|profile| profile.has_paid = true).await
    }

    /// Merge event registrations by id. Returns how many were new.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no profile or the change cannot be persisted.
    pub async fn update_registered_events(
        &mut self,
        events: Vec<RegisteredEvent>,
    ) -> Result<usize, SessionError> {
        self.update_profile(|profile| profile.merge_registered_events(events))
            .await
    }

    /// Register for one event. A blank team name is a solo registration.
    ///
    /// Returns `false` if already registered.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no profile or the change cannot be persisted.
    pub async fn register_for_event(
        &mut self,
        id: EventId,
        team_name: Option<&str>,
    ) -> Result<bool, SessionError> {
        let profile = self.profile.as_ref().ok_or(SessionError::NoProfile)?;
        if profile.is_registered_for(&id) {
            return Ok(false);
        }
        let event = RegisteredEvent::new(id, team_name);
        self.update_registered_events(vec![event])
            .await
            .map(|added| added > 0)
    }

    /// Replace the avatar URL.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no profile or the change cannot be persisted.
    pub async fn update_avatar(&mut self, url: impl Into<String>) -> Result<(), SessionError> {
        let url = url.into();
        self.update_profile(|profile| profile.avatar = url).await
    }

    /// Pay for the cart: mark the fee paid and register every cart event as
    /// a solo participation. The cart is cleared on success.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no profile, the cart is empty, or the
    /// change cannot be persisted (the cart is kept in that case).
    #[tracing::instrument(skip(self))]
    pub async fn checkout(&mut self) -> Result<Receipt, SessionError> {
        if self.profile.is_none() {
            return Err(SessionError::NoProfile);
        }
        if self.cart.is_empty() {
            return Err(SessionError::EmptyCart);
        }

        let receipt = Receipt {
            amount: self.total_amount(),
            events: self.cart.iter().map(|item| item.id.clone()).collect(),
        };
        let cart = std::mem::take(&mut self.cart);
        let registrations: Vec<_> = receipt
            .events
            .iter()
            .cloned()
            .map(RegisteredEvent::solo)
            .collect();

        let result = self
            .update_profile(|profile| {
                profile.has_paid = true;
                profile.merge_registered_events(registrations);
            })
            .await;

        match result {
            Ok(()) => {
                tracing::info!(amount = %receipt.amount, events = receipt.events.len(), "checkout complete");
                Ok(receipt)
            }
            Err(e) => {
                self.cart = cart;
                Err(e)
            }
        }
    }

    /// Look up a teammate by profile code.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no identity session or the lookup fails.
    pub async fn find_member(
        &self,
        code: &ProfileCode,
    ) -> Result<Option<ProfileSummary>, SessionError> {
        let auth = self.auth.as_ref().ok_or(SessionError::NotSignedIn)?;
        Ok(self.gateway.find_member(&auth.id_token, code).await?)
    }

    /// Apply `apply` to a copy of the profile and adopt it once persisted.
    async fn update_profile<T>(
        &mut self,
        apply: impl FnOnce(&mut UserProfile) -> T,
    ) -> Result<T, SessionError> {
        let mut updated = self.profile.clone().ok_or(SessionError::NoProfile)?;
        let out = apply(&mut updated);
        updated.updated_at = Some(Utc::now());
        save_snapshot(&mut self.storage, Some(&updated), self.is_logged_in)?;
        self.profile = Some(updated);
        self.push_profile().await;
        Ok(out)
    }

    async fn push_profile(&self) {
        let (Some(auth), Some(profile)) = (&self.auth, &self.profile) else {
            tracing::debug!("no identity session; profile change kept locally");
            return;
        };

        match self
            .gateway
            .submit_profile(&auth.id_token, &auth.uid, profile)
            .await
        {
            Ok(()) => tracing::debug!(uid = %auth.uid, "profile synced"),
            Err(e) if e.is_stale_write() => {
                tracing::warn!(uid = %auth.uid, error = %e, "store holds a newer profile");
            }
            Err(e) => tracing::error!(uid = %auth.uid, error = %e, "profile sync failed"),
        }
    }

    fn persist(&mut self) -> Result<(), SessionError> {
        save_snapshot(&mut self.storage, self.profile.as_ref(), self.is_logged_in)
    }
}

fn save_snapshot<S: KeyValueStore>(
    storage: &mut SessionStore<S>,
    profile: Option<&UserProfile>,
    is_logged_in: bool,
) -> Result<(), SessionError> {
    storage
        .save(profile, is_logged_in)
        .inspect_err(|e| tracing::error!(error = %e, "failed to persist session"))?;
    Ok(())
}

/// The stored profile, or why there is none. Only "not found" means onboarding.
fn remote_profile(lookup: ProfileLookup) -> Result<Option<UserProfile>, SessionError> {
    match lookup {
        ProfileLookup::Found(profile) => Ok(Some(profile)),
        ProfileLookup::Missing => Ok(None),
        ProfileLookup::Refused { status } => Err(SessionError::ProfileUnavailable(status)),
    }
}
