//! Access-code allocation
//!
//! Members sign in with their last name plus a short random code. Codes are
//! drawn from an alphabet without look-alike characters (no 0/O, 1/I/L) and
//! must be unique across all members, compared trimmed and ignoring case.
//!
//! Uniqueness is checked against the [`MemberStore`] before the write, and the
//! store's unique index arbitrates the remaining race: a conflicting write
//! makes the allocator draw a fresh code and try again, a bounded number of
//! times.
//!
//! # Example
//!
//! ```no_run
//! use councilhours_shared::access_code::AccessCodeAllocator;
//! use councilhours_shared::store::PgMemberStore;
//! use sqlx::PgPool;
//!
//! # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
//! let allocator = AccessCodeAllocator::new(PgMemberStore::new(pool));
//! let code = allocator.assign_code(42).await?;
//! println!("member 42 now signs in with {}", code);
//! # Ok(())
//! # }
//! ```

use rand::distributions::Uniform;
use rand::prelude::*;
use rand::rngs::OsRng;
use thiserror::Error;

use crate::store::{MemberStore, StoreError};

/// Characters a code may contain
pub const ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Longest code the `members.access_code` column holds
pub const MAX_CODE_LENGTH: usize = 32;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

/// Regenerations allowed after the store rejects a write as a duplicate
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("Could not find a unique access code after {attempts} attempts")]
    ExhaustedAttempts { attempts: u32 },

    #[error("Member not found: {0}")]
    NotFound(i64),

    #[error("Failed to store access code: {0}")]
    Persistence(#[source] StoreError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// Draws one candidate code of `length` characters from the OS CSPRNG
pub fn draw_code(length: usize) -> String {
    let mut rng = OsRng;
    let dist = Uniform::from(0..ALPHABET.len());

    let mut code = String::with_capacity(length);
    for _ in 0..length {
        code.push(ALPHABET[dist.sample(&mut rng)] as char);
    }
    code
}

/// True when `code` consists only of alphabet characters
pub fn is_well_formed(code: &str) -> bool {
    !code.is_empty() && code.bytes().all(|b| ALPHABET.contains(&b))
}

/// Generates unique access codes and assigns them to members
#[derive(Debug, Clone)]
pub struct AccessCodeAllocator<S> {
    store: S,
    length: usize,
    max_attempts: u32,
    max_conflict_retries: u32,
}

impl<S: MemberStore> AccessCodeAllocator<S> {
    /// Allocator with the default policy (6 characters, 10 000 attempts)
    pub fn new(store: S) -> Self {
        Self {
            store,
            length: DEFAULT_CODE_LENGTH,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }

    /// Overrides the code length and draw budget used by [`Self::assign_code`]
    pub fn with_policy(mut self, length: usize, max_attempts: u32) -> Self {
        self.length = length;
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns a code no current member holds
    ///
    /// Draws up to `max_attempts` candidates and returns the first one the
    /// store has no holder for.
    pub async fn generate_unique_code(
        &self,
        length: usize,
        max_attempts: u32,
    ) -> Result<String, AllocationError> {
        if length == 0 {
            return Err(AllocationError::InvalidArgument("length must be at least 1"));
        }
        if max_attempts == 0 {
            return Err(AllocationError::InvalidArgument(
                "max_attempts must be at least 1",
            ));
        }

        for attempt in 1..=max_attempts {
            let candidate = draw_code(length);
            let holder = self
                .store
                .find_member_by_access_code(&candidate)
                .await
                .map_err(AllocationError::Persistence)?;

            if holder.is_none() {
                return Ok(candidate);
            }

            tracing::debug!(attempt, "Access code collision, drawing again");
        }

        tracing::warn!(
            length,
            attempts = max_attempts,
            "Access code space exhausted"
        );
        Err(AllocationError::ExhaustedAttempts {
            attempts: max_attempts,
        })
    }

    /// Gives the member a fresh code and stores it
    ///
    /// Any previous code is overwritten. The code is returned only after the
    /// write succeeded.
    pub async fn assign_code(&self, member_id: i64) -> Result<String, AllocationError> {
        let member = self
            .store
            .find_member_by_id(member_id)
            .await
            .map_err(AllocationError::Persistence)?
            .ok_or(AllocationError::NotFound(member_id))?;

        let mut conflicts = 0;
        loop {
            let code = self
                .generate_unique_code(self.length, self.max_attempts)
                .await?;

            let mut updated = member.clone();
            updated.access_code = Some(code.clone());

            match self.store.persist(&updated).await {
                Ok(()) => {
                    tracing::info!(member_id, "Access code assigned");
                    return Ok(code);
                }
                Err(StoreError::Conflict) if conflicts < self.max_conflict_retries => {
                    conflicts += 1;
                    tracing::warn!(
                        member_id,
                        conflicts,
                        "Access code taken concurrently, regenerating"
                    );
                }
                Err(err) => {
                    tracing::warn!(member_id, error = %err, "Failed to store access code");
                    return Err(AllocationError::Persistence(err));
                }
            }
        }
    }

    /// Assigns codes to every member without one
    ///
    /// Stops at the first failure. Returns the number of codes assigned.
    pub async fn fill_missing_codes(&self) -> Result<usize, AllocationError> {
        let members = self
            .store
            .list_members_without_code()
            .await
            .map_err(AllocationError::Persistence)?;

        for member in &members {
            self.assign_code(member.id).await?;
        }

        if !members.is_empty() {
            tracing::info!(count = members.len(), "Filled missing access codes");
        }
        Ok(members.len())
    }
}
