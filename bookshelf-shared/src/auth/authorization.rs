/// Ownership checks for mutating books and reviews
///
/// Only the user who created a book (`added_by`) or wrote a review
/// (`user_id`) may change or delete it. Handlers load the target once and
/// pass the lookup result here; on success the loaded entity is handed back
/// so no second fetch is needed.
///
/// # Example
///
/// ```
/// use bookshelf_shared::auth::authorization::{require_ownership, OwnershipError};
/// use bookshelf_shared::models::review::Review;
/// use uuid::Uuid;
///
/// fn check(found: Option<Review>, requester: Uuid) -> Result<Review, OwnershipError> {
///     require_ownership(found, requester)
/// }
///
/// assert_eq!(
///     check(None, Uuid::new_v4()).unwrap_err().to_string(),
///     "Review not found"
/// );
/// ```

use uuid::Uuid;

use crate::models::book::Book;
use crate::models::review::Review;

/// A resource with a single owning user
pub trait Owned {
    /// Resource name used in messages ("Book", "Review")
    const RESOURCE: &'static str;

    /// Lowercase noun for the owner role ("book creator", "review creator")
    const OWNER_ROLE: &'static str;

    /// ID of the owning user
    fn owner_id(&self) -> Uuid;
}

impl Owned for Book {
    const RESOURCE: &'static str = "Book";
    const OWNER_ROLE: &'static str = "book creator";

    fn owner_id(&self) -> Uuid {
        self.added_by
    }
}

impl Owned for Review {
    const RESOURCE: &'static str = "Review";
    const OWNER_ROLE: &'static str = "review creator";

    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

/// Error type for ownership checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OwnershipError {
    /// The target does not exist
    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    /// The requester is not the owner
    #[error(
        "You are not authorized to perform this action. Only the {owner_role} can edit or delete this {noun}."
    )]
    NotOwner {
        owner_role: &'static str,
        noun: String,
    },
}

/// Returns the entity if it exists and belongs to `requester`
///
/// # Errors
///
/// - `OwnershipError::NotFound` if `found` is None
/// - `OwnershipError::NotOwner` if someone else owns it
pub fn require_ownership<T: Owned>(found: Option<T>, requester: Uuid) -> Result<T, OwnershipError> {
    let entity = found.ok_or(OwnershipError::NotFound {
        resource: T::RESOURCE,
    })?;

    if entity.owner_id() != requester {
        return Err(OwnershipError::NotOwner {
            owner_role: T::OWNER_ROLE,
            noun: T::RESOURCE.to_lowercase(),
        });
    }

    Ok(entity)
}
