/// Book rating aggregation
///
/// `average_rating` and `total_reviews` on a book are derived from its
/// reviews. After every review create, update or delete the handler calls
/// [`recompute`]. The store reads the review set and writes both fields in
/// one atomic step, so a recompute never pairs a count from one review set
/// with an average from another.
///
/// # Example
///
/// ```
/// use bookshelf_shared::rating::rounded_average;
///
/// assert_eq!(rounded_average(2, 9), 4.5);   // 4 and 5
/// assert_eq!(rounded_average(4, 17), 4.3);  // 4.25 rounds half up
/// assert_eq!(rounded_average(0, 0), 0.0);   // unreviewed
/// ```

use tracing::debug;
use uuid::Uuid;

use crate::store::{Store, StoreResult};

/// Mean of `count` ratings summing to `sum`, rounded half-up to one decimal
///
/// Works in integer tenths so results like 4.25 -> 4.3 don't depend on
/// binary floating point.
pub fn rounded_average(count: i64, sum: i64) -> f64 {
    if count <= 0 {
        return 0.0;
    }

    // floor(sum / count * 10 + 0.5) == floor((20 * sum + count) / (2 * count))
    let tenths = (sum * 20 + count) / (count * 2);
    tenths as f64 / 10.0
}

/// Re-aggregates a book's reviews into its rating fields
///
/// A book deleted in the meantime is skipped silently.
pub async fn recompute(store: &dyn Store, book_id: Uuid) -> StoreResult<()> {
    match store.refresh_book_rating(book_id).await? {
        Some(book) => debug!(
            book_id = %book_id,
            average_rating = book.average_rating,
            total_reviews = book.total_reviews,
            "Recomputed book rating"
        ),
        None => debug!(book_id = %book_id, "Book no longer exists, rating not updated"),
    }

    Ok(())
}
