/// In-memory store
///
/// Keeps every table in a `HashMap` behind one `tokio::sync::RwLock`.
/// Uniqueness checks and the insert they guard happen under the same write
/// lock, which gives the same all-or-nothing behaviour as the database
/// constraints. Used by the test suite and by `STORE_BACKEND=memory`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DuplicateKind, Store, StoreError, StoreResult};
use crate::models::book::{
    Book, BookChanges, BookDetail, BookFilter, BookSortField, BookSummary, NewBook,
};
use crate::models::page::{paginate, Page, PageRequest};
use crate::models::review::{NewReview, Review, ReviewChanges, ReviewDetail};
use crate::models::user::{normalize_email, CreateUser, User, UserSummary};
use crate::rating::rounded_average;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    books: HashMap<Uuid, Book>,
    reviews: HashMap<Uuid, Review>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Tables {
    /// Strictly increasing clock so creation order is always observable
    fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    fn book_detail(&self, book: &Book) -> BookDetail {
        BookDetail {
            book: book.clone(),
            owner: self.users.get(&book.added_by).map(UserSummary::from),
        }
    }

    fn review_detail(&self, review: &Review) -> ReviewDetail {
        ReviewDetail {
            review: review.clone(),
            user: self.users.get(&review.user_id).map(UserSummary::from),
            book: self.books.get(&review.book_id).map(BookSummary::from),
        }
    }

    fn reviews_page(&self, page: PageRequest, keep: impl Fn(&Review) -> bool) -> Page<ReviewDetail> {
        let mut reviews: Vec<&Review> = self.reviews.values().filter(|r| keep(*r)).collect();
        reviews.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        paginate(reviews, page).map(|review| self.review_detail(review))
    }
}

/// Case-folded first, then bytewise; matches `BookSortField::sort_keys`
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn compare_books(field: BookSortField, a: &Book, b: &Book) -> Ordering {
    let ordering = match field {
        BookSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        BookSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        BookSortField::Title => compare_text(&a.title, &b.title),
        BookSortField::Author => compare_text(&a.author, &b.author),
        BookSortField::Genre => a.genre.cmp(&b.genre),
        BookSortField::PublishedYear => a.published_year.cmp(&b.published_year),
        BookSortField::AverageRating => a.average_rating.total_cmp(&b.average_rating),
        BookSortField::TotalReviews => a.total_reviews.cmp(&b.total_reviews),
    };

    ordering.then_with(|| a.id.cmp(&b.id))
}

/// Store that lives entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let email = normalize_email(&data.email);
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|user| user.email == email) {
            return Err(StoreError::Duplicate(DuplicateKind::Email));
        }

        let now = tables.now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email,
            password_hash: data.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;

        Ok(tables.users.values().find(|user| user.email == email).cloned())
    }

    async fn create_book(&self, data: NewBook) -> StoreResult<Book> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&data.added_by) {
            return Err(StoreError::NotFound("User"));
        }

        let now = tables.now();
        let book = Book {
            id: Uuid::new_v4(),
            title: data.title,
            author: data.author,
            description: data.description,
            genre: data.genre,
            published_year: data.published_year,
            added_by: data.added_by,
            average_rating: 0.0,
            total_reviews: 0,
            created_at: now,
            updated_at: now,
        };
        tables.books.insert(book.id, book.clone());

        Ok(book)
    }

    async fn find_book(&self, id: Uuid) -> StoreResult<Option<Book>> {
        Ok(self.tables.read().await.books.get(&id).cloned())
    }

    async fn find_book_detail(&self, id: Uuid) -> StoreResult<Option<BookDetail>> {
        let tables = self.tables.read().await;

        Ok(tables.books.get(&id).map(|book| tables.book_detail(book)))
    }

    async fn list_books(
        &self,
        filter: &BookFilter,
        page: PageRequest,
    ) -> StoreResult<Page<BookDetail>> {
        let tables = self.tables.read().await;

        let mut books: Vec<&Book> = tables
            .books
            .values()
            .filter(|book| filter.matches(book))
            .collect();

        let sort = filter.sort;
        books.sort_by(|a, b| {
            let ordering = compare_books(sort.field, a, b);
            if sort.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        Ok(paginate(books, page).map(|book| tables.book_detail(book)))
    }

    async fn update_book(&self, id: Uuid, changes: BookChanges) -> StoreResult<Option<Book>> {
        let mut tables = self.tables.write().await;
        let now = tables.now();

        Ok(tables.books.get_mut(&id).map(|book| {
            changes.apply_to(book);
            book.updated_at = now;
            book.clone()
        }))
    }

    async fn delete_book(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        if tables.books.remove(&id).is_none() {
            return Ok(false);
        }
        tables.reviews.retain(|_, review| review.book_id != id);

        Ok(true)
    }

    async fn refresh_book_rating(&self, id: Uuid) -> StoreResult<Option<Book>> {
        let mut tables = self.tables.write().await;
        if !tables.books.contains_key(&id) {
            return Ok(None);
        }

        let (count, sum) = tables
            .reviews
            .values()
            .filter(|review| review.book_id == id)
            .fold((0_i64, 0_i64), |(count, sum), review| {
                (count + 1, sum + i64::from(review.rating))
            });
        let now = tables.now();

        Ok(tables.books.get_mut(&id).map(|book| {
            book.average_rating = rounded_average(count, sum);
            book.total_reviews = i32::try_from(count).unwrap_or(i32::MAX);
            book.updated_at = now;
            book.clone()
        }))
    }

    async fn create_review(&self, data: NewReview) -> StoreResult<Review> {
        let mut tables = self.tables.write().await;

        if !tables.books.contains_key(&data.book_id) {
            return Err(StoreError::NotFound("Book"));
        }
        if !tables.users.contains_key(&data.user_id) {
            return Err(StoreError::NotFound("User"));
        }
        if tables
            .reviews
            .values()
            .any(|r| r.book_id == data.book_id && r.user_id == data.user_id)
        {
            return Err(StoreError::Duplicate(DuplicateKind::Review));
        }

        let now = tables.now();
        let review = Review {
            id: Uuid::new_v4(),
            book_id: data.book_id,
            user_id: data.user_id,
            rating: data.rating,
            review_text: data.review_text,
            created_at: now,
            updated_at: now,
        };
        tables.reviews.insert(review.id, review.clone());

        Ok(review)
    }

    async fn find_review(&self, id: Uuid) -> StoreResult<Option<Review>> {
        Ok(self.tables.read().await.reviews.get(&id).cloned())
    }

    async fn find_review_detail(&self, id: Uuid) -> StoreResult<Option<ReviewDetail>> {
        let tables = self.tables.read().await;

        Ok(tables
            .reviews
            .get(&id)
            .map(|review| tables.review_detail(review)))
    }

    async fn find_review_by_book_and_user(
        &self,
        book_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Review>> {
        let tables = self.tables.read().await;

        Ok(tables
            .reviews
            .values()
            .find(|r| r.book_id == book_id && r.user_id == user_id)
            .cloned())
    }

    async fn list_reviews_by_book(
        &self,
        book_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<Page<ReviewDetail>> {
        let tables = self.tables.read().await;

        Ok(tables.reviews_page(page, |review| review.book_id == book_id))
    }

    async fn list_reviews_by_user(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<Page<ReviewDetail>> {
        let tables = self.tables.read().await;

        Ok(tables.reviews_page(page, |review| review.user_id == user_id))
    }

    async fn update_review(
        &self,
        id: Uuid,
        changes: ReviewChanges,
    ) -> StoreResult<Option<Review>> {
        let mut tables = self.tables.write().await;
        let now = tables.now();

        Ok(tables.reviews.get_mut(&id).map(|review| {
            changes.apply_to(review);
            review.updated_at = now;
            review.clone()
        }))
    }

    async fn delete_review(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.reviews.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::book::{BookSort, Genre};

    async fn seed_user(store: &MemoryStore, email: &str) -> User {
        store
            .create_user(CreateUser {
                name: "Reader".to_string(),
                email: email.to_string(),
                password_hash: "$argon2id$test".to_string(),
            })
            .await
            .unwrap()
    }

    fn new_book(owner: Uuid, title: &str, year: i32) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: "Frank Herbert".to_string(),
            description: "Sand, worms and politics.".to_string(),
            genre: Genre::ScienceFiction,
            published_year: year,
            added_by: owner,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_case_insensitive() {
        let store = MemoryStore::new();
        seed_user(&store, "reader@example.com").await;

        let result = store
            .create_user(CreateUser {
                name: "Other".to_string(),
                email: " READER@example.com".to_string(),
                password_hash: "$argon2id$test".to_string(),
            })
            .await;

        assert!(matches!(
            result,
            Err(StoreError::Duplicate(DuplicateKind::Email))
        ));
    }

    #[tokio::test]
    async fn test_timestamps_strictly_increase() {
        let store = MemoryStore::new();
        let owner = seed_user(&store, "owner@example.com").await;

        let first = store.create_book(new_book(owner.id, "Dune", 1965)).await.unwrap();
        let second = store
            .create_book(new_book(owner.id, "Dune Messiah", 1969))
            .await
            .unwrap();

        assert!(second.created_at > first.created_at);
    }

    #[tokio::test]
    async fn test_list_books_default_sort_is_newest_first() {
        let store = MemoryStore::new();
        let owner = seed_user(&store, "owner@example.com").await;

        for (title, year) in [("Dune", 1965), ("Dune Messiah", 1969), ("Children of Dune", 1976)] {
            store.create_book(new_book(owner.id, title, year)).await.unwrap();
        }

        let page = store
            .list_books(&BookFilter::default(), PageRequest::new(1, 2))
            .await
            .unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages(), 2);
        let titles: Vec<_> = page.items.iter().map(|d| d.book.title.as_str()).collect();
        assert_eq!(titles, vec!["Children of Dune", "Dune Messiah"]);
        assert_eq!(page.items[0].owner.as_ref().map(|o| o.id), Some(owner.id));
    }

    #[tokio::test]
    async fn test_list_books_sorted_by_year_ascending() {
        let store = MemoryStore::new();
        let owner = seed_user(&store, "owner@example.com").await;

        for (title, year) in [("Children of Dune", 1976), ("Dune", 1965), ("Dune Messiah", 1969)] {
            store.create_book(new_book(owner.id, title, year)).await.unwrap();
        }

        let filter = BookFilter {
            sort: BookSort::parse(Some("publishedYear")).unwrap(),
            ..Default::default()
        };
        let page = store.list_books(&filter, PageRequest::new(1, 10)).await.unwrap();
        let years: Vec<_> = page.items.iter().map(|d| d.book.published_year).collect();

        assert_eq!(years, vec![1965, 1969, 1976]);
    }

    #[tokio::test]
    async fn test_review_requires_existing_book() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "reader@example.com").await;

        let result = store
            .create_review(NewReview {
                book_id: Uuid::new_v4(),
                user_id: user.id,
                rating: 4,
                review_text: "Could not put it down.".to_string(),
            })
            .await;

        assert!(matches!(result, Err(StoreError::NotFound("Book"))));
    }

    #[tokio::test]
    async fn test_second_review_for_same_pair_is_rejected() {
        let store = MemoryStore::new();
        let owner = seed_user(&store, "owner@example.com").await;
        let reader = seed_user(&store, "reader@example.com").await;
        let book = store.create_book(new_book(owner.id, "Dune", 1965)).await.unwrap();
        let review = |rating: i32| NewReview {
            book_id: book.id,
            user_id: reader.id,
            rating,
            review_text: "Could not put it down.".to_string(),
        };

        store.create_review(review(4)).await.unwrap();
        let result = store.create_review(review(1)).await;

        assert!(matches!(
            result,
            Err(StoreError::Duplicate(DuplicateKind::Review))
        ));
        let page = store
            .list_reviews_by_book(book.id, PageRequest::new(1, 10))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].review.rating, 4);
    }

    #[tokio::test]
    async fn test_concurrent_reviews_for_same_pair_insert_once() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let owner = seed_user(&store, "owner@example.com").await;
        let reader = seed_user(&store, "reader@example.com").await;
        let book = store.create_book(new_book(owner.id, "Dune", 1965)).await.unwrap();

        let handles: Vec<_> = (1..=8)
            .map(|rating| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create_review(NewReview {
                            book_id: book.id,
                            user_id: reader.id,
                            rating: rating % 5 + 1,
                            review_text: "Could not put it down.".to_string(),
                        })
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(
                    err,
                    StoreError::Duplicate(DuplicateKind::Review)
                )),
            }
        }

        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_refresh_book_rating() {
        let store = MemoryStore::new();
        let owner = seed_user(&store, "owner@example.com").await;
        let book = store.create_book(new_book(owner.id, "Dune", 1965)).await.unwrap();

        for (email, rating) in [("a@example.com", 4), ("b@example.com", 4), ("c@example.com", 5)] {
            let reader = seed_user(&store, email).await;
            store
                .create_review(NewReview {
                    book_id: book.id,
                    user_id: reader.id,
                    rating,
                    review_text: "Could not put it down.".to_string(),
                })
                .await
                .unwrap();
        }

        let refreshed = store.refresh_book_rating(book.id).await.unwrap().unwrap();
        assert_eq!(refreshed.average_rating, 4.3);
        assert_eq!(refreshed.total_reviews, 3);
        assert!(refreshed.updated_at > book.updated_at);

        assert!(store
            .refresh_book_rating(Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_title_sort_ignores_case() {
        let store = MemoryStore::new();
        let owner = seed_user(&store, "owner@example.com").await;

        for title in ["dune", "Emma", "Anathem", "emma"] {
            store.create_book(new_book(owner.id, title, 2000)).await.unwrap();
        }

        let filter = BookFilter {
            sort: BookSort::parse(Some("title")).unwrap(),
            ..Default::default()
        };
        let page = store.list_books(&filter, PageRequest::new(1, 10)).await.unwrap();
        let titles: Vec<_> = page.items.iter().map(|d| d.book.title.as_str()).collect();

        assert_eq!(titles, vec!["Anathem", "dune", "Emma", "emma"]);
    }
}
