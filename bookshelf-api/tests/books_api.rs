/// Integration tests for the book catalogue

mod common;

use axum::http::StatusCode;
use common::{id_of, TestContext};
use serde_json::{json, Value};
use uuid::Uuid;

fn titles(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|book| book["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_add_book_expands_owner() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("Alice").await;

    let book = ctx
        .add_book(&alice, "Dune", "Frank Herbert", "Science Fiction", 1965)
        .await;

    assert_eq!(book["title"], "Dune");
    assert_eq!(book["genre"], "Science Fiction");
    assert_eq!(book["publishedYear"], 1965);
    assert_eq!(book["addedBy"], alice.id());
    assert_eq!(book["owner"]["name"], "Alice");
    assert_eq!(book["averageRating"].as_f64(), Some(0.0));
    assert_eq!(book["totalReviews"], 0);

    let (status, body) = ctx.get(&format!("/api/books/{}", id_of(&book)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["owner"]["email"], alice.user.email.as_str());
}

#[tokio::test]
async fn test_add_book_requires_auth() {
    let ctx = TestContext::new();

    let (status, _) = ctx
        .post("/api/books", None, json!({ "title": "Dune" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_add_book_missing_and_invalid_fields() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("Alice").await;

    let (status, body) = ctx
        .post(
            "/api/books",
            Some(&alice.token),
            json!({ "title": "Dune", "author": "Frank Herbert", "genre": "Science Fiction" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide all required fields");

    let (status, body) = ctx
        .post(
            "/api/books",
            Some(&alice.token),
            json!({
                "title": "D",
                "author": "Frank Herbert",
                "description": "short",
                "genre": "Cookbook",
                "publishedYear": 999,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(
        body["errors"],
        json!([
            "Description must be between 10 and 2000 characters",
            "Published year must be after 1000",
            "Title must be between 2 and 200 characters",
            "Cookbook is not a valid genre",
        ])
    );

    let (status, body) = ctx
        .post(
            "/api/books",
            Some(&alice.token),
            json!({
                "title": "Dune",
                "author": "Frank Herbert",
                "description": "Politics and sandworms.",
                "genre": "Science Fiction",
                "publishedYear": 1965,
                "averageRating": 5,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_get_book_not_found() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/api/books/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Book not found");

    let (status, body) = ctx.get(&format!("/api/books/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Book not found");
}

#[tokio::test]
async fn test_list_pagination() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("Alice").await;
    for n in 1..=7 {
        ctx.add_book(&alice, &format!("Book {}", n), "Some Author", "Fiction", 2000 + n)
            .await;
    }

    let (status, body) = ctx.get("/api/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 5);
    assert_eq!(body["totalBooks"], 7);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["currentPage"], 1);
    // newest first by default
    assert_eq!(titles(&body)[0], "Book 7");

    let (_, body) = ctx.get("/api/books?page=2", None).await;
    assert_eq!(titles(&body), vec!["Book 2", "Book 1"]);

    let (status, body) = ctx.get("/api/books?page=3&limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 0);
    assert_eq!(body["totalBooks"], 7);

    let (_, body) = ctx.get("/api/books?page=abc&limit=-4", None).await;
    assert_eq!(body["currentPage"], 1);
    assert_eq!(body["count"], 5);

    let (_, body) = ctx.get("/api/books?limit=3", None).await;
    assert_eq!(body["totalPages"], 3);
}

#[tokio::test]
async fn test_search_and_genre_filter() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("Alice").await;
    ctx.add_book(&alice, "Dune", "Frank Herbert", "Science Fiction", 1965).await;
    ctx.add_book(&alice, "Dune Messiah", "Frank Herbert", "Science Fiction", 1969).await;
    ctx.add_book(&alice, "Emma", "Jane Austen", "Romance", 1815).await;
    ctx.add_book(&alice, "100% Pure", "Percy Cent", "Other", 2001).await;

    let (status, body) = ctx.get("/api/books?search=dune&genre=All&sortBy=title", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["Dune", "Dune Messiah"]);

    let (_, body) = ctx.get("/api/books?search=AUSTEN", None).await;
    assert_eq!(titles(&body), vec!["Emma"]);

    let (_, body) = ctx.get("/api/books?genre=Romance", None).await;
    assert_eq!(titles(&body), vec!["Emma"]);

    let (_, body) = ctx
        .get("/api/books?genre=Science%20Fiction&sortBy=-publishedYear", None)
        .await;
    assert_eq!(titles(&body), vec!["Dune Messiah", "Dune"]);

    // LIKE metacharacters match literally
    let (_, body) = ctx.get("/api/books?search=%25", None).await;
    assert_eq!(titles(&body), vec!["100% Pure"]);

    let (_, body) = ctx.get("/api/books?search=_", None).await;
    assert_eq!(body["totalBooks"], 0);
}

#[tokio::test]
async fn test_invalid_genre_and_sort() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/api/books?genre=Cookbook", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"], json!(["Cookbook is not a valid genre"]));

    let (status, body) = ctx.get("/api/books?sortBy=-password", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"][0].as_str().unwrap().contains("password"));
}

#[tokio::test]
async fn test_owner_updates_only_provided_fields() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("Alice").await;
    let book = ctx
        .add_book(&alice, "Dune", "Frank Herbert", "Science Fiction", 1965)
        .await;
    let uri = format!("/api/books/{}", id_of(&book));

    let (status, body) = ctx
        .put(&uri, Some(&alice.token), json!({ "title": "  Dune (1965)  " }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Book updated successfully");
    assert_eq!(body["data"]["title"], "Dune (1965)");
    assert_eq!(body["data"]["author"], "Frank Herbert");
    assert_eq!(body["data"]["publishedYear"], 1965);

    let (status, body) = ctx
        .put(&uri, Some(&alice.token), json!({ "genre": "Cookbook" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"], json!(["Cookbook is not a valid genre"]));
}

#[tokio::test]
async fn test_update_with_blank_field_is_rejected() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("Alice").await;
    let book = ctx
        .add_book(&alice, "Dune", "Frank Herbert", "Science Fiction", 1965)
        .await;
    let uri = format!("/api/books/{}", id_of(&book));

    let (status, body) = ctx
        .put(&uri, Some(&alice.token), json!({ "title": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(
        body["errors"],
        json!(["Title must be between 2 and 200 characters"])
    );

    let (status, body) = ctx
        .put(&uri, Some(&alice.token), json!({ "description": "" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");

    let (_, body) = ctx.get(&uri, None).await;
    assert_eq!(body["data"]["title"], "Dune");
}

#[tokio::test]
async fn test_non_owner_cannot_modify_book() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("Alice").await;
    let mallory = ctx.seed_user("Mallory").await;
    let book = ctx
        .add_book(&alice, "Dune", "Frank Herbert", "Science Fiction", 1965)
        .await;
    let uri = format!("/api/books/{}", id_of(&book));

    let (status, body) = ctx
        .put(&uri, Some(&mallory.token), json!({ "title": "Defaced" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "You are not authorized to perform this action. Only the book creator can edit or delete this book."
    );

    let (status, _) = ctx.delete(&uri, Some(&mallory.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx.get(&uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Dune");

    let (status, _) = ctx
        .put(&format!("/api/books/{}", Uuid::new_v4()), Some(&mallory.token), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_book_removes_reviews() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("Alice").await;
    let bob = ctx.seed_user("Bob").await;
    let book = ctx
        .add_book(&alice, "Dune", "Frank Herbert", "Science Fiction", 1965)
        .await;
    let review = ctx.add_review(&bob, &id_of(&book), 4).await;

    let (status, body) = ctx
        .delete(&format!("/api/books/{}", id_of(&book)), Some(&alice.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book deleted successfully");
    assert_eq!(body["data"], json!({}));

    let (status, _) = ctx.get(&format!("/api/books/{}", id_of(&book)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.get(&format!("/api/reviews/{}", id_of(&review)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = ctx.get("/api/reviews/user/my-reviews", Some(&bob.token)).await;
    assert_eq!(body["totalReviews"], 0);
}

#[tokio::test]
async fn test_my_books_lists_only_own_books() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("Alice").await;
    let bob = ctx.seed_user("Bob").await;
    ctx.add_book(&alice, "Dune", "Frank Herbert", "Science Fiction", 1965).await;
    ctx.add_book(&bob, "Emma", "Jane Austen", "Romance", 1815).await;
    ctx.add_book(&alice, "Hyperion", "Dan Simmons", "Science Fiction", 1989).await;

    let (status, body) = ctx.get("/api/books/user/my-books", Some(&alice.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalBooks"], 2);
    assert_eq!(titles(&body), vec!["Hyperion", "Dune"]);

    let (status, _) = ctx.get("/api/books/user/my-books", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_genres() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/api/books/genres", None).await;
    assert_eq!(status, StatusCode::OK);

    let genres = body["data"].as_array().unwrap();
    assert_eq!(genres.len(), 16);
    assert_eq!(genres[0], "Fiction");
    assert!(genres.contains(&json!("Science Fiction")));
    assert!(!genres.contains(&json!("All")));
}
