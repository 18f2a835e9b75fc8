//! Integration tests for the User repository using in-memory SurrealDB.

use chrono::Utc;
use doorman_core::error::DoormanError;
use doorman_core::models::user::{ExternalProfile, User};
use doorman_core::repository::{UserFilter, UserRepository};
use doorman_db::repository::SurrealUserRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

/// Helper: spin up an in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    doorman_db::run_migrations(&db).await.unwrap();
    db
}

#[tokio::test]
async fn save_and_find_by_id() {
    let repo = SurrealUserRepository::new(setup().await);

    let mut user = User::new_local("alice", "alice@example.com");
    user.password_hash = Some("$argon2id$fake".into());
    let saved = repo.save(&user).await.unwrap();

    assert_eq!(saved.id, user.id);
    assert_eq!(saved.user_name, "alice");
    assert_eq!(saved.email, "alice@example.com");
    assert!(!saved.enabled);
    assert!(saved.confirmed_date.is_none());
    assert_eq!(saved.password_hash.as_deref(), Some("$argon2id$fake"));

    let fetched = repo.find_by_id(user.id).await.unwrap();
    assert_eq!(fetched.id, user.id);
    assert_eq!(fetched.user_name, "alice");
}

#[tokio::test]
async fn find_one_by_user_name_and_email() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = User::new_local("bob", "bob@example.com");
    repo.save(&user).await.unwrap();

    let by_name = repo
        .find_one(UserFilter::UserName("bob".into()))
        .await
        .unwrap();
    assert_eq!(by_name.id, user.id);

    let by_email = repo
        .find_one(UserFilter::Email("bob@example.com".into()))
        .await
        .unwrap();
    assert_eq!(by_email.id, user.id);

    let err = repo
        .find_one(UserFilter::UserName("nobody".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, DoormanError::NotFound { .. }));
}

#[tokio::test]
async fn find_one_by_token_fields() {
    let repo = SurrealUserRepository::new(setup().await);
    let mut user = User::new_local("carol", "carol@example.com");
    user.confirmation_token = Some("confirm-tok".into());
    user.confirmation_token_created = Some(Utc::now());
    user.reset_password_token = Some("reset-tok".into());
    user.reset_password_token_created = Some(Utc::now());
    repo.save(&user).await.unwrap();

    let by_confirm = repo
        .find_one(UserFilter::ConfirmationToken("confirm-tok".into()))
        .await
        .unwrap();
    assert_eq!(by_confirm.id, user.id);
    assert!(by_confirm.confirmation_token_created.is_some());

    let by_reset = repo
        .find_one(UserFilter::ResetPasswordToken("reset-tok".into()))
        .await
        .unwrap();
    assert_eq!(by_reset.id, user.id);
}

#[tokio::test]
async fn duplicate_user_name_is_rejected() {
    let repo = SurrealUserRepository::new(setup().await);
    repo.save(&User::new_local("dave", "dave@example.com"))
        .await
        .unwrap();

    let err = repo
        .save(&User::new_local("dave", "other@example.com"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, DoormanError::AlreadyExists { .. }),
        "expected AlreadyExists, got: {err:?}"
    );
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let repo = SurrealUserRepository::new(setup().await);
    repo.save(&User::new_local("erin", "erin@example.com"))
        .await
        .unwrap();

    let err = repo
        .save(&User::new_local("other", "erin@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, DoormanError::AlreadyExists { .. }));
}

#[tokio::test]
async fn save_replaces_existing_document() {
    let repo = SurrealUserRepository::new(setup().await);
    let mut user = User::new_local("frank", "frank@example.com");
    user.confirmation_token = Some("tok".into());
    user.confirmation_token_created = Some(Utc::now());
    repo.save(&user).await.unwrap();

    // Consume the token pair and enable, as the confirmation flow does.
    user.enabled = true;
    user.confirmed_date = Some(Utc::now());
    user.confirmation_token = None;
    user.confirmation_token_created = None;
    let saved = repo.save(&user).await.unwrap();

    assert!(saved.enabled);
    assert!(saved.confirmed_date.is_some());
    assert!(saved.confirmation_token.is_none());
    assert!(saved.confirmation_token_created.is_none());

    // The stale token no longer resolves.
    let err = repo
        .find_one(UserFilter::ConfirmationToken("tok".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, DoormanError::NotFound { .. }));
}

#[tokio::test]
async fn external_provider_roundtrip() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = User::new_external(ExternalProfile {
        provider: "google".into(),
        subject: "g-42".into(),
        user_name: "grace".into(),
        email: "grace@example.com".into(),
        first_name: Some("Grace".into()),
        last_name: Some("Hopper".into()),
    });
    repo.save(&user).await.unwrap();

    let fetched = repo.find_by_id(user.id).await.unwrap();
    let provider = fetched.external_provider.unwrap();
    assert_eq!(provider.provider, "google");
    assert_eq!(provider.subject, "g-42");
    assert!(fetched.enabled);
    assert!(fetched.confirmed_date.is_some());
}

#[tokio::test]
async fn remove_deletes_document() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = User::new_local("heidi", "heidi@example.com");
    repo.save(&user).await.unwrap();

    repo.remove(user.id).await.unwrap();

    let err = repo.find_by_id(user.id).await.unwrap_err();
    assert!(matches!(err, DoormanError::NotFound { .. }));

    // Removing an absent user is not an error.
    repo.remove(user.id).await.unwrap();
}
