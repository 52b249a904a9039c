//! PostgreSQL adapter tests. They need a reachable server (`DATABASE_URL`,
//! defaulting to localhost:5433) and run with `cargo test -- --ignored`.

mod common;

use std::sync::Arc;

use account_service::account::errors::AccountError;
use account_service::account::errors::StoreError;
use account_service::account::errors::UniqueKey;
use account_service::account::models::EmailAddress;
use account_service::account::models::Identity;
use account_service::account::models::IdentityId;
use account_service::account::models::Nickname;
use account_service::account::models::ResetTicket;
use account_service::account::models::ResetTicketId;
use account_service::account::ports::AccountServicePort;
use account_service::account::ports::AccountStore;
use account_service::account::ports::IdentityStore;
use account_service::account::ports::ResetTicketStore;
use account_service::account::ports::StoreTransaction;
use account_service::account::service::AccountService;
use account_service::outbound::credentials::ShortIdProvider;
use account_service::repositories::PostgresAccountStore;
use chrono::Utc;
use common::fast_hasher;
use common::TestDb;

fn identity(id: &str, nickname: &str, email: &str) -> Identity {
    let now = Utc::now();
    Identity {
        id: IdentityId(id.to_string()),
        password_hash: "$argon2id$placeholder".to_string(),
        nickname: Nickname::new(nickname.to_string()).unwrap(),
        email: EmailAddress::new(email.to_string()).unwrap(),
        display_name: None,
        avatar_link: None,
        premium: false,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
#[ignore]
async fn test_unique_constraints_map_to_keys() {
    let db = TestDb::new().await;
    let store = PostgresAccountStore::new(db.pool.clone());

    store
        .create_identity(&identity("id-1", "ana", "ana@example.com"))
        .await
        .unwrap();

    let email = store
        .create_identity(&identity("id-2", "bob", "ana@example.com"))
        .await;
    assert_eq!(email, Err(StoreError::Conflict(UniqueKey::Email)));

    let nickname = store
        .create_identity(&identity("id-3", "ana", "other@example.com"))
        .await;
    assert_eq!(nickname, Err(StoreError::Conflict(UniqueKey::Nickname)));

    let id = store
        .create_identity(&identity("id-1", "carl", "carl@example.com"))
        .await;
    assert_eq!(id, Err(StoreError::Conflict(UniqueKey::IdentityId)));
}

#[tokio::test]
#[ignore]
async fn test_identity_writes_leave_premium_alone() {
    let db = TestDb::new().await;
    let store = PostgresAccountStore::new(db.pool.clone());
    let stored = Identity {
        premium: true,
        ..identity("id-1", "ana", "ana@example.com")
    };
    store.create_identity(&stored).await.unwrap();

    let stale = Identity {
        premium: false,
        display_name: Some("Ana".to_string()),
        ..stored.clone()
    };
    store.update_identity(&stale).await.unwrap();
    store
        .set_password_hash(&stored.id, "$argon2id$other", Utc::now())
        .await
        .unwrap();

    let fetched = store.find_identity_by_id(&stored.id).await.unwrap().unwrap();
    assert!(fetched.premium);
    assert_eq!(fetched.display_name.as_deref(), Some("Ana"));
    assert_eq!(fetched.password_hash, "$argon2id$other");
}

#[tokio::test]
#[ignore]
async fn test_rollback_discards_identity() {
    let db = TestDb::new().await;
    let store = PostgresAccountStore::new(db.pool.clone());

    let mut tx = store.begin().await.unwrap();
    tx.create_identity(&identity("id-1", "ana", "ana@example.com"))
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    assert!(store
        .find_identity_by_email("ana@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore]
async fn test_reset_ticket_marked_used_once() {
    let db = TestDb::new().await;
    let store = PostgresAccountStore::new(db.pool.clone());
    store
        .create_identity(&identity("id-1", "ana", "ana@example.com"))
        .await
        .unwrap();
    store
        .create_reset_ticket(&ResetTicket {
            id: ResetTicketId("ticket-1".to_string()),
            secret: "secret-1".to_string(),
            identity_id: IdentityId("id-1".to_string()),
            created_at: Utc::now(),
            used: false,
        })
        .await
        .unwrap();

    let mut first = store.begin().await.unwrap();
    assert!(first
        .mark_reset_ticket_used(&ResetTicketId("ticket-1".to_string()))
        .await
        .unwrap());
    first.commit().await.unwrap();

    let mut second = store.begin().await.unwrap();
    assert!(!second
        .mark_reset_ticket_used(&ResetTicketId("ticket-1".to_string()))
        .await
        .unwrap());
    second.rollback().await.unwrap();

    let ticket = store
        .find_reset_ticket_by_secret("secret-1")
        .await
        .unwrap()
        .unwrap();
    assert!(ticket.used);
}

#[tokio::test]
#[ignore]
async fn test_account_lifecycle_on_postgres() {
    let db = TestDb::new().await;
    let service = AccountService::new(
        Arc::new(PostgresAccountStore::new(db.pool.clone())),
        Arc::new(fast_hasher()),
        Arc::new(ShortIdProvider::new(auth::ShortIdGenerator::default())),
    );

    let registered = service
        .register("ana@example.com", "ana", "pw1")
        .await
        .unwrap();
    let resolved = service
        .resolve_session(&registered.session.value)
        .await
        .unwrap();
    assert_eq!(resolved.id, registered.identity.id);

    let ticket = service
        .issue_reset_ticket(&registered.identity.id)
        .await
        .unwrap();
    service
        .consume_reset_ticket(&ticket.secret, "pw2")
        .await
        .unwrap();

    assert!(matches!(
        service.consume_reset_ticket(&ticket.secret, "pw3").await,
        Err(AccountError::ResetTicketUsed)
    ));
    assert!(service.login("ana@example.com", "pw2").await.is_ok());
    assert!(matches!(
        service.login("ana@example.com", "pw1").await,
        Err(AccountError::InvalidCredentials)
    ));
}
