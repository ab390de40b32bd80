//! Session resolution and route gating over a cookie session.

#![allow(clippy::unwrap_used)]

use shopease_core::{LoginCredentials, NewUser};
use shopease_integration_tests::TestStore;
use shopease_storefront::session::SessionError;
use shopease_storefront::{Gated, RedirectTarget, SessionState};

#[tokio::test]
async fn test_session_starts_resolving_and_resolves_anonymous() {
    let store = TestStore::start().await;
    let storefront = store.storefront();

    assert_eq!(storefront.session().state(), SessionState::Resolving);
    assert_eq!(storefront.session().resolve().await, None);
    assert_eq!(storefront.session().state(), SessionState::Resolved(None));

    // Resolved once; later reads come from the cache.
    storefront.session().resolve().await;
    assert_eq!(store.count("GET", "/api/auth/session"), 1);
}

#[tokio::test]
async fn test_gate_scenarios() {
    let store = TestStore::start().await;
    store.add_account("alice", "secret", false);
    store.add_account("admin", "secret", true);

    let anonymous = store.storefront();
    assert_eq!(
        anonymous.navigate("/checkout", || "checkout").await,
        Gated::Redirect(RedirectTarget::Login)
    );
    assert_eq!(
        anonymous.navigate("/products?category=Kitchen", || "list").await,
        Gated::Render("list")
    );
    assert_eq!(
        RedirectTarget::Login.path(&anonymous.config().navigation),
        "/login"
    );

    let alice = store.storefront();
    alice
        .login(&LoginCredentials::new("alice", "secret"))
        .await
        .unwrap();
    assert_eq!(
        alice.navigate("/checkout", || "checkout").await,
        Gated::Render("checkout")
    );
    assert_eq!(
        alice.navigate("/products/new", || "new").await,
        Gated::Redirect(RedirectTarget::Home)
    );

    let admin = store.storefront();
    admin
        .login(&LoginCredentials::new("admin", "secret"))
        .await
        .unwrap();
    assert_eq!(
        admin.navigate("/products/1/edit", || "edit").await,
        Gated::Render("edit")
    );
}

#[tokio::test]
async fn test_clients_do_not_share_sessions() {
    let store = TestStore::start().await;
    store.add_account("alice", "secret", false);

    let alice = store.storefront();
    let stranger = store.storefront();
    alice
        .login(&LoginCredentials::new("alice", "secret"))
        .await
        .unwrap();

    assert_eq!(alice.session().resolve().await.unwrap().username, "alice");
    assert_eq!(stranger.session().resolve().await, None);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let store = TestStore::start().await;
    store.add_account("alice", "secret", false);
    let storefront = store.storefront();

    let err = storefront
        .login(&LoginCredentials::new("alice", "guess"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Rejected(message) if message == "Invalid username or password"));
    assert_eq!(storefront.session().resolve().await, None);
}

#[tokio::test]
async fn test_blank_credentials_never_reach_the_store() {
    let store = TestStore::start().await;
    let storefront = store.storefront();

    let err = storefront
        .login(&LoginCredentials::new("alice", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Validation(_)));
    assert_eq!(store.count("POST", "/api/auth/login"), 0);
}

#[tokio::test]
async fn test_register_then_logout() {
    let store = TestStore::start().await;
    let storefront = store.storefront();

    let user = storefront
        .register(&NewUser {
            username: "bob".to_string(),
            password: "hunter22".to_string(),
            email: "bob@example.com".to_string(),
            full_name: None,
            address: None,
            phone: None,
        })
        .await
        .unwrap();
    assert_eq!(user.username, "bob");
    assert!(!user.is_admin);
    assert!(storefront.cart().snapshot().is_empty());

    storefront.logout().await.unwrap();
    assert_eq!(storefront.session().state(), SessionState::Resolved(None));
    assert_eq!(
        storefront.navigate("/orders", || "orders").await,
        Gated::Redirect(RedirectTarget::Login)
    );
}
