mod common;

use common::TestApp;
use eshop_api::{
    entities::user::{self, Entity as UserEntity, UserRole},
    errors::ServiceError,
    schemas::user::{UserCreate, UserLogin, UserUpdate},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

fn registration(email: &str) -> UserCreate {
    UserCreate {
        email: email.to_string(),
        name: "Ada Lovelace".to_string(),
        role: None,
        password: "correct-horse-battery".to_string(),
    }
}

#[tokio::test]
async fn register_defaults_to_customer_role() {
    let app = TestApp::new().await;

    let user = app
        .state
        .services
        .users
        .register(registration("ada@example.com"))
        .await
        .expect("registration failed");

    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.role, UserRole::Customer);
}

#[tokio::test]
async fn password_is_stored_hashed_never_plaintext() {
    let app = TestApp::new().await;

    app.state
        .services
        .users
        .register(registration("ada@example.com"))
        .await
        .expect("registration failed");

    let stored = UserEntity::find()
        .filter(user::Column::Email.eq("ada@example.com"))
        .one(&*app.state.db)
        .await
        .unwrap()
        .expect("user row missing");

    assert_ne!(stored.password_hash, "correct-horse-battery");
    assert!(stored.password_hash.starts_with("$argon2"));
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = TestApp::new().await;

    app.state
        .services
        .users
        .register(registration("ada@example.com"))
        .await
        .expect("first registration failed");

    let err = app
        .state
        .services
        .users
        .register(registration("ada@example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn login_issues_a_verifiable_token() {
    let app = TestApp::new().await;

    let user = app
        .state
        .services
        .users
        .register(registration("ada@example.com"))
        .await
        .unwrap();

    let token = app
        .state
        .services
        .users
        .login(UserLogin {
            email: "ada@example.com".to_string(),
            password: "correct-horse-battery".to_string(),
        })
        .await
        .expect("login failed");

    assert_eq!(token.token_type, "bearer");
    let identity = app
        .state
        .services
        .auth
        .verify_token(&token.access_token)
        .expect("token did not verify");
    assert_eq!(identity.user_id, user.id);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_fail_alike() {
    let app = TestApp::new().await;

    app.state
        .services
        .users
        .register(registration("ada@example.com"))
        .await
        .unwrap();

    let wrong_password = app
        .state
        .services
        .users
        .login(UserLogin {
            email: "ada@example.com".to_string(),
            password: "not-the-password".to_string(),
        })
        .await
        .unwrap_err();

    let unknown_email = app
        .state
        .services
        .users
        .login(UserLogin {
            email: "nobody@example.com".to_string(),
            password: "correct-horse-battery".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert!(matches!(wrong_password, ServiceError::AuthError(_)));
}

#[tokio::test]
async fn partial_update_leaves_omitted_fields_unchanged() {
    let app = TestApp::new().await;

    let user = app
        .state
        .services
        .users
        .register(registration("ada@example.com"))
        .await
        .unwrap();

    let updated = app
        .state
        .services
        .users
        .update_user(
            user.id,
            UserUpdate {
                name: Some("Countess Lovelace".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update failed");

    assert_eq!(updated.name, "Countess Lovelace");
    assert_eq!(updated.email, "ada@example.com");
    assert_eq!(updated.role, UserRole::Customer);
    assert!(updated.updated_at.is_some());
}
