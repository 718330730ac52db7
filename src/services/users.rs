use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthService,
    entities::user::{self, Entity as UserEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    schemas::user::{Token, UserCreate, UserListResponse, UserLogin, UserResponse, UserUpdate},
};

#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, auth: Arc<AuthService>) -> Self {
        Self {
            db,
            event_sender,
            auth,
        }
    }

    /// Registers a new account. Duplicate emails fail with `Conflict`; the
    /// plaintext password is hashed before the insert and dropped.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: UserCreate) -> Result<UserResponse, ServiceError> {
        request.validate()?;

        let existing = UserEntity::find()
            .filter(user::Column::Email.eq(request.email.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "email '{}' is already registered",
                request.email
            )));
        }

        let user_id = Uuid::new_v4();
        let password_hash = self.auth.hash_password(&request.password)?;

        let model = user::ActiveModel {
            id: Set(user_id),
            email: Set(request.email),
            password_hash: Set(password_hash),
            name: Set(request.name),
            role: Set(request.role.unwrap_or_default()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| match e {
            // Unique index race: two concurrent registrations for the same
            // email; the loser hits the constraint.
            sea_orm::DbErr::Exec(_) | sea_orm::DbErr::Query(_)
                if e.to_string().to_lowercase().contains("unique") =>
            {
                ServiceError::Conflict("email is already registered".to_string())
            }
            other => ServiceError::DatabaseError(other),
        })?;

        self.event_sender.send_or_log(Event::UserRegistered(user_id)).await;
        info!(user_id = %user_id, "user registered");
        Ok(model.into())
    }

    /// Verifies credentials and issues an access token. Unknown email and
    /// wrong password return the same error.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: UserLogin) -> Result<Token, ServiceError> {
        request.validate()?;

        let invalid = || ServiceError::AuthError("Invalid email or password".to_string());

        let user = UserEntity::find()
            .filter(user::Column::Email.eq(request.email.clone()))
            .one(&*self.db)
            .await?
            .ok_or_else(invalid)?;

        if !self.auth.verify_password(&request.password, &user.password_hash)? {
            warn!(user_id = %user.id, "failed login attempt");
            return Err(invalid());
        }

        let token = self.auth.issue_token(user.id, user.role)?;
        info!(user_id = %user.id, "user logged in");
        Ok(Token::bearer(token))
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserResponse, ServiceError> {
        UserEntity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| ServiceError::NotFound(format!("User {user_id} not found")))
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self, page: u64, per_page: u64) -> Result<UserListResponse, ServiceError> {
        let paginator = UserEntity::find()
            .order_by_desc(user::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let users = paginator
            .fetch_page(page.saturating_sub(1))
            .await?
            .into_iter()
            .map(UserResponse::from)
            .collect();

        Ok(UserListResponse {
            users,
            total,
            page,
            per_page,
        })
    }

    /// Partial update: absent fields leave the corresponding column
    /// unchanged. An email change re-checks uniqueness; a password change
    /// re-hashes.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn update_user(
        &self,
        user_id: Uuid,
        request: UserUpdate,
    ) -> Result<UserResponse, ServiceError> {
        request.validate()?;

        let user = UserEntity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {user_id} not found")))?;

        if let Some(new_email) = &request.email {
            if *new_email != user.email {
                let taken = UserEntity::find()
                    .filter(user::Column::Email.eq(new_email.clone()))
                    .one(&*self.db)
                    .await?;
                if taken.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "email '{new_email}' is already registered"
                    )));
                }
            }
        }

        let mut active: user::ActiveModel = user.into();
        if let Some(email) = request.email {
            active.email = Set(email);
        }
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(role) = request.role {
            active.role = Set(role);
        }
        if let Some(password) = request.password {
            active.password_hash = Set(self.auth.hash_password(&password)?);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&*self.db).await?;
        self.event_sender.send_or_log(Event::UserUpdated(user_id)).await;
        Ok(updated.into())
    }
}
