use chrono::Utc;
use sea_orm::{ActiveValue, DbErr, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    auth::{NewUser, UserRecord, UserStore},
    error::is_unique_violation,
    users,
};

use super::Engine;

impl UserStore for Engine {
    async fn find_user_by_username(&self, username: &str) -> ResultEngine<Option<UserRecord>> {
        let model = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.database)
            .await?;
        Ok(model.map(UserRecord::from))
    }

    async fn find_user_by_id(&self, id: Uuid) -> ResultEngine<Option<UserRecord>> {
        let model = users::Entity::find_by_id(id).one(&self.database).await?;
        Ok(model.map(UserRecord::from))
    }

    async fn create_user(&self, user: NewUser) -> ResultEngine<UserRecord> {
        let active = users::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            username: ActiveValue::Set(user.username.clone()),
            password_hash: ActiveValue::Set(user.password_hash),
            token_version: ActiveValue::Set(0),
            created_at: ActiveValue::Set(Utc::now()),
        };

        match active.insert(&self.database).await {
            Ok(model) => Ok(model.into()),
            Err(err) if is_unique_violation(&err) => {
                Err(EngineError::DuplicateAccount(user.username))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update_user(&self, user: &UserRecord) -> ResultEngine<UserRecord> {
        let active = users::ActiveModel {
            id: ActiveValue::Unchanged(user.id),
            username: ActiveValue::Set(user.username.clone()),
            password_hash: ActiveValue::Set(user.password_hash.clone()),
            token_version: ActiveValue::Set(user.token_version),
            created_at: ActiveValue::NotSet,
        };

        match active.update(&self.database).await {
            Ok(model) => Ok(model.into()),
            Err(DbErr::RecordNotUpdated) => {
                Err(EngineError::AccountNotFound(user.username.clone()))
            }
            Err(err) if is_unique_violation(&err) => {
                Err(EngineError::DuplicateAccount(user.username.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }
}
