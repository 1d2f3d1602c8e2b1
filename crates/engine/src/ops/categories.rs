use sea_orm::{
    ActiveValue, ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    Category, EngineError, ResultEngine, categories,
    error::is_unique_violation,
    transactions,
    util::{normalize_category_display, normalize_category_key},
};

use super::{Engine, with_tx};

impl Engine {
    /// All categories, ordered by name.
    pub async fn list_categories(&self) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Category::from).collect())
    }

    /// Create a category. Names are unique ignoring case and accents.
    pub async fn create_category(&self, name: &str) -> ResultEngine<Category> {
        let display = normalize_category_display(name)?;
        let key = normalize_category_key(&display);

        if find_by_key(&self.database, &key).await?.is_some() {
            return Err(EngineError::ExistingKey(display));
        }

        let active = categories::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            name: ActiveValue::Set(display.clone()),
            name_norm: ActiveValue::Set(key),
        };
        match active.insert(&self.database).await {
            Ok(model) => Ok(model.into()),
            Err(err) if is_unique_violation(&err) => Err(EngineError::ExistingKey(display)),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn rename_category(&self, category_id: Uuid, name: &str) -> ResultEngine<Category> {
        let display = normalize_category_display(name)?;
        let key = normalize_category_key(&display);

        let model = categories::Entity::find_by_id(category_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("category {category_id}")))?;

        if let Some(other) = find_by_key(&self.database, &key).await?
            && other.id != category_id
        {
            return Err(EngineError::ExistingKey(display));
        }

        let mut active: categories::ActiveModel = model.into();
        active.name = ActiveValue::Set(display.clone());
        active.name_norm = ActiveValue::Set(key);
        match active.update(&self.database).await {
            Ok(model) => Ok(model.into()),
            Err(err) if is_unique_violation(&err) => Err(EngineError::ExistingKey(display)),
            Err(err) => Err(err.into()),
        }
    }

    /// Delete a category nobody references.
    ///
    /// Categories still used by an expense are kept and reported as
    /// [`EngineError::CategoryInUse`].
    pub async fn delete_category(&self, category_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = categories::Entity::find_by_id(category_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("category {category_id}")))?;

            let in_use = transactions::Entity::find()
                .filter(transactions::Column::CategoryId.eq(category_id))
                .count(&db_tx)
                .await?;
            if in_use > 0 {
                Err(EngineError::CategoryInUse(model.name))
            } else {
                categories::Entity::delete_by_id(category_id)
                    .exec(&db_tx)
                    .await?;
                Ok(())
            }
        })
    }

    /// Insert `names` when no category exists yet.
    ///
    /// Returns how many categories were inserted (0 when the table already
    /// had rows). Duplicate names in the list are inserted once.
    pub async fn seed_default_categories(&self, names: &[String]) -> ResultEngine<usize> {
        with_tx!(self, |db_tx| {
            if categories::Entity::find().count(&db_tx).await? > 0 {
                tracing::info!("categories already exist, skipping seed");
                Ok(0)
            } else {
                let mut seen = std::collections::HashSet::new();
                let mut inserted = 0;
                for name in names {
                    let display = normalize_category_display(name)?;
                    let key = normalize_category_key(&display);
                    if !seen.insert(key.clone()) {
                        continue;
                    }
                    categories::ActiveModel {
                        id: ActiveValue::Set(Uuid::new_v4()),
                        name: ActiveValue::Set(display),
                        name_norm: ActiveValue::Set(key),
                    }
                    .insert(&db_tx)
                    .await?;
                    inserted += 1;
                }
                tracing::info!("added {inserted} default categories");
                Ok(inserted)
            }
        })
    }

    /// Fail with a validation error unless the category exists.
    pub(super) async fn ensure_category<C: ConnectionTrait>(
        db: &C,
        category_id: Uuid,
    ) -> ResultEngine<()> {
        match categories::Entity::find_by_id(category_id).one(db).await? {
            Some(_) => Ok(()),
            None => Err(EngineError::Validation("Category not found".to_string())),
        }
    }
}

async fn find_by_key<C: ConnectionTrait>(
    db: &C,
    key: &str,
) -> ResultEngine<Option<categories::Model>> {
    Ok(categories::Entity::find()
        .filter(categories::Column::NameNorm.eq(key))
        .one(db)
        .await?)
}
