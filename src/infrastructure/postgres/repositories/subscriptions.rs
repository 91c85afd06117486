use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, prelude::*, update};
use uuid::Uuid;

use crate::{
    domain::{
        entities::users::UserEntity,
        repositories::subscriptions::SubscriptionRepository,
        value_objects::{
            enums::subscription_statuses::SubscriptionStatus, subscriptions::SubscriptionRecord,
        },
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::users},
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn load(&self, user_id: Uuid) -> Result<Option<SubscriptionRecord>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = users::table
            .filter(users::id.eq(user_id))
            .select(UserEntity::as_select())
            .first::<UserEntity>(&mut conn)
            .optional()?;

        Ok(result.map(|entity| entity.subscription_record()))
    }

    async fn find_user_id_by_preapproval(&self, preapproval_id: &str) -> Result<Option<Uuid>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = users::table
            .filter(users::preapproval_id.eq(preapproval_id))
            .select(users::id)
            .first::<Uuid>(&mut conn)
            .optional()?;

        Ok(result)
    }

    // The row itself is the lock: the filter only matches when no other
    // creation is in flight, so exactly one concurrent caller sees an
    // affected row.
    async fn claim_creation(&self, user_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(users::table)
            .filter(users::id.eq(user_id))
            .filter(users::subscription_in_progress.eq(false))
            .filter(users::subscription_status.ne(SubscriptionStatus::Pending.to_string()))
            .set((
                users::subscription_in_progress.eq(true),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(affected == 1)
    }

    async fn release_claim(&self, user_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(users::table)
            .filter(users::id.eq(user_id))
            .set((
                users::subscription_in_progress.eq(false),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn store(&self, user_id: Uuid, record: SubscriptionRecord) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(users::table)
            .filter(users::id.eq(user_id))
            .set((
                users::subscription_active.eq(record.active),
                users::subscription_status.eq(record.status.to_string()),
                users::preapproval_id.eq(record.preapproval_id),
                users::subscription_in_progress.eq(record.in_progress),
                users::subscription_created_at.eq(record.created_at),
                users::subscription_updated_at.eq(record.updated_at),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
