use async_trait::async_trait;
use sqlx::error::Error;

use super::QueryResult;
use crate::{
    error,
    model::{Subscription, Table},
    registry::SubscriptionStore,
};

impl Table<Subscription> {
    pub async fn upsert(
        &self,
        subscription: &Subscription,
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            INSERT INTO push_subscription (endpoint, payload)
            VALUES($1, $2)
            ON CONFLICT (endpoint)
            DO UPDATE SET payload = EXCLUDED.payload, updated_at = NOW()
            "#,
        )
        .bind(&subscription.endpoint)
        .bind(&subscription.payload)
        .persistent(true)
        .execute(&self.pool)
        .await
    }

    pub async fn get_all(&self) -> Result<Vec<Subscription>, Error> {
        sqlx::query_as(
            r#"
            SELECT endpoint, payload FROM push_subscription
            "#,
        )
        .persistent(true)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count(&self) -> Result<i64, Error> {
        let (count,) = sqlx::query_as(
            r#"
            SELECT COUNT(1) FROM push_subscription
            "#,
        )
        .persistent(true)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[async_trait]
impl SubscriptionStore for Table<Subscription> {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn save(&self, subscription: &Subscription) -> Result<(), error::Error> {
        self.upsert(subscription).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Subscription>, error::Error> {
        Ok(self.get_all().await?)
    }
}
