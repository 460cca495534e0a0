use std::fs;

use tracing::info;

use crate::{
    dao::{get_path, PoolOption, PoolType},
    error::Error,
    model::{Subscription, Table},
};

#[derive(Debug)]
pub struct DatabasePool {
    pub subscription: Table<Subscription>,
    pub pool: PoolType,
}

impl DatabasePool {
    pub async fn new(database_url: &str) -> Result<DatabasePool, Error> {
        let pool = PoolOption::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(DatabasePool {
            subscription: Table::new(pool.clone()),
            pool,
        })
    }

    pub async fn init_migrations(&self) -> Result<(), Error> {
        let files = vec!["push_subscription.sql"];

        let dir = env!("CARGO_MANIFEST_DIR");

        for file in files {
            let data = fs::read_to_string(get_path(dir, file))?;
            sqlx::query(data.as_str()).execute(&self.pool).await?;
            info!("Applied migration {}", file);
        }

        Ok(())
    }
}
