use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::StoreError;
use crate::models::{Client, ClientDraft, ClientFilter, ClientUpdate, Phone};

/// Store over the customer database: owns the connection pool for its
/// lifetime and exposes schema management plus client and phone CRUD.
pub struct CustomerStore {
    pool: PgPool,
}

impl CustomerStore {
    /// Create a new CustomerStore from configuration
    pub async fn new(config: &Config) -> Result<Self, StoreError> {
        Self::connect(&config.database_url()).await
    }

    /// Connect straight from a database URL
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Release the pool. Callers do this on every exit path; nothing closes
    /// it for them.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("connection pool closed");
    }

    // Schema management

    /// Create the clients and phones tables if they are not there yet.
    pub async fn create_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS clients
            (
                id          SERIAL          PRIMARY KEY,
                first_name  VARCHAR(100)    NOT NULL,
                last_name   VARCHAR(100)    NOT NULL,
                email       VARCHAR(100)    NOT NULL UNIQUE CHECK (email LIKE '_%@_%._%')
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS phones
            (
                id          SERIAL          PRIMARY KEY,
                client_id   INTEGER         NOT NULL REFERENCES clients(id),
                phone       VARCHAR(60)     NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("database schema ready");
        Ok(())
    }

    /// Drop both tables. Errors if they do not exist.
    pub async fn drop_schema(&self) -> Result<(), StoreError> {
        sqlx::query("DROP TABLE clients CASCADE")
            .execute(&self.pool)
            .await?;
        sqlx::query("DROP TABLE phones")
            .execute(&self.pool)
            .await?;

        info!("database schema dropped");
        Ok(())
    }

    // Client operations

    /// Insert a client from a draft, then any phones it carries, and return
    /// the generated id. A missing required field fails before anything is
    /// written. The client insert and the phone inserts commit separately, so
    /// a phone failure leaves the already-committed client row in place.
    pub async fn add_client(&self, draft: &ClientDraft) -> Result<i32, StoreError> {
        let (first_name, last_name, email) = draft.validate()?;

        let client_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO clients (first_name, last_name, email)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        for phone in &draft.phones {
            self.add_phone(client_id, phone).await?;
        }

        debug!(client_id, email, "client added");
        Ok(client_id)
    }

    /// Remove a client and every phone it owns in one transaction. Unknown
    /// ids fall through silently.
    pub async fn remove_client(&self, client_id: i32) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM phones WHERE client_id = $1")
            .bind(client_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(client_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(client_id, "client removed");
        Ok(())
    }

    /// Update whichever fields the caller supplied, leaving the rest
    /// untouched. An empty update is a no-op.
    pub async fn update_client(
        &self,
        client_id: i32,
        update: &ClientUpdate,
    ) -> Result<(), StoreError> {
        if update.is_empty() {
            debug!(client_id, "empty client update, nothing to do");
            return Ok(());
        }

        let mut builder = update_client_query(client_id, update);
        builder.build().execute(&self.pool).await?;

        debug!(client_id, "client updated");
        Ok(())
    }

    /// Ids of every client matching all supplied filters, ascending. With no
    /// filters this lists every client. Callers wanting "the one match" take
    /// the first element and handle the empty case themselves.
    pub async fn find_client_ids(&self, filter: &ClientFilter) -> Result<Vec<i32>, StoreError> {
        let mut builder = find_client_ids_query(filter);
        let ids = builder
            .build_query_scalar::<i32>()
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    pub async fn get_client(&self, client_id: i32) -> Result<Option<Client>, StoreError> {
        let client = sqlx::query_as::<_, Client>(
            "SELECT id, first_name, last_name, email FROM clients WHERE id = $1",
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>, StoreError> {
        let clients = sqlx::query_as::<_, Client>(
            "SELECT id, first_name, last_name, email FROM clients ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }

    // Phone operations

    /// Insert one phone row. Surfaces the engine's unique violation for a
    /// duplicate number and foreign-key violation for an unknown client.
    pub async fn add_phone(&self, client_id: i32, phone: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO phones (client_id, phone)
            VALUES ($1, $2)
            "#,
        )
        .bind(client_id)
        .bind(phone)
        .execute(&self.pool)
        .await?;

        debug!(client_id, phone, "phone added");
        Ok(())
    }

    /// Delete by exact phone string; absent numbers fall through silently.
    pub async fn remove_phone(&self, phone: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM phones WHERE phone = $1")
            .bind(phone)
            .execute(&self.pool)
            .await?;

        debug!(phone, "phone removed");
        Ok(())
    }

    pub async fn phones_for_client(&self, client_id: i32) -> Result<Vec<Phone>, StoreError> {
        let phones = sqlx::query_as::<_, Phone>(
            "SELECT id, client_id, phone FROM phones WHERE client_id = $1 ORDER BY id",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(phones)
    }
}

// Dynamic clauses go through QueryBuilder so every value is a bound
// placeholder, never interpolated text.

fn update_client_query<'a>(
    client_id: i32,
    update: &'a ClientUpdate,
) -> QueryBuilder<'a, Postgres> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE clients SET ");
    {
        let mut fields = builder.separated(", ");
        if let Some(first_name) = &update.first_name {
            fields.push("first_name = ");
            fields.push_bind_unseparated(first_name.as_str());
        }
        if let Some(last_name) = &update.last_name {
            fields.push("last_name = ");
            fields.push_bind_unseparated(last_name.as_str());
        }
        if let Some(email) = &update.email {
            fields.push("email = ");
            fields.push_bind_unseparated(email.as_str());
        }
    }
    builder.push(" WHERE id = ");
    builder.push_bind(client_id);
    builder
}

fn find_client_ids_query<'a>(filter: &'a ClientFilter) -> QueryBuilder<'a, Postgres> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT DISTINCT c.id FROM clients c");
    if filter.phone.is_some() {
        builder.push(" JOIN phones p ON p.client_id = c.id");
    }
    builder.push(" WHERE 1 = 1");
    if let Some(first_name) = &filter.first_name {
        builder.push(" AND c.first_name = ");
        builder.push_bind(first_name.as_str());
    }
    if let Some(last_name) = &filter.last_name {
        builder.push(" AND c.last_name = ");
        builder.push_bind(last_name.as_str());
    }
    if let Some(email) = &filter.email {
        builder.push(" AND c.email = ");
        builder.push_bind(email.as_str());
    }
    if let Some(phone) = &filter.phone {
        builder.push(" AND p.phone = ");
        builder.push_bind(phone.as_str());
    }
    builder.push(" ORDER BY c.id");
    builder
}

/// Connect a store from configuration
pub async fn init(config: &Config) -> Result<CustomerStore, StoreError> {
    let store = CustomerStore::new(config).await?;

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_query_touches_only_supplied_fields() {
        let update = ClientUpdate {
            email: Some("one@two.com".to_string()),
            ..Default::default()
        };
        let sql = update_client_query(7, &update).into_sql();
        assert_eq!(sql, "UPDATE clients SET email = $1 WHERE id = $2");
    }

    #[test]
    fn update_query_joins_fields_in_declaration_order() {
        let update = ClientUpdate {
            first_name: Some("Elena".to_string()),
            last_name: None,
            email: Some("one@two.com".to_string()),
        };
        let sql = update_client_query(7, &update).into_sql();
        assert_eq!(
            sql,
            "UPDATE clients SET first_name = $1, email = $2 WHERE id = $3"
        );
    }

    #[test]
    fn update_query_with_all_fields() {
        let update = ClientUpdate {
            first_name: Some("Elena".to_string()),
            last_name: Some("Anisimova".to_string()),
            email: Some("one@two.com".to_string()),
        };
        let sql = update_client_query(7, &update).into_sql();
        assert_eq!(
            sql,
            "UPDATE clients SET first_name = $1, last_name = $2, email = $3 WHERE id = $4"
        );
    }

    #[test]
    fn filter_query_without_phone_skips_the_join() {
        let filter = ClientFilter {
            email: Some("one@two.com".to_string()),
            ..Default::default()
        };
        let sql = find_client_ids_query(&filter).into_sql();
        assert_eq!(
            sql,
            "SELECT DISTINCT c.id FROM clients c WHERE 1 = 1 AND c.email = $1 ORDER BY c.id"
        );
    }

    #[test]
    fn filter_query_with_phone_joins_phones() {
        let filter = ClientFilter {
            first_name: Some("Elena".to_string()),
            phone: Some("555-55-55".to_string()),
            ..Default::default()
        };
        let sql = find_client_ids_query(&filter).into_sql();
        assert_eq!(
            sql,
            "SELECT DISTINCT c.id FROM clients c JOIN phones p ON p.client_id = c.id \
             WHERE 1 = 1 AND c.first_name = $1 AND p.phone = $2 ORDER BY c.id"
        );
    }

    #[test]
    fn empty_filter_selects_every_client() {
        let sql = find_client_ids_query(&ClientFilter::default()).into_sql();
        assert_eq!(
            sql,
            "SELECT DISTINCT c.id FROM clients c WHERE 1 = 1 ORDER BY c.id"
        );
    }
}
