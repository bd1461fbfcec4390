use async_trait::async_trait;
use sqlx::{
    PgConnection, PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    NewPvz, NewUser, Product, ProductId, ProductRow, ProductRowQuery, ProductType, Pvz, PvzId,
    Reception, ReceptionId, ReceptionStatus, Result, Role, StoreError, User, UserId,
    store::PvzStore,
};

const RECEPTION_COLUMNS: &str = "id, pvz_id, created_at, status, creator_id";
const PRODUCT_COLUMNS: &str = "id, reception_id, created_at, product_type, creator_id";

/// PostgreSQL-backed store implementation.
///
/// Every lifecycle call runs in its own transaction that starts by taking a
/// row lock on the pickup point, so concurrent calls for the same pickup point
/// are applied one after another while other pickup points proceed freely.
#[derive(Clone)]
pub struct PostgresPvzStore {
    pool: PgPool,
}

impl PostgresPvzStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn lock_pvz(conn: &mut PgConnection, pvz_id: PvzId) -> Result<()> {
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM pvz WHERE id = $1 FOR UPDATE")
                .bind(pvz_id.as_uuid())
                .fetch_optional(&mut *conn)
                .await?;

        locked.map(|_| ()).ok_or(StoreError::PvzNotFound(pvz_id))
    }

    async fn find_open_reception(
        conn: &mut PgConnection,
        pvz_id: PvzId,
    ) -> Result<Option<Reception>> {
        let row = sqlx::query(&format!(
            "SELECT {RECEPTION_COLUMNS} FROM receptions WHERE pvz_id = $1 AND status = 'in_progress'"
        ))
        .bind(pvz_id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?;

        row.map(Self::row_to_reception).transpose()
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        let roles: Vec<String> = row.try_get("roles")?;
        let roles = roles
            .iter()
            .map(|r| r.parse::<Role>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;

        Ok(User {
            id: UserId::from_uuid(row.try_get("id")?),
            email: row.try_get("email")?,
            secret_hash: row.try_get("secret_hash")?,
            roles,
        })
    }

    fn row_to_pvz(row: PgRow) -> Result<Pvz> {
        Ok(Pvz {
            id: PvzId::from_uuid(row.try_get("id")?),
            created_at: row.try_get("created_at")?,
            city: parse_column(&row, "city")?,
            creator_id: row
                .try_get::<Option<Uuid>, _>("creator_id")?
                .map(UserId::from_uuid),
        })
    }

    fn row_to_reception(row: PgRow) -> Result<Reception> {
        Ok(Reception {
            id: ReceptionId::from_uuid(row.try_get("id")?),
            pvz_id: PvzId::from_uuid(row.try_get("pvz_id")?),
            created_at: row.try_get("created_at")?,
            status: parse_column(&row, "status")?,
            creator_id: row
                .try_get::<Option<Uuid>, _>("creator_id")?
                .map(UserId::from_uuid),
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get("id")?),
            reception_id: ReceptionId::from_uuid(row.try_get("reception_id")?),
            created_at: row.try_get("created_at")?,
            product_type: parse_column(&row, "product_type")?,
            creator_id: row
                .try_get::<Option<Uuid>, _>("creator_id")?
                .map(UserId::from_uuid),
        })
    }

    fn row_to_product_row(row: PgRow) -> Result<ProductRow> {
        Ok(ProductRow {
            pvz_id: PvzId::from_uuid(row.try_get("pvz_id")?),
            pvz_created_at: row.try_get("pvz_created_at")?,
            city: parse_column(&row, "city")?,
            reception_id: ReceptionId::from_uuid(row.try_get("reception_id")?),
            reception_created_at: row.try_get("reception_created_at")?,
            reception_status: parse_column(&row, "reception_status")?,
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            product_created_at: row.try_get("product_created_at")?,
            product_type: parse_column(&row, "product_type")?,
        })
    }
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>()
        .map_err(|e| StoreError::InvalidRecord(format!("{column}: {e}")))
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.constraint() == Some(constraint))
}

#[async_trait]
impl PvzStore for PostgresPvzStore {
    async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("migrations applied");
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let roles: Vec<String> = user.roles.iter().map(|r| r.as_str().to_string()).collect();

        let row = sqlx::query(
            r#"
            INSERT INTO users (id, email, secret_hash, roles)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, secret_hash, roles
            "#,
        )
        .bind(UserId::new().as_uuid())
        .bind(&user.email)
        .bind(&user.secret_hash)
        .bind(roles)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "users_email_key") {
                return StoreError::EmailTaken(user.email.clone());
            }
            StoreError::Database(e)
        })?;

        Self::row_to_user(row)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, email, secret_hash, roles FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn create_pvz(&self, pvz: NewPvz) -> Result<Pvz> {
        let id = pvz.id.unwrap_or_default();

        let row = sqlx::query(
            r#"
            INSERT INTO pvz (id, created_at, city, creator_id)
            VALUES ($1, COALESCE($2, NOW()), $3, $4)
            RETURNING id, created_at, city, creator_id
            "#,
        )
        .bind(id.as_uuid())
        .bind(pvz.created_at)
        .bind(pvz.city.as_str())
        .bind(pvz.creator_id.map(|c| c.as_uuid()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "pvz_pkey") {
                return StoreError::PvzAlreadyExists(id);
            }
            StoreError::Database(e)
        })?;

        Self::row_to_pvz(row)
    }

    async fn list_pvz(&self) -> Result<Vec<Pvz>> {
        let rows = sqlx::query("SELECT id, created_at, city, creator_id FROM pvz ORDER BY created_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_pvz).collect()
    }

    async fn open_reception(&self, pvz_id: PvzId, creator: Option<UserId>) -> Result<Reception> {
        let mut tx = self.pool.begin().await?;
        Self::lock_pvz(&mut tx, pvz_id).await?;

        if Self::find_open_reception(&mut tx, pvz_id).await?.is_some() {
            return Err(StoreError::ReceptionAlreadyOpen(pvz_id));
        }

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO receptions (id, pvz_id, status, creator_id)
            VALUES ($1, $2, 'in_progress', $3)
            RETURNING {RECEPTION_COLUMNS}
            "#
        ))
        .bind(ReceptionId::new().as_uuid())
        .bind(pvz_id.as_uuid())
        .bind(creator.map(|c| c.as_uuid()))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            // The partial unique index backs the row lock
            if is_unique_violation(&e, "receptions_one_open_per_pvz") {
                return StoreError::ReceptionAlreadyOpen(pvz_id);
            }
            StoreError::Database(e)
        })?;
        let reception = Self::row_to_reception(row)?;

        tx.commit().await?;
        tracing::debug!(%pvz_id, reception_id = %reception.id, "reception opened");
        Ok(reception)
    }

    async fn close_last_reception(&self, pvz_id: PvzId) -> Result<Reception> {
        let mut tx = self.pool.begin().await?;
        Self::lock_pvz(&mut tx, pvz_id).await?;

        let latest = sqlx::query(&format!(
            r#"
            SELECT {RECEPTION_COLUMNS} FROM receptions
            WHERE pvz_id = $1
            ORDER BY created_at DESC, seq DESC
            LIMIT 1
            "#
        ))
        .bind(pvz_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .map(Self::row_to_reception)
        .transpose()?
        .ok_or(StoreError::NoReception(pvz_id))?;

        if !latest.status.can_close() {
            return Err(StoreError::ReceptionAlreadyClosed(latest.id));
        }

        let row = sqlx::query(&format!(
            "UPDATE receptions SET status = $2 WHERE id = $1 RETURNING {RECEPTION_COLUMNS}"
        ))
        .bind(latest.id.as_uuid())
        .bind(ReceptionStatus::Closed.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let reception = Self::row_to_reception(row)?;

        tx.commit().await?;
        tracing::debug!(%pvz_id, reception_id = %reception.id, "reception closed");
        Ok(reception)
    }

    async fn add_product(
        &self,
        pvz_id: PvzId,
        product_type: ProductType,
        creator: Option<UserId>,
    ) -> Result<Product> {
        let mut tx = self.pool.begin().await?;
        Self::lock_pvz(&mut tx, pvz_id).await?;

        let reception = Self::find_open_reception(&mut tx, pvz_id)
            .await?
            .ok_or(StoreError::NoOpenReception(pvz_id))?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (id, reception_id, product_type, creator_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(ProductId::new().as_uuid())
        .bind(reception.id.as_uuid())
        .bind(product_type.as_str())
        .bind(creator.map(|c| c.as_uuid()))
        .fetch_one(&mut *tx)
        .await?;
        let product = Self::row_to_product(row)?;

        tx.commit().await?;
        Ok(product)
    }

    async fn delete_last_product(&self, pvz_id: PvzId) -> Result<Product> {
        let mut tx = self.pool.begin().await?;
        Self::lock_pvz(&mut tx, pvz_id).await?;

        let reception = Self::find_open_reception(&mut tx, pvz_id)
            .await?
            .ok_or(StoreError::NoOpenReception(pvz_id))?;

        let row = sqlx::query(&format!(
            r#"
            DELETE FROM products
            WHERE id = (
                SELECT id FROM products
                WHERE reception_id = $1
                ORDER BY created_at DESC, seq DESC
                LIMIT 1
            )
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(reception.id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::EmptyReception(reception.id))?;
        let product = Self::row_to_product(row)?;

        tx.commit().await?;
        Ok(product)
    }

    async fn product_rows(&self, query: ProductRowQuery) -> Result<Vec<ProductRow>> {
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);

        let rows = sqlx::query(
            r#"
            SELECT
                products.id AS product_id,
                products.product_type,
                products.created_at AS product_created_at,
                receptions.id AS reception_id,
                receptions.created_at AS reception_created_at,
                receptions.status AS reception_status,
                pvz.id AS pvz_id,
                pvz.created_at AS pvz_created_at,
                pvz.city
            FROM products
            JOIN receptions ON products.reception_id = receptions.id
            JOIN pvz ON receptions.pvz_id = pvz.id
            WHERE products.created_at >= $1 AND products.created_at <= $2
            ORDER BY
                pvz.created_at DESC,
                pvz.id ASC,
                receptions.created_at DESC,
                receptions.id ASC,
                products.created_at DESC,
                products.seq DESC
            OFFSET $3
            LIMIT $4
            "#,
        )
        .bind(query.from)
        .bind(query.to)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product_row).collect()
    }
}
