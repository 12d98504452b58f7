use crate::error::AppError;
use crate::extractors::{FilterSpec, Listing, Pagination, SortSpec};
use crate::model::{NewUser, Role, User, UserChanges};
use crate::service::{conflict_on_unique, fetch_page, parse_stored};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const EMAIL_TAKEN: &str = "email is already registered";

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    phone: Option<String>,
    address: Option<String>,
    city: Option<String>,
    country: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            role: parse_stored(&row.role)?,
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            phone: row.phone,
            address: row.address,
            city: row.city,
            country: row.country,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_user(row: Option<UserRow>) -> Result<Option<User>, AppError> {
    row.map(User::try_from).transpose()
}

pub struct UserService;

impl UserService {
    pub async fn list(
        pool: &PgPool,
        filter: &FilterSpec,
        sort: &SortSpec,
        page: &Pagination,
    ) -> Result<(Vec<User>, u64), AppError> {
        let (rows, total) = fetch_page::<UserRow>(pool, User::TABLE, filter, sort, page).await?;
        let users = rows.into_iter().map(User::try_from).collect::<Result<_, _>>()?;
        Ok((users, total))
    }

    pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        into_user(row)
    }

    /// `email` must already be normalized.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;
        into_user(row)
    }

    pub async fn create(pool: &PgPool, new_user: NewUser) -> Result<User, AppError> {
        let user = new_user.into_record(Uuid::new_v4(), Utc::now());
        tracing::debug!(user_id = %user.id, role = %user.role, "insert user");
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, phone, address, city, country, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.city)
        .bind(&user.country)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(pool)
        .await
        .map_err(|e| conflict_on_unique(e, EMAIL_TAKEN))?;
        Ok(user)
    }

    /// Create the account, or reset the password and role of an existing one with the same email.
    pub async fn provision(pool: &PgPool, new_user: NewUser) -> Result<(User, bool), AppError> {
        let candidate = new_user.into_record(Uuid::new_v4(), Utc::now());
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             ON CONFLICT (email) DO UPDATE SET password_hash = EXCLUDED.password_hash, \
             role = EXCLUDED.role, updated_at = EXCLUDED.updated_at \
             RETURNING *",
        )
        .bind(candidate.id)
        .bind(&candidate.name)
        .bind(&candidate.email)
        .bind(&candidate.password_hash)
        .bind(candidate.role.as_str())
        .bind(candidate.created_at)
        .fetch_one(pool)
        .await?;
        let user = User::try_from(row)?;
        let created = user.id == candidate.id;
        Ok((user, created))
    }

    /// Contact fields use a touched flag plus the new value, so a field can be cleared to NULL.
    pub async fn update(pool: &PgPool, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET name = COALESCE($2, name), \
             phone = CASE WHEN $3 THEN $4 ELSE phone END, \
             address = CASE WHEN $5 THEN $6 ELSE address END, \
             city = CASE WHEN $7 THEN $8 ELSE city END, \
             country = CASE WHEN $9 THEN $10 ELSE country END, \
             role = COALESCE($11, role), updated_at = $12 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.phone.is_some())
        .bind(changes.phone.flatten())
        .bind(changes.address.is_some())
        .bind(changes.address.flatten())
        .bind(changes.city.is_some())
        .bind(changes.city.flatten())
        .bind(changes.country.is_some())
        .bind(changes.country.flatten())
        .bind(changes.role.map(Role::as_str))
        .bind(Utc::now())
        .fetch_optional(pool)
        .await?;
        into_user(row)
    }

    /// Current role of the account; None once it has been deleted.
    pub async fn role_of(pool: &PgPool, id: Uuid) -> Result<Option<Role>, AppError> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        role.as_deref().map(parse_stored).transpose()
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, AppError> {
        let done = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_with_unknown_role_is_rejected() {
        let now = Utc::now();
        let row = UserRow {
            id: Uuid::new_v4(),
            name: "X".into(),
            email: "x@shop.vn".into(),
            password_hash: "h".into(),
            phone: None,
            address: None,
            city: None,
            country: None,
            role: "superuser".into(),
            created_at: now,
            updated_at: now,
        };
        assert!(User::try_from(row).is_err());
    }
}
