use anyhow::{Context, Result};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use fp_schemas::{Role, User};

use crate::{is_unique_violation, DbError};

const USER_COLUMNS: &str = "id, email, name, role, image, created_at";

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub role: Role,
}

/// User plus the stored credential, for sign-in only.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: Option<String>,
}

pub(crate) fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        role: Role::parse(&row.try_get::<String, _>("role")?)?,
        image: row.try_get("image")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Insert a user. A taken email is `DbError::Conflict`.
pub async fn insert_user(pool: &PgPool, new: &NewUser) -> Result<User> {
    let res = sqlx::query(&format!(
        r#"
        insert into users (id, email, password_hash, name, role)
        values ($1, $2, $3, $4, $5)
        returning {USER_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&new.email)
    .bind(&new.password_hash)
    .bind(&new.name)
    .bind(new.role.as_str())
    .fetch_one(pool)
    .await;

    match res {
        Ok(row) => user_from_row(&row),
        Err(e) if is_unique_violation(&e, "uq_users_email") => {
            Err(DbError::Conflict("email already registered".to_string()).into())
        }
        Err(e) => Err(anyhow::Error::new(e).context("insert_user failed")),
    }
}

pub async fn fetch_user(pool: &PgPool, user_id: Uuid) -> Result<User> {
    let row = sqlx::query(&format!("select {USER_COLUMNS} from users where id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("fetch_user failed")?
        .ok_or(DbError::NotFound("user"))?;
    user_from_row(&row)
}

/// Current role from the users row; `None` when the user is gone.
pub async fn fetch_user_role(pool: &PgPool, user_id: Uuid) -> Result<Option<Role>> {
    let role: Option<String> = sqlx::query_scalar("select role from users where id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("fetch_user_role failed")?;
    role.as_deref().map(Role::parse).transpose()
}

pub async fn fetch_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserCredentials>> {
    let row = sqlx::query(&format!(
        "select {USER_COLUMNS}, password_hash from users where email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("fetch_user_by_email failed")?;

    match row {
        None => Ok(None),
        Some(row) => Ok(Some(UserCredentials {
            user: user_from_row(&row)?,
            password_hash: row.try_get("password_hash")?,
        })),
    }
}

pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool> {
    let (exists,): (bool,) =
        sqlx::query_as::<_, (bool,)>("select exists (select 1 from users where email = $1)")
            .bind(email)
            .fetch_one(pool)
            .await
            .context("email_exists failed")?;
    Ok(exists)
}

pub async fn set_user_role(pool: &PgPool, user_id: Uuid, role: Role) -> Result<User> {
    let row = sqlx::query(&format!(
        r#"
        update users
        set role = $2,
            updated_at = now()
        where id = $1
        returning {USER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(role.as_str())
    .fetch_optional(pool)
    .await
    .context("set_user_role failed")?
    .ok_or(DbError::NotFound("user"))?;
    user_from_row(&row)
}
