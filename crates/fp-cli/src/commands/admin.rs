use anyhow::{anyhow, Result};
use sqlx::PgPool;

use fp_auth::{hash_password, normalize_email, validate_email, validate_name, validate_password};
use fp_db::NewUser;
use fp_schemas::{Role, User};

/// Validated `admin create` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminInput {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl AdminInput {
    /// Same rules as public signup, so an admin can also sign in through
    /// the web form.
    pub fn parse(email: &str, name: &str, password: &str) -> Result<Self> {
        let email = normalize_email(email);
        validate_email(&email).map_err(|e| anyhow!("--email: {e}"))?;
        validate_name(name).map_err(|e| anyhow!("--name: {e}"))?;
        validate_password(password).map_err(|e| anyhow!("--password: {e}"))?;
        Ok(Self {
            email,
            name: name.trim().to_string(),
            password: password.to_string(),
        })
    }
}

#[derive(Debug)]
pub struct AdminOutcome {
    pub user: User,
    pub created: bool,
}

/// An existing account keeps its password and is promoted in place.
pub async fn create_or_promote(pool: &PgPool, input: &AdminInput, cost: u32) -> Result<AdminOutcome> {
    if let Some(existing) = fp_db::fetch_user_by_email(pool, &input.email).await? {
        let user = fp_db::set_user_role(pool, existing.user.id, Role::Admin).await?;
        tracing::info!(user_id = %user.id, "existing user promoted to ADMIN");
        return Ok(AdminOutcome {
            user,
            created: false,
        });
    }

    let password_hash = hash_password(&input.password, cost)?;
    let user = fp_db::insert_user(
        pool,
        &NewUser {
            email: input.email.clone(),
            password_hash,
            name: Some(input.name.clone()),
            role: Role::Admin,
        },
    )
    .await?;
    tracing::info!(user_id = %user.id, "admin user created");
    Ok(AdminOutcome {
        user,
        created: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_is_normalized() {
        let input = AdminInput::parse("  Ops@FanPlace.KR ", " 운영자 ", "hunter22").unwrap();
        assert_eq!(input.email, "ops@fanplace.kr");
        assert_eq!(input.name, "운영자");
    }

    #[test]
    fn bad_arguments_name_the_flag() {
        let err = AdminInput::parse("ops", "운영자", "hunter22").unwrap_err();
        assert!(err.to_string().starts_with("--email"));

        let err = AdminInput::parse("ops@fanplace.kr", "운영자", "123").unwrap_err();
        assert!(err.to_string().starts_with("--password"));
    }
}
