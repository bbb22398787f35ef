use sqlx::sqlite::SqlitePool;

/// Role granted to every newly registered user.
pub const DEFAULT_ROLE: &str = "user";

/// Role required by administrative endpoints.
pub const ADMIN_ROLE: &str = "admin";

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    /// Never empty; falls back to `["user"]`.
    pub roles: Vec<String>,
    pub created_at: String,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
    roles: String,
    created_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            roles: parse_roles(&row.roles),
            created_at: row.created_at,
        }
    }
}

fn parse_roles(raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(roles) if !roles.is_empty() => roles,
        _ => vec![DEFAULT_ROLE.to_string()],
    }
}

/// Sort, dedupe and default an incoming role list.
fn normalize_roles(roles: &[String]) -> Vec<String> {
    let mut roles: Vec<String> = roles
        .iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    roles.sort();
    roles.dedup();
    if roles.is_empty() {
        roles.push(DEFAULT_ROLE.to_string());
    }
    roles
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user with a fresh UUID.
    /// Fails with a unique-violation database error if the email is taken.
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        roles: &[String],
    ) -> Result<User, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let roles = normalize_roles(roles);
        let roles_json = serde_json::to_string(&roles).map_err(|e| sqlx::Error::Encode(e.into()))?;

        sqlx::query("INSERT INTO users (id, email, password_hash, roles) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(email)
            .bind(password_hash)
            .bind(&roles_json)
            .execute(&self.pool)
            .await?;

        self.get_by_id(&id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, password_hash, roles, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, password_hash, roles, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    /// Replace the role set of a user.
    pub async fn set_roles(&self, id: &str, roles: &[String]) -> Result<bool, sqlx::Error> {
        let roles_json = serde_json::to_string(&normalize_roles(roles))
            .map_err(|e| sqlx::Error::Encode(e.into()))?;
        let result = sqlx::query("UPDATE users SET roles = ? WHERE id = ?")
            .bind(&roles_json)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user by ID. Their refresh tokens go with them.
    pub async fn delete(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}
