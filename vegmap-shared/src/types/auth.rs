use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// Claims issued by the hosted identity provider.
///
/// `sub` is the provider's user id, not ours; it is mapped onto `users.id`
/// through the `users.external_id` column. The role comes from the
/// provider's public metadata and defaults to `user` when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(subject: impl Into<String>, role: UserRole, duration_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: subject.into(),
            role,
            iat: now,
            exp: now + duration_secs,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// A caller whose identity token was verified.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub external_id: String,
    pub role: UserRole,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            external_id: claims.sub,
            role: claims.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_defaults_to_user_when_claim_missing() {
        let json = r#"{"sub":"user_2abc","iat":0,"exp":10}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.role, UserRole::User);
        assert!(!claims.is_admin());
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("moderator".parse::<UserRole>().is_err());
    }

    #[test]
    fn expired_claims_are_detected() {
        let claims = Claims::new("user_2abc", UserRole::User, -60);
        assert!(claims.is_expired());
        let user = AuthUser::from(Claims::new("user_2abc", UserRole::Admin, 60));
        assert_eq!(user.external_id, "user_2abc");
        assert_eq!(user.role, UserRole::Admin);
    }
}
