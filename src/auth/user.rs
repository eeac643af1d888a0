//! Identity and profile records plus the request payloads that create them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::models::Role;
use crate::domain::UserId;

/// Stored identity. The password hash never leaves the credential layer.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub password_hash: String,
    pub role: Role,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// Contact and demographic attributes of an identity. `email` is unique and
/// compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    pub email: String,
    pub name: String,
    pub birthdate: NaiveDate,
    pub phone_number: String,
    /// Messaging handle, `@` followed by 5-32 word characters
    pub telegram: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub employment: String,
    #[serde(default)]
    pub is_business_owner: String,
    #[serde(default)]
    pub position_at_work: String,
    #[serde(default)]
    pub month_income: Option<i64>,
}

/// Full replacement of the editable profile fields.
///
/// `email` is absent because it is the subject of every issued token. An
/// `email` key in the request body is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub birthdate: NaiveDate,
    pub phone_number: String,
    pub telegram: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub employment: String,
    #[serde(default)]
    pub is_business_owner: String,
    #[serde(default)]
    pub position_at_work: String,
    #[serde(default)]
    pub month_income: Option<i64>,
}

impl UpdateProfileRequest {
    /// The profile that results from applying this edit to an account with `email`.
    pub fn into_profile(self, email: String) -> ProfileFields {
        ProfileFields {
            email,
            name: self.name,
            birthdate: self.birthdate,
            phone_number: self.phone_number,
            telegram: self.telegram,
            city: self.city,
            age: self.age,
            employment: self.employment,
            is_business_owner: self.is_business_owner,
            position_at_work: self.position_at_work,
            month_income: self.month_income,
        }
    }
}

impl From<ProfileFields> for UpdateProfileRequest {
    fn from(profile: ProfileFields) -> Self {
        Self {
            name: profile.name,
            birthdate: profile.birthdate,
            phone_number: profile.phone_number,
            telegram: profile.telegram,
            city: profile.city,
            age: profile.age,
            employment: profile.employment,
            is_business_owner: profile.is_business_owner,
            position_at_work: profile.position_at_work,
            month_income: profile.month_income,
        }
    }
}

/// Public view of an identity with its profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub role: Role,
    #[serde(flatten)]
    pub profile: ProfileFields,
    pub created_at: DateTime<Utc>,
}

/// Everything persisted atomically at registration.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub id: UserId,
    pub password_hash: String,
    pub role: Role,
    pub profile: ProfileFields,
    pub refresh_token: String,
}

/// Sign-up payload.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(flatten)]
    pub profile: ProfileFields,
    pub password: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("profile", &self.profile)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sign-in payload.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn sample_profile(email: &str) -> ProfileFields {
    ProfileFields {
        email: email.to_string(),
        name: "Alice".to_string(),
        birthdate: NaiveDate::from_ymd_opt(1995, 4, 12).expect("valid date"),
        phone_number: "+79991234567".to_string(),
        telegram: "@alice_learns".to_string(),
        city: "Kazan".to_string(),
        age: Some(29),
        employment: "employed".to_string(),
        is_business_owner: "no".to_string(),
        position_at_work: "analyst".to_string(),
        month_income: Some(120_000),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_reads_flat_json() {
        let json = serde_json::json!({
            "email": "alice@example.com",
            "name": "Alice",
            "birthdate": "1995-04-12",
            "phone_number": "+79991234567",
            "telegram": "@alice_learns",
            "password": "Passw0rd!"
        });
        let request: RegisterRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.profile.email, "alice@example.com");
        assert_eq!(request.profile.city, "");
        assert_eq!(request.profile.age, None);
        assert_eq!(request.password, "Passw0rd!");
    }

    #[test]
    fn secrets_are_not_debug_printed() {
        let request = LoginRequest { email: "a@b.co".into(), password: "Passw0rd!".into() };
        assert!(!format!("{:?}", request).contains("Passw0rd!"));

        let identity =
            Identity { id: UserId::new(), password_hash: "$argon2id$...".into(), role: Role::Standard };
        assert!(!format!("{:?}", identity).contains("argon2id"));
    }

    #[test]
    fn user_serializes_profile_inline() {
        let user = User {
            id: UserId::new(),
            role: Role::Standard,
            profile: sample_profile("alice@example.com"),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["email"], "alice@example.com");
        assert_eq!(value["role"], "standard");
        assert!(value.get("password_hash").is_none());
    }
}
