use crate::error::AppError;
use crate::mapper::{clean, map_all};
use crate::model::{NewUser, Role, User, UserChanges, UserSummary, DEFAULT_COUNTRY};
use crate::service::validation::{self as check, Validate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Public shape of a user. There is deliberately no password field.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRefResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

pub fn to_response(user: Option<&User>) -> Option<UserResponse> {
    let user = user?;
    Some(UserResponse {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        phone: user.phone.clone(),
        address: user.address.clone(),
        city: user.city.clone(),
        country: user
            .country
            .clone()
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
        role: user.role,
        created_at: user.created_at,
        updated_at: user.updated_at,
    })
}

pub fn to_responses(users: &[User]) -> Vec<UserResponse> {
    map_all(users, to_response)
}

pub fn summary_response(summary: &UserSummary) -> UserRefResponse {
    UserRefResponse {
        id: summary.id,
        name: summary.name.clone(),
        email: summary.email.clone(),
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        check::required("name", &self.name)?;
        check::max_length("name", &self.name, 100)?;
        check::required("email", &self.email)?;
        check::email("email", &self.email)?;
        check::min_length("password", &self.password, MIN_PASSWORD_LENGTH)?;
        check::phone("phone", self.phone.as_deref())
    }
}

/// Self-registration always yields a customer; the role is never read from the body.
pub fn from_request(req: RegisterRequest, password_hash: String) -> NewUser {
    NewUser {
        name: req.name.trim().to_string(),
        email: normalize_email(&req.email),
        password_hash,
        phone: clean(req.phone),
        address: clean(req.address),
        city: clean(req.city),
        country: clean(req.country),
        role: Role::Customer,
    }
}

/// Accounts created by operators (seed script) with an explicit role.
pub fn provisioned(name: &str, email: &str, password_hash: String, role: Role) -> NewUser {
    NewUser {
        name: name.trim().to_string(),
        email: normalize_email(email),
        password_hash,
        phone: None,
        address: None,
        city: None,
        country: None,
        role,
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), AppError> {
        check::required("email", &self.email)?;
        check::required("password", &self.password)
    }
}

#[derive(Serialize, Debug)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Profile edits by the user themself.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            check::required("name", name)?;
            check::max_length("name", name, 100)?;
        }
        check::phone("phone", self.phone.as_deref())
    }
}

/// An absent field is left alone; a blank one clears the stored value.
fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| clean(Some(v)))
}

impl UpdateProfileRequest {
    pub fn into_changes(self) -> UserChanges {
        UserChanges {
            name: clean(self.name),
            phone: clearable(self.phone),
            address: clearable(self.address),
            city: clearable(self.city),
            country: clearable(self.country),
            role: None,
        }
    }
}

/// Staff edits; may also change the role.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUserRequest {
    #[serde(flatten)]
    pub profile: UpdateProfileRequest,
    #[serde(default)]
    pub role: Option<Role>,
}

impl Validate for AdminUpdateUserRequest {
    fn validate(&self) -> Result<(), AppError> {
        self.profile.validate()
    }
}

impl AdminUpdateUserRequest {
    pub fn into_changes(self) -> UserChanges {
        UserChanges {
            role: self.role,
            ..self.profile.into_changes()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(country: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Minh".into(),
            email: "minh@shop.vn".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            phone: None,
            address: None,
            city: Some("Hanoi".into()),
            country: country.map(str::to_string),
            role: Role::Customer,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn none_maps_to_none() {
        assert!(to_response(None).is_none());
    }

    #[test]
    fn password_never_serialized() {
        let json = serde_json::to_value(to_response(Some(&user(None))).unwrap()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.keys().any(|k| k.to_lowercase().contains("password")));
        assert!(!json.to_string().contains("argon2"));
    }

    #[test]
    fn country_defaults_to_vietnam() {
        assert_eq!(to_response(Some(&user(None))).unwrap().country, "Vietnam");
        assert_eq!(to_response(Some(&user(Some("Laos")))).unwrap().country, "Laos");
    }

    #[test]
    fn register_normalizes_and_forces_customer_role() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "name": " Lan ",
            "email": "  Lan@Shop.VN ",
            "password": "hunter22",
            "role": "admin",
            "city": ""
        }))
        .unwrap();
        req.validate().unwrap();
        let new_user = from_request(req, "hash".into());
        assert_eq!(new_user.email, "lan@shop.vn");
        assert_eq!(new_user.name, "Lan");
        assert_eq!(new_user.role, Role::Customer);
        assert_eq!(new_user.city, None);
    }

    #[test]
    fn short_password_rejected() {
        let req = RegisterRequest {
            name: "A".into(),
            email: "a@b.co".into(),
            password: "123".into(),
            phone: None,
            address: None,
            city: None,
            country: None,
        };
        assert!(req.validate().unwrap_err().to_string().contains("password"));
    }

    #[test]
    fn profile_update_cannot_change_role() {
        let req: UpdateProfileRequest =
            serde_json::from_value(serde_json::json!({"name": "B", "role": "owner"})).unwrap();
        assert_eq!(req.into_changes().role, None);

        let admin: AdminUpdateUserRequest =
            serde_json::from_value(serde_json::json!({"name": "B", "role": "staff"})).unwrap();
        let changes = admin.into_changes();
        assert_eq!(changes.role, Some(Role::Staff));
        assert_eq!(changes.name.as_deref(), Some("B"));
    }

    #[test]
    fn blank_profile_fields_clear_and_absent_ones_are_kept() {
        let req: UpdateProfileRequest =
            serde_json::from_value(serde_json::json!({"phone": "", "city": "  ", "address": " 12 Hang Bac "}))
                .unwrap();
        req.validate().unwrap();
        let changes = req.into_changes();
        assert_eq!(changes.phone, Some(None));
        assert_eq!(changes.city, Some(None));
        assert_eq!(changes.address, Some(Some("12 Hang Bac".to_string())));
        assert_eq!(changes.country, None);
        assert_eq!(changes.name, None);
    }

    #[test]
    fn list_maps_every_user() {
        let users = vec![user(None), user(Some("Laos"))];
        assert_eq!(to_responses(&users).len(), 2);
    }
}
