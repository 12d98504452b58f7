use crate::extractors::Listing;
use crate::model::Identified;
use crate::sql::{Column, TableDef};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const DEFAULT_COUNTRY: &str = "Vietnam";

text_enum!(Role {
    Admin => "admin",
    Owner => "owner",
    Staff => "staff",
    Customer => "customer",
});

impl Role {
    /// May manage catalog, orders and shipments.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Owner | Role::Staff)
    }

    /// May delete accounts.
    pub fn can_manage_users(self) -> bool {
        matches!(self, Role::Admin | Role::Owner)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// argon2 PHC string. Never leaves the service layer.
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: Some(self.email.clone()),
        }
    }
}

/// What a populated user reference carries.
#[derive(Clone, Debug, PartialEq)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
}

impl Identified for UserSummary {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub role: Role,
}

impl NewUser {
    pub fn into_record(self, id: Uuid, now: DateTime<Utc>) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            phone: self.phone,
            address: self.address,
            city: self.city,
            country: self.country,
            role: self.role,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; `None` leaves the stored value alone. The optional contact fields take
/// `Some(None)` to clear them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub country: Option<Option<String>>,
    pub role: Option<Role>,
}

const USERS_TABLE: TableDef = TableDef {
    alias: "u",
    from: "users u",
    select: "u.*",
    columns: &[
        Column { api: "name", name: "name", pg_type: "text" },
        Column { api: "email", name: "email", pg_type: "text" },
        Column { api: "role", name: "role", pg_type: "text" },
        Column { api: "city", name: "city", pg_type: "text" },
        Column { api: "country", name: "country", pg_type: "text" },
        Column { api: "createdAt", name: "created_at", pg_type: "timestamptz" },
    ],
    default_sort: "created_at",
};

impl Listing for User {
    const SORTABLE: &'static [&'static str] = &["name", "email", "createdAt", "role"];
    const FILTERABLE: &'static [&'static str] = &["role", "city", "country"];
    const TABLE: &'static TableDef = &USERS_TABLE;
}
