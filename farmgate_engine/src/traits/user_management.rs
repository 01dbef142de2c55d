use crate::{
    db_types::{NewUser, User},
    traits::StorageError,
};

/// User lookups for role checks and seller validation. Registration and authentication happen
/// upstream of this system; the engine only reads users, plus an upsert for seeding and admin
/// tooling.
#[allow(async_fn_in_trait)]
pub trait UserManagement {
    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, StorageError>;

    async fn fetch_user_by_phone(&self, phone: &str) -> Result<Option<User>, StorageError>;

    /// Insert the user, or update name and role if the phone number is already registered.
    async fn upsert_user(&self, user: NewUser) -> Result<User, StorageError>;
}
