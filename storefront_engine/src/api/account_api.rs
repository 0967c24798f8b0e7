use log::*;

use crate::{
    db_types::{Address, LineItem, NewAddress, NewUser, User},
    traits::{AccountError, AccountManagement},
};

/// `AccountApi` covers everything attached to a customer account: the mirrored identity record, delivery addresses
/// and the active cart.
pub struct AccountApi<B> {
    db: B,
}

impl<B> AccountApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub async fn user(&self, user_id: &str) -> Result<User, AccountError> {
        self.db.fetch_user(user_id).await?.ok_or_else(|| AccountError::UserNotFound(user_id.to_string()))
    }

    /// Mirror a `user created`/`user updated` event from the identity provider.
    pub async fn sync_user(&self, user: NewUser) -> Result<User, AccountError> {
        let user = self.db.upsert_user(user).await?;
        debug!("👤️ Synced identity record for {}", user.id);
        Ok(user)
    }

    /// Mirror a `user deleted` event from the identity provider.
    pub async fn remove_user(&self, user_id: &str) -> Result<(), AccountError> {
        self.db.delete_user(user_id).await?;
        info!("👤️ Removed identity record for {user_id}");
        Ok(())
    }

    pub async fn addresses(&self, user_id: &str) -> Result<Vec<Address>, AccountError> {
        self.db.fetch_addresses(user_id).await
    }

    pub async fn add_address(&self, user_id: &str, address: NewAddress) -> Result<Address, AccountError> {
        let address = self.db.insert_address(user_id, address).await?;
        debug!("🏠️ Address {} added for {user_id}", address.id);
        Ok(address)
    }

    pub async fn update_address(&self, id: i64, user_id: &str, address: NewAddress) -> Result<Address, AccountError> {
        self.db.update_address(id, user_id, address).await
    }

    pub async fn delete_address(&self, id: i64, user_id: &str) -> Result<(), AccountError> {
        self.db.delete_address(id, user_id).await
    }

    pub async fn cart(&self, user_id: &str) -> Result<Vec<LineItem>, AccountError> {
        self.db.fetch_cart(user_id).await
    }

    /// Replace the cart wholesale. Lines with a non-positive quantity are dropped rather than stored.
    pub async fn set_cart(&self, user_id: &str, items: Vec<LineItem>) -> Result<(), AccountError> {
        let items: Vec<LineItem> = items.into_iter().filter(|i| i.quantity > 0).collect();
        self.db.replace_cart(user_id, &items).await?;
        debug!("🛒️ Cart for {user_id} replaced with {} line(s)", items.len());
        Ok(())
    }
}
