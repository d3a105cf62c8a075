use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

use crate::core::error::ValidationError;
use crate::core::identity::IdentityProvider;
use crate::core::store::{namespaced_key, read_json, write_json, KeyValueStore};

pub const CONTACT_KEY: &str = "calmly_emergency_contact";
pub const MIN_PHONE_DIGITS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub country_code: String,
    pub phone: String,
}

impl EmergencyContact {
    /// Create a contact without validating it
    pub fn new(
        name: impl Into<String>,
        country_code: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            country_code: country_code.into(),
            phone: phone.into(),
        }
    }

    /// Checks the fields the setup form checks before saving.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let code = self.country_code.trim();
        if code.len() < 2 || !code.starts_with('+') || !code[1..].chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidCountryCode(self.country_code.clone()));
        }

        let digits: String = self.phone.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.len() < MIN_PHONE_DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidPhoneNumber(self.phone.clone()));
        }

        Ok(())
    }

    /// `tel:` URI with whitespace removed from the number
    pub fn dial_uri(&self) -> String {
        let phone: String = self.phone.chars().filter(|c| !c.is_whitespace()).collect();
        format!("tel:{}{}", self.country_code.trim(), phone)
    }
}

/// The single emergency contact of the current user.
///
/// Every operation is skipped when the backend is unavailable.
pub struct ContactBook {
    store: Arc<dyn KeyValueStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl ContactBook {
    /// Create a contact book scoped to the current user of `identity`
    pub fn new(store: Arc<dyn KeyValueStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    fn key(&self) -> Option<String> {
        let user = self.identity.current_user()?;
        if !self.store.is_available() {
            return None;
        }
        Some(namespaced_key(CONTACT_KEY, &user.email, None))
    }

    /// Get the saved contact, if any
    pub fn get(&self) -> Option<EmergencyContact> {
        let key = self.key()?;
        match read_json(self.store.as_ref(), &key) {
            Ok(contact) => contact,
            Err(e) => {
                error!("Failed to read emergency contact: {}", e);
                None
            }
        }
    }

    /// Save or replace the contact
    pub fn save(&self, contact: &EmergencyContact) {
        let Some(key) = self.key() else {
            warn!("No user or storage is not available. Contact not saved.");
            return;
        };
        if let Err(e) = write_json(self.store.as_ref(), &key, contact) {
            warn!("Failed to save emergency contact: {}", e);
        }
    }

    /// Delete the contact
    pub fn delete(&self) {
        let Some(key) = self.key() else {
            warn!("No user or storage is not available. Contact not deleted.");
            return;
        };
        if let Err(e) = self.store.remove(&key) {
            warn!("Failed to delete emergency contact: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::AnonymousIdentity;
    use crate::core::store::MemoryStore;

    fn contact() -> EmergencyContact {
        EmergencyContact::new("Sam", "+44", "7700 900 123")
    }

    #[test]
    fn test_save_get_delete() {
        let book = ContactBook::new(Arc::new(MemoryStore::new()), Arc::new(AnonymousIdentity));
        assert!(book.get().is_none());

        book.save(&contact());
        assert_eq!(book.get(), Some(contact()));

        book.delete();
        assert!(book.get().is_none());
    }

    #[test]
    fn test_unavailable_store_is_noop() {
        let book = ContactBook::new(Arc::new(MemoryStore::read_only()), Arc::new(AnonymousIdentity));
        book.save(&contact());
        assert!(book.get().is_none());
        book.delete();
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(contact()).unwrap();
        assert_eq!(json["countryCode"], "+44");
    }

    #[test]
    fn test_validate() {
        assert!(contact().validate().is_ok());
        assert_eq!(
            EmergencyContact::new("  ", "+1", "5551234567").validate(),
            Err(ValidationError::EmptyName)
        );
        assert_eq!(
            EmergencyContact::new("Sam", "44", "5551234567").validate(),
            Err(ValidationError::InvalidCountryCode("44".to_string()))
        );
        assert_eq!(
            EmergencyContact::new("Sam", "+1", "555 1234").validate(),
            Err(ValidationError::InvalidPhoneNumber("555 1234".to_string()))
        );
        assert!(EmergencyContact::new("Sam", "+1", "555-123-4567").validate().is_err());
    }

    #[test]
    fn test_dial_uri() {
        assert_eq!(contact().dial_uri(), "tel:+447700900123");
    }
}
