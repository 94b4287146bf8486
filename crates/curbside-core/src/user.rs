//! User records.
//!
//! Decoding is lenient: a missing or mistyped `fullname`/`email` becomes an
//! empty string, and a missing or unknown `accountType` stays unset rather
//! than falling back to a default role.

use ciborium::Value;

use crate::{
    Coordinate, DocumentError,
    document::{self, Document},
};

/// Role chosen at signup. Encoded as `0` (passenger) or `1` (driver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountType {
    /// Requests rides.
    Passenger,
    /// Claims and drives rides.
    Driver,
}

impl AccountType {
    /// Integer stored in the `accountType` field.
    pub fn as_index(self) -> u8 {
        match self {
            Self::Passenger => 0,
            Self::Driver => 1,
        }
    }

    /// Role for a stored integer. `None` if out of range.
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::Passenger),
            1 => Some(Self::Driver),
            _ => None,
        }
    }
}

/// A user as stored under `users/{uid}`.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Unique identity assigned by the authentication provider.
    pub uid: String,
    /// Display name.
    pub fullname: String,
    /// Login email (lowercased at signup).
    pub email: String,
    /// Role. `None` if the document has no valid `accountType`.
    pub account_type: Option<AccountType>,
    /// Last known position. Only set for drivers found by a geo query.
    pub location: Option<Coordinate>,
}

impl User {
    /// Create a user with no known location.
    pub fn new(
        uid: impl Into<String>,
        fullname: impl Into<String>,
        email: impl Into<String>,
        account_type: AccountType,
    ) -> Self {
        Self {
            uid: uid.into(),
            fullname: fullname.into(),
            email: email.into(),
            account_type: Some(account_type),
            location: None,
        }
    }

    /// User is registered as a driver.
    pub fn is_driver(&self) -> bool {
        self.account_type == Some(AccountType::Driver)
    }

    /// First character of the name, or `X` for an empty name.
    pub fn initial(&self) -> char {
        self.fullname.chars().next().unwrap_or('X')
    }

    /// Decode a `users/{uid}` snapshot.
    ///
    /// Fails only if the snapshot is not a map.
    pub fn from_document(uid: impl Into<String>, doc: &Document) -> Result<Self, DocumentError> {
        if !doc.is_map() {
            return Err(DocumentError::NotAMap);
        }

        Ok(Self {
            uid: uid.into(),
            fullname: document::text_field(doc, "fullname").unwrap_or_default().to_owned(),
            email: document::text_field(doc, "email").unwrap_or_default().to_owned(),
            account_type: document::int_field(doc, "accountType").and_then(AccountType::from_index),
            location: None,
        })
    }

    /// Encode as a `users/{uid}` document. Location is not part of it.
    pub fn to_document(&self) -> Document {
        let mut fields = vec![
            ("email", Value::Text(self.email.clone())),
            ("fullname", Value::Text(self.fullname.clone())),
        ];
        if let Some(account_type) = self.account_type {
            fields.push(("accountType", Value::Integer(account_type.as_index().into())));
        }
        document::map(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_keeps_fields() {
        let user = User::new("u1", "Jane Rider", "jane@example.com", AccountType::Driver);
        let decoded = User::from_document("u1", &user.to_document());
        assert_eq!(decoded, Ok(user));
    }

    #[test]
    fn absent_account_type_is_unset() {
        let doc = document::map([("fullname", Value::Text("Sam".into()))]);
        let user = User::from_document("u2", &doc).map(|u| (u.account_type, u.email));
        assert_eq!(user, Ok((None, String::new())));
    }

    #[test]
    fn unknown_account_type_is_unset() {
        let doc = document::map([("accountType", Value::Integer(7u8.into()))]);
        assert_eq!(User::from_document("u3", &doc).map(|u| u.account_type), Ok(None));
    }

    #[test]
    fn mistyped_account_type_is_unset() {
        let doc = document::map([("accountType", Value::Text("driver".into()))]);
        assert_eq!(User::from_document("u4", &doc).map(|u| u.account_type), Ok(None));
    }

    #[test]
    fn non_map_snapshot_is_rejected() {
        assert_eq!(User::from_document("u5", &Value::Null), Err(DocumentError::NotAMap));
    }

    #[test]
    fn initial_of_empty_name() {
        let user = User::new("u6", "", "e", AccountType::Passenger);
        assert_eq!(user.initial(), 'X');
    }
}
