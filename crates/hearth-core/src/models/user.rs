//! User identity and profile model

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Opaque identifier of the signed-in user, issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public profile stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}

impl UserProfile {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        let name = name.into().trim().to_string();
        let email = email.into().trim().to_string();

        if name.is_empty() {
            return Err(Error::InvalidInput(
                "Profile name cannot be empty".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(Error::InvalidInput(format!(
                "Profile email is not valid: {email}"
            )));
        }

        Ok(Self { name, email })
    }

    /// Build a `mailto:` link addressed to this profile.
    pub fn contact_link(&self, subject: &str, body: &str) -> ContactLink {
        let href = format!(
            "mailto:{}?subject={}&body={}",
            self.email,
            urlencoding::encode(subject),
            urlencoding::encode(body)
        );
        ContactLink {
            recipient_name: self.name.clone(),
            href,
        }
    }
}

/// A ready-to-open contact link for a listing owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactLink {
    pub recipient_name: String,
    pub href: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_profile_validation() {
        assert!(UserProfile::new("", "a@example.com").is_err());
        assert!(UserProfile::new("Ann", "not-an-email").is_err());
        assert!(UserProfile::new(" Ann ", "ann@example.com").is_ok());
    }

    #[test]
    fn test_contact_link_encodes_subject_and_body() {
        let profile = UserProfile::new("Ann", "ann@example.com").unwrap();
        let link = profile.contact_link("Sunny flat", "Is it free & available?");
        assert_eq!(link.recipient_name, "Ann");
        assert_eq!(
            link.href,
            "mailto:ann@example.com?subject=Sunny%20flat&body=Is%20it%20free%20%26%20available%3F"
        );
    }
}
