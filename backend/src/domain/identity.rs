//! Who is acting on a request.
//!
//! Identity is injected by the user-identification middleware from a trusted
//! proxy header or a static value. No credential verification happens here.

use std::fmt;

/// Non-empty name of a link owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserName(String);

impl UserName {
    /// Validate and wrap a user name; `None` when blank.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() { None } else { Some(Self(raw)) }
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for UserName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity granted to a request by the identification layer.
///
/// `Anonymous` is a granted capability with no user attached (the proxy sent
/// no header, say); it is distinct from the capability being absent
/// altogether, which the request context models with `Option<Identity>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// No user name was supplied.
    Anonymous,
    /// A named user.
    User(UserName),
}

impl Identity {
    /// Build an identity from a raw header or configured value.
    ///
    /// # Examples
    /// ```
    /// use urlredir::domain::Identity;
    ///
    /// assert_eq!(Identity::from_raw(""), Identity::Anonymous);
    /// assert_eq!(Identity::from_raw("ada").user_name().map(|u| u.as_str()), Some("ada"));
    /// ```
    pub fn from_raw(raw: &str) -> Self {
        UserName::new(raw).map_or(Self::Anonymous, Self::User)
    }

    /// The user name, when one was supplied.
    pub fn user_name(&self) -> Option<&UserName> {
        match self {
            Self::Anonymous => None,
            Self::User(name) => Some(name),
        }
    }

    /// Display form; empty for anonymous requests.
    pub fn as_str(&self) -> &str {
        self.user_name().map_or("", UserName::as_str)
    }
}
