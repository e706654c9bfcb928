//! Identifiers issued by the identity provider.
//!
//! Both wrap a UUID so a user id can never be passed where a session id is
//! expected. They serialize as the bare hyphenated string, which is how the
//! provider writes `sub` and `session_id` into its tokens.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValueError;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl FromStr for $name {
            type Err = ValueError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::try_parse(s.trim())
                    .map(Self)
                    .map_err(|e| ValueError::malformed_id($kind, e))
            }
        }
    };
}

uuid_identifier!(
    /// Account id, the `sub` of a session token and the key of role rows.
    UserId,
    "user id"
);

uuid_identifier!(
    /// One sign-in. Signing out revokes it without touching other sessions
    /// of the same user.
    SessionId,
    "session id"
);
