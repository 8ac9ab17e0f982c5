use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            /// Generate a fresh identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                s.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(d: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(d)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

entity_id! {
    /// Identifier of an organization.
    OrganizationId
}

entity_id! {
    /// Identifier of a profile. Equal to the authenticated user id of its owner.
    ProfileId
}

entity_id! {
    /// Identifier of a group.
    GroupId
}

entity_id! {
    /// Identifier of a membership row linking one profile to one group.
    MemberId
}

entity_id! {
    /// Identifier of a session.
    SessionId
}

entity_id! {
    /// Identifier of a session history entry.
    HistoryEntryId
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn ids_use_uuid_v7() {
        assert_eq!(GroupId::new().0.get_version_num(), 7);
        assert_eq!(SessionId::new().0.get_version_num(), 7);
    }

    #[test]
    fn profile_id_serializes_as_plain_string() {
        let uuid = Uuid::now_v7();
        let json = serde_json::to_string(&ProfileId(uuid)).expect("must serialize id");
        assert_eq!(json, format!("\"{uuid}\""));
        let parsed: ProfileId = serde_json::from_str(&json).expect("must parse id");
        assert_eq!(parsed.0, uuid);
    }

    #[test]
    fn malformed_id_is_rejected() {
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }
}
