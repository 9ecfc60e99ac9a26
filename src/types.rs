/// Shared types used across the codebase
///
/// Every enum here is stored as TEXT in Postgres and travels as a snake_case
/// string in JSON, so the sqlx and serde representations are the same token.
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl Type<Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <str as Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <str as Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let text = <&str as Decode<Postgres>>::decode(value)?;
                Ok(text.parse::<$name>()?)
            }
        }

        impl<'q> Encode<'q, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> IsNull {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

text_enum! {
    /// User access level, ordered from least to most privileged.
    #[derive(PartialOrd, Ord)]
    AccessLevel {
        Deny => "deny",
        Read => "read",
        Edit => "edit",
        Full => "full",
        Root => "root",
    }
}

text_enum! {
    MemberStatus {
        Active => "active",
        Inactive => "inactive",
        Visitor => "visitor",
    }
}

text_enum! {
    /// Role of a member inside one cell group.
    CellRole {
        Leader => "leader",
        Assistant => "assistant",
        Member => "member",
    }
}

text_enum! {
    /// Church-wide leadership qualification held by a member.
    LeadershipRole {
        CellLeader => "cell_leader",
        AssistantLeader => "assistant_leader",
        Deacon => "deacon",
        Elder => "elder",
        Pastor => "pastor",
        MinistryHead => "ministry_head",
    }
}

text_enum! {
    ExitType {
        Moved => "moved",
        Transferred => "transferred",
        Deceased => "deceased",
        Withdrawn => "withdrawn",
        Disciplinary => "disciplinary",
        Other => "other",
    }
}

text_enum! {
    ExitStatus {
        Active => "active",
        Reinstated => "reinstated",
    }
}

text_enum! {
    AuditAction {
        ExitRecorded => "exit_recorded",
        ExitUpdated => "exit_updated",
        Reinstated => "reinstated",
    }
}

text_enum! {
    GivingMethod {
        Cash => "cash",
        Check => "check",
        Card => "card",
        Transfer => "transfer",
        Online => "online",
        Other => "other",
    }
}

text_enum! {
    PrayerStatus {
        Open => "open",
        Answered => "answered",
        Archived => "archived",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_levels_are_ordered() {
        assert!(AccessLevel::Deny < AccessLevel::Read);
        assert!(AccessLevel::Read < AccessLevel::Edit);
        assert!(AccessLevel::Edit < AccessLevel::Full);
        assert!(AccessLevel::Full < AccessLevel::Root);
    }

    #[test]
    fn text_matches_serde_token() {
        for role in LeadershipRole::ALL {
            let json = serde_json::to_value(role).unwrap();
            assert_eq!(json, serde_json::Value::String(role.as_str().to_string()));
            assert_eq!(role.as_str().parse::<LeadershipRole>().unwrap(), *role);
        }
        for action in AuditAction::ALL {
            let json = serde_json::to_value(action).unwrap();
            assert_eq!(json.as_str(), Some(action.as_str()));
        }
    }

    #[test]
    fn unknown_text_is_rejected() {
        let err = "relocated".parse::<ExitType>().unwrap_err();
        assert_eq!(err.kind, "ExitType");
        assert_eq!(err.to_string(), "invalid ExitType: 'relocated'");
    }
}
