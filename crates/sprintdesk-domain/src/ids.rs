use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {label} id '{raw}': expected a positive integer")]
pub struct IdParseError {
    pub label: &'static str,
    pub raw: String,
}

fn parse_positive_id(label: &'static str, raw: &str) -> Result<u64, IdParseError> {
    let invalid = || IdParseError {
        label,
        raw: raw.to_owned(),
    };
    let value = raw.trim().parse::<u64>().map_err(|_| invalid())?;
    if value == 0 {
        return Err(invalid());
    }
    Ok(value)
}

macro_rules! numeric_id {
    ($name:ident, $label:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> u64 {
                self.0
            }

            pub const fn label() -> &'static str {
                $label
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                parse_positive_id($label, raw).map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(TeamId, "team");
numeric_id!(ProjectId, "project");
numeric_id!(SprintId, "sprint");
numeric_id!(TaskId, "task");
numeric_id!(UserId, "user");
numeric_id!(MembershipId, "membership");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_from_trimmed_positive_integers() {
        assert_eq!(" 42 ".parse::<TeamId>(), Ok(TeamId::new(42)));
        assert_eq!("7".parse::<SprintId>().map(SprintId::get), Ok(7));
    }

    #[test]
    fn ids_reject_zero_and_non_numeric_values() {
        let zero = "0".parse::<ProjectId>().expect_err("zero is not a valid id");
        assert_eq!(
            zero.to_string(),
            "invalid project id '0': expected a positive integer"
        );
        assert!("abc".parse::<UserId>().is_err());
        assert!("".parse::<TaskId>().is_err());
        assert!("-3".parse::<MembershipId>().is_err());
    }

    #[test]
    fn ids_serialize_as_bare_integers() {
        let encoded = serde_json::to_string(&TeamId::new(10)).expect("encode id");
        assert_eq!(encoded, "10");
        let decoded: UserId = serde_json::from_str("3").expect("decode id");
        assert_eq!(decoded, UserId::new(3));
    }
}
