//! SeaORM Entity for video rows in the shared media table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Visibility levels a video can be filtered by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Public,
    LoggedIn,
    OnlyMe,
    Friends,
    GroupOnly,
    Message,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::LoggedIn => "loggedin",
            Self::OnlyMe => "onlyme",
            Self::Friends => "friends",
            Self::GroupOnly => "grouponly",
            Self::Message => "message",
        }
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Privacy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "loggedin" => Ok(Self::LoggedIn),
            "onlyme" => Ok(Self::OnlyMe),
            "friends" => Ok(Self::Friends),
            "grouponly" => Ok(Self::GroupOnly),
            "message" => Ok(Self::Message),
            other => Err(format!("unknown privacy level: {}", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bp_media")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub blog_id: i32,
    pub attachment_id: i32,
    pub user_id: i32,
    #[sea_orm(column_type = "Text")]
    pub title: String,
    pub album_id: i32,
    pub activity_id: i32,
    pub group_id: i32,
    /// Stored as written; callers are trusted to use a [`Privacy`] value.
    pub privacy: String,
    pub menu_order: i32,
    pub date_created: DateTime,
    /// Media kind discriminator, `video` for every row this crate owns.
    #[sea_orm(column_name = "type")]
    #[serde(skip)]
    pub media_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_round_trips_through_str() {
        for privacy in [
            Privacy::Public,
            Privacy::LoggedIn,
            Privacy::OnlyMe,
            Privacy::Friends,
            Privacy::GroupOnly,
            Privacy::Message,
        ] {
            assert_eq!(privacy.as_str().parse::<Privacy>(), Ok(privacy));
        }
    }

    #[test]
    fn test_unknown_privacy_is_rejected() {
        assert!("everyone".parse::<Privacy>().is_err());
    }
}
