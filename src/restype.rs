#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//===========================================================================//

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
/// The kinds of executable resource that icons are stored in.
pub enum ResourceType {
    /// A single icon image (`RT_ICON`)
    Icon,
    /// A directory of icon images making up one icon (`RT_GROUP_ICON`)
    GroupIcon,
}

impl ResourceType {
    /// Returns the resource type for a numeric resource type id, if it is one
    /// of the icon types.
    pub fn from_number(number: u32) -> Option<ResourceType> {
        match number {
            3 => Some(ResourceType::Icon),
            14 => Some(ResourceType::GroupIcon),
            _ => None,
        }
    }

    /// Returns the numeric resource type id.
    pub fn number(&self) -> u32 {
        match *self {
            ResourceType::Icon => 3,
            ResourceType::GroupIcon => 14,
        }
    }
}

//===========================================================================//


//===========================================================================//
