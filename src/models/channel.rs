//! Channel profile metadata.

use serde::{Deserialize, Serialize};

/// Channel metadata as saved in `channel_info.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChannelInfo {
    pub channel_id: String,
    pub name: String,
    pub handle: String,
    pub description: String,
    pub avatar_url: String,
    pub banner_url: String,

    /// Avatar file name relative to the archive root (empty if not downloaded)
    pub local_avatar: String,

    /// Banner file name relative to the archive root (empty if not downloaded)
    pub local_banner: String,

    pub subscriber_count: String,
}

impl ChannelInfo {
    pub fn has_avatar(&self) -> bool {
        !self.local_avatar.is_empty()
    }

    pub fn has_banner(&self) -> bool {
        !self.local_banner.is_empty()
    }
}
