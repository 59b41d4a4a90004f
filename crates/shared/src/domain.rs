use serde::{Deserialize, Serialize};

/// Lookup key for a member display name.
///
/// Normalization strips every whitespace character, ASCII and full-width
/// alike, so "Jane Doe", "JaneDoe" and "Jane　Doe" all collapse to the same
/// key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameKey(String);

impl NameKey {
    pub fn new(raw: &str) -> Self {
        Self(raw.chars().filter(|c| !c.is_whitespace()).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Marketplace links attached to a member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoodsLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rakuten: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amazon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yahoo: Option<String>,
}

impl GoodsLinks {
    pub fn is_empty(&self) -> bool {
        self.rakuten.is_none() && self.amazon.is_none() && self.yahoo.is_none()
    }
}

/// One record of the static member resource.
///
/// The source document is hand-maintained and spells the image field as
/// `image` or `imageUrl` and the goods map as `goods` or `goodsLinks`,
/// sometimes both. Both spellings are kept and resolved through the
/// accessors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goods: Option<GoodsLinks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goods_links: Option<GoodsLinks>,
}

impl MemberRecord {
    pub fn name_key(&self) -> NameKey {
        NameKey::new(&self.name)
    }

    /// `image` wins over `imageUrl`; empty strings count as absent.
    pub fn display_image(&self) -> Option<&str> {
        [self.image.as_deref(), self.image_url.as_deref()]
            .into_iter()
            .flatten()
            .find(|url| !url.is_empty())
    }

    /// `goods` wins over `goodsLinks`.
    pub fn marketplace_links(&self) -> GoodsLinks {
        self.goods
            .clone()
            .filter(|links| !links.is_empty())
            .or_else(|| self.goods_links.clone())
            .unwrap_or_default()
    }
}
