use std::collections::HashMap;

use crate::application::ports::url_builder::UrlBuilder;

pub const UPLOADS_ROUTE: &str = "/api/uploads";
pub const ASSETS_ROUTE: &str = "/api/assets";

/// Builds URLs under the service's own upload and asset routes, absolute
/// when a public base URL is configured.
pub struct ConfiguredUrlBuilder {
    public_base_url: Option<String>,
    default_assets: HashMap<String, String>,
    fallback_asset: String,
}

impl ConfiguredUrlBuilder {
    pub fn new(
        public_base_url: Option<String>,
        default_assets: HashMap<String, String>,
        fallback_asset: String,
    ) -> Self {
        Self {
            public_base_url: public_base_url.map(|b| b.trim_end_matches('/').to_string()),
            default_assets,
            fallback_asset,
        }
    }

    fn under(&self, route: &str, path: &str) -> String {
        let encoded = path
            .trim_start_matches('/')
            .split('/')
            .filter(|seg| !seg.is_empty())
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        if let Some(base) = self.public_base_url.as_deref() {
            format!("{}{}/{}", base, route, encoded)
        } else {
            format!("{}/{}", route, encoded)
        }
    }
}

impl UrlBuilder for ConfiguredUrlBuilder {
    fn public_url(&self, stored_path: &str) -> String {
        self.under(UPLOADS_ROUTE, stored_path)
    }

    fn default_asset(&self, asset_type: &str) -> String {
        self.default_assets
            .get(asset_type)
            .cloned()
            .unwrap_or_else(|| self.fallback_asset.clone())
    }

    fn asset_url(&self, asset_path: &str) -> String {
        self.under(ASSETS_ROUTE, asset_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(base: Option<&str>) -> ConfiguredUrlBuilder {
        let mut assets = HashMap::new();
        assets.insert("users".to_string(), "img/avatar.png".to_string());
        ConfiguredUrlBuilder::new(
            base.map(str::to_string),
            assets,
            "img/default-image.png".into(),
        )
    }

    #[test]
    fn relative_urls_without_base() {
        let b = builder(None);
        assert_eq!(b.public_url("users/a.png"), "/api/uploads/users/a.png");
        assert_eq!(b.asset_url("img/x.png"), "/api/assets/img/x.png");
    }

    #[test]
    fn absolute_urls_with_base() {
        let b = builder(Some("https://files.example.com/"));
        assert_eq!(
            b.public_url("users/a.png"),
            "https://files.example.com/api/uploads/users/a.png"
        );
    }

    #[test]
    fn encodes_each_segment() {
        let b = builder(None);
        assert_eq!(
            b.public_url("posts/my photo#1.png"),
            "/api/uploads/posts/my%20photo%231.png"
        );
    }

    #[test]
    fn mapped_type_or_fallback_asset() {
        let b = builder(None);
        assert_eq!(b.default_asset("users"), "img/avatar.png");
        assert_eq!(b.default_asset("posts"), "img/default-image.png");
    }
}
