pub trait UrlBuilder: Send + Sync {
    /// Public URL of a stored blob path (`<object_type>/<file_name>`).
    fn public_url(&self, stored_path: &str) -> String;
    /// Asset path shown when an owner of `asset_type` has no usable file.
    fn default_asset(&self, asset_type: &str) -> String;
    fn asset_url(&self, asset_path: &str) -> String;
}
