use url::Url;

/// Host of a parseable absolute URL, or `None`. Policy lookups treat `None`
/// as the empty host and fall back to defaults.
pub fn url_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|host| host.to_ascii_lowercase())
}
