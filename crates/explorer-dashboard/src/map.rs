use explorer_weather::Coordinates;
use url::Url;

const EMBED_BASE: &str = "https://www.google.com/maps/embed/v1/place";

/// Embed URL for the map widget centred on `center`
pub fn embed_url(api_key: &str, center: Coordinates) -> Result<Url, url::ParseError> {
    Url::parse_with_params(
        EMBED_BASE,
        &[("key", api_key.to_string()), ("q", center.to_string())],
    )
}
