use url::Url;

use crate::error::{DescriptionError, Result};

/// Resolve a URL found in a description document against the document's base.
///
/// Absolute references are returned as-is, relative ones (with or without a
/// leading slash) are joined onto `base` following RFC 3986.
pub fn resolve_url(base: &Url, reference: &str) -> Result<Url> {
    let reference = reference.trim();
    base.join(reference).map_err(|e| DescriptionError::InvalidUrl {
        url: reference.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/upnp/control/rc", "http://10.0.0.2:8080/upnp/control/rc")]
    #[case("control/rc", "http://10.0.0.2:8080/desc/control/rc")]
    #[case("  /padded  ", "http://10.0.0.2:8080/padded")]
    #[case("http://10.0.0.9/other", "http://10.0.0.9/other")]
    fn test_resolve_url(#[case] reference: &str, #[case] expected: &str) {
        let base = Url::parse("http://10.0.0.2:8080/desc/device.xml").unwrap();
        assert_eq!(resolve_url(&base, reference).unwrap().as_str(), expected);
    }

    #[test]
    fn test_resolve_url_invalid() {
        let base = Url::parse("http://10.0.0.2:8080/").unwrap();
        let err = resolve_url(&base, "http://[::1").unwrap_err();
        assert!(matches!(err, DescriptionError::InvalidUrl { .. }));
    }
}
