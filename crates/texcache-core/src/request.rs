use crate::error::{ProxyError, ProxyResult};

pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 50;

/// A validated package name, created per inbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    pub requested_name: String,
    /// Lower-cased form used for registry lookups and cache keys.
    pub normalized_name: String,
}

impl PackageRequest {
    /// Validates `raw` before anything touches the network.
    pub fn parse(raw: &str) -> ProxyResult<Self> {
        let name = raw.trim();
        if name.len() < MIN_NAME_LEN || name.len() > MAX_NAME_LEN {
            return Err(ProxyError::Validation(format!(
                "Invalid package name: length must be between {} and {}",
                MIN_NAME_LEN, MAX_NAME_LEN
            )));
        }
        if !name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(ProxyError::Validation(
                "Invalid package name: only letters, digits, '_' and '-' are allowed".into(),
            ));
        }
        Ok(Self {
            requested_name: name.to_string(),
            normalized_name: name.to_ascii_lowercase(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        let req = PackageRequest::parse("TikZ-cd_2").unwrap();
        assert_eq!(req.requested_name, "TikZ-cd_2");
        assert_eq!(req.normalized_name, "tikz-cd_2");
        assert!(PackageRequest::parse("ab").is_ok());
        assert!(PackageRequest::parse(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn test_invalid_names() {
        for bad in ["", "a", "foo.sty", "../etc", "a b", "pkg%2F", &"a".repeat(51)] {
            assert!(
                matches!(PackageRequest::parse(bad), Err(ProxyError::Validation(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
