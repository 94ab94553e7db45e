// share.rs: Outbound share links for a track

use crate::catalog::types::watch_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharePlatform {
    YouTube,
    Twitter,
    Facebook,
}

impl SharePlatform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::Twitter => "twitter",
            Self::Facebook => "facebook",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "youtube" | "yt" => Some(Self::YouTube),
            "twitter" | "x" => Some(Self::Twitter),
            "facebook" | "fb" => Some(Self::Facebook),
            _ => None,
        }
    }
}

/// URL to open when sharing video `id` titled `title` on `platform`.
pub fn share_url(platform: SharePlatform, id: &str, title: &str) -> String {
    let target = watch_url(id);
    match platform {
        SharePlatform::YouTube => target,
        SharePlatform::Twitter => format!(
            "https://twitter.com/intent/tweet?text={}&url={}",
            urlencoding::encode(title),
            urlencoding::encode(&target)
        ),
        SharePlatform::Facebook => format!(
            "https://www.facebook.com/sharer/sharer.php?u={}",
            urlencoding::encode(&target)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_platform_links() {
        assert_eq!(
            share_url(SharePlatform::YouTube, "abc123", "Song"),
            "https://www.youtube.com/watch?v=abc123"
        );
        assert_eq!(
            share_url(SharePlatform::Twitter, "abc123", "Deep & Low"),
            "https://twitter.com/intent/tweet?text=Deep%20%26%20Low&url=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3Dabc123"
        );
        assert_eq!(
            share_url(SharePlatform::Facebook, "abc123", ""),
            "https://www.facebook.com/sharer/sharer.php?u=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3Dabc123"
        );
    }

    #[test]
    fn parses_platform_names() {
        assert_eq!(SharePlatform::parse(" FB "), Some(SharePlatform::Facebook));
        assert_eq!(SharePlatform::parse("myspace"), None);
    }
}
