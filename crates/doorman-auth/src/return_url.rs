//! Post-redirect return-URL capture and consumption.
//!
//! One relative path per browser round-trip, carried in client-held
//! state. The tracker is a per-request object: build it from the
//! inbound cookie value, let handlers capture or consume, then flush
//! [`ReturnUrlTracker::pending_change`] into the response.

use url::Url;

/// Designated query parameter captured on unauthenticated GETs.
pub const RETURN_URL_PARAM: &str = "next";

/// Outbound mutation of the client-held return-URL state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieChange {
    Set(String),
    Clear,
}

#[derive(Debug, Default)]
pub struct ReturnUrlTracker {
    inbound: Option<String>,
    outbound: Option<CookieChange>,
    captured: bool,
}

impl ReturnUrlTracker {
    /// Build the tracker for one request from the inbound cookie value.
    pub fn from_request(inbound: Option<String>) -> Self {
        Self {
            inbound,
            outbound: None,
            captured: false,
        }
    }

    /// Capture the designated query parameter of a GET request, if set.
    pub fn capture_query(&mut self, value: Option<&str>) {
        if let Some(value) = value {
            self.set_return_url(Some(value), None);
        }
    }

    /// Store a redirect target, at most once per request: the first
    /// write wins. An explicit `url` takes precedence, then the
    /// referrer, then `/`. Absolute URLs are reduced to their relative
    /// part before storing.
    pub fn set_return_url(&mut self, url: Option<&str>, referrer: Option<&str>) {
        if self.captured {
            return;
        }
        let target = url.or(referrer).unwrap_or("/");
        self.outbound = Some(CookieChange::Set(relative_part(target)));
        self.captured = true;
    }

    /// Read and clear the stored value in one step.
    ///
    /// Falls back to `default`, then `/`; anything not rooted at `/`
    /// coerces to `/`.
    pub fn get_return_url(&mut self, default: Option<&str>) -> String {
        let stored = self.inbound.take();
        if stored.is_some() {
            self.outbound = Some(CookieChange::Clear);
        }
        let url = stored
            .or_else(|| default.map(str::to_string))
            .unwrap_or_else(|| "/".to_string());
        if url.starts_with('/') {
            url
        } else {
            "/".to_string()
        }
    }

    /// The cookie mutation to apply to the response, if any.
    pub fn pending_change(&self) -> Option<&CookieChange> {
        self.outbound.as_ref()
    }
}

/// Reduce a URL to its path (plus query), dropping scheme and host.
fn relative_part(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        // Not absolute: already a relative target.
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_query_parameter() {
        let mut tracker = ReturnUrlTracker::from_request(None);
        tracker.capture_query(Some("/path1"));
        assert_eq!(
            tracker.pending_change(),
            Some(&CookieChange::Set("/path1".into()))
        );
    }

    #[test]
    fn first_write_wins() {
        let mut tracker = ReturnUrlTracker::from_request(None);
        tracker.capture_query(Some("/path1"));
        tracker.set_return_url(Some("/path2"), None);
        assert_eq!(
            tracker.pending_change(),
            Some(&CookieChange::Set("/path1".into()))
        );
    }

    #[test]
    fn explicit_set_stores_value() {
        let mut tracker = ReturnUrlTracker::from_request(None);
        tracker.set_return_url(Some("/path2"), None);
        assert_eq!(
            tracker.pending_change(),
            Some(&CookieChange::Set("/path2".into()))
        );
    }

    #[test]
    fn falls_back_to_referrer_then_root() {
        let mut tracker = ReturnUrlTracker::from_request(None);
        tracker.set_return_url(None, Some("/path4"));
        assert_eq!(
            tracker.pending_change(),
            Some(&CookieChange::Set("/path4".into()))
        );

        let mut tracker = ReturnUrlTracker::from_request(None);
        tracker.set_return_url(None, None);
        assert_eq!(tracker.pending_change(), Some(&CookieChange::Set("/".into())));
    }

    #[test]
    fn absolute_urls_are_reduced_to_relative_part() {
        let mut tracker = ReturnUrlTracker::from_request(None);
        tracker.set_return_url(Some("http://www.my-server.com/path11"), None);
        assert_eq!(
            tracker.pending_change(),
            Some(&CookieChange::Set("/path11".into()))
        );

        let mut tracker = ReturnUrlTracker::from_request(None);
        tracker.set_return_url(Some("https://evil.example/deep/link?a=1"), None);
        assert_eq!(
            tracker.pending_change(),
            Some(&CookieChange::Set("/deep/link?a=1".into()))
        );
    }

    #[test]
    fn get_returns_stored_value_and_clears_it() {
        let mut tracker = ReturnUrlTracker::from_request(Some("/path2".into()));
        assert_eq!(tracker.get_return_url(None), "/path2");
        assert_eq!(tracker.pending_change(), Some(&CookieChange::Clear));
        // A second read sees nothing stored.
        assert_eq!(tracker.get_return_url(None), "/");
    }

    #[test]
    fn get_falls_back_to_default_then_root() {
        let mut tracker = ReturnUrlTracker::from_request(None);
        assert_eq!(tracker.get_return_url(Some("/path3")), "/path3");
        // No clear is pending when nothing was stored.
        assert_eq!(tracker.pending_change(), None);

        let mut tracker = ReturnUrlTracker::from_request(None);
        assert_eq!(tracker.get_return_url(None), "/");
    }

    #[test]
    fn non_rooted_values_coerce_to_root() {
        let mut tracker = ReturnUrlTracker::from_request(Some("garbage".into()));
        assert_eq!(tracker.get_return_url(None), "/");

        let mut tracker = ReturnUrlTracker::from_request(None);
        assert_eq!(tracker.get_return_url(Some("notrooted")), "/");
    }
}
