//! Cache headers of portal responses and the directives browsers send

use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};
use http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use log::warn;

/// Cache-Control directives of a response
#[derive(Debug, Clone, Default)]
pub struct CacheControl {
    pub no_cache: bool,
    pub no_store: bool,
    pub must_revalidate: bool,
    pub private: bool,
    pub max_age: Option<u32>,
}

impl CacheControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }

    pub fn no_store(mut self) -> Self {
        self.no_store = true;
        self
    }

    pub fn must_revalidate(mut self) -> Self {
        self.must_revalidate = true;
        self
    }

    /// Responses depend on the signed-in user, so shared caches must not keep them
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn to_header_value(&self) -> HeaderValue {
        let mut parts = Vec::new();

        if self.no_cache {
            parts.push("no-cache".to_string());
        }
        if self.no_store {
            parts.push("no-store".to_string());
        }
        if self.must_revalidate {
            parts.push("must-revalidate".to_string());
        }
        if self.private {
            parts.push("private".to_string());
        }
        if let Some(max_age) = self.max_age {
            parts.push(format!("max-age={max_age}"));
        }

        HeaderValue::from_str(&parts.join(", ")).unwrap_or(HeaderValue::from_static(""))
    }
}

/// Cache-Control, Pragma and Expires headers applied together
#[derive(Debug, Clone, Default)]
pub struct CacheHeaders {
    cache_control: CacheControl,
    expires: Option<DateTime<Utc>>,
}

impl CacheHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_control(mut self, cache_control: CacheControl) -> Self {
        self.cache_control = cache_control;
        self
    }

    pub fn expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn apply<B>(&self, response: &mut axum::response::Response<B>) {
        let headers = response.headers_mut();

        headers.insert(CACHE_CONTROL, self.cache_control.to_header_value());

        if self.cache_control.no_cache {
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        }

        if let Some(expires) = self.expires {
            match HeaderValue::from_str(&expires.to_rfc2822()) {
                Ok(expires_value) => {
                    headers.insert(EXPIRES, expires_value);
                }
                Err(e) => warn!("failed to set expires header: {e}"),
            }
        } else if self.cache_control.no_store || self.cache_control.no_cache {
            headers.insert(EXPIRES, HeaderValue::from_static("0"));
        }
    }
}

pub mod presets {
    use super::*;
    use chrono::Duration;

    /// Session-bound data and fallback answers
    pub fn no_cache() -> CacheHeaders {
        CacheHeaders::new()
            .cache_control(CacheControl::new().no_cache().no_store().must_revalidate())
            .expires(Utc::now() - Duration::hours(1))
    }

    /// Data the browser may reuse for `max_age_seconds`
    pub fn private_cache(max_age_seconds: u32) -> CacheHeaders {
        CacheHeaders::new()
            .cache_control(CacheControl::new().private().max_age(max_age_seconds))
            .expires(Utc::now() + Duration::seconds(max_age_seconds as i64))
    }
}

/// Cache directives sent by the browser. `no-cache`, `no-store` and
/// `max-age=0` all force a fresh read from ZITADEL.
#[derive(Debug, Clone, Default)]
pub struct ClientCacheControl {
    pub no_cache: bool,
    pub no_store: bool,
    pub max_age: Option<u32>,
}

impl ClientCacheControl {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::from_header_value(headers.get(CACHE_CONTROL))
    }

    pub fn from_header_value(value: Option<&HeaderValue>) -> Self {
        let mut control = Self::default();

        if let Some(value) = value.and_then(|v| v.to_str().ok()) {
            for directive in value.split(',').map(str::trim) {
                match directive {
                    "no-cache" => control.no_cache = true,
                    "no-store" => control.no_store = true,
                    d if d.starts_with("max-age=") => {
                        if let Ok(age) = d[8..].parse::<u32>() {
                            control.max_age = Some(age);
                        }
                    }
                    _ => {}
                }
            }
        }

        control
    }

    pub fn should_use_cache(&self) -> bool {
        !self.no_cache && !self.no_store && self.max_age.unwrap_or(1) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::response::Response;

    #[test]
    fn test_client_directives() {
        let control = ClientCacheControl::from_header_value(Some(&HeaderValue::from_static(
            "no-cache, max-age=30",
        )));
        assert!(control.no_cache);
        assert_eq!(control.max_age, Some(30));
        assert!(!control.should_use_cache());

        let refresh =
            ClientCacheControl::from_header_value(Some(&HeaderValue::from_static("max-age=0")));
        assert!(!refresh.should_use_cache());

        assert!(ClientCacheControl::from_header_value(None).should_use_cache());
    }

    #[test]
    fn test_no_cache_preset() {
        let mut response = Response::new(Body::empty());
        presets::no_cache().apply(&mut response);

        let headers = response.headers();
        assert_eq!(
            headers.get(CACHE_CONTROL).unwrap(),
            "no-cache, no-store, must-revalidate"
        );
        assert_eq!(headers.get(PRAGMA).unwrap(), "no-cache");
        assert!(headers.contains_key(EXPIRES));
    }

    #[test]
    fn test_private_cache_preset() {
        let mut response = Response::new(Body::empty());
        presets::private_cache(300).apply(&mut response);

        let headers = response.headers();
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "private, max-age=300");
        assert!(!headers.contains_key(PRAGMA));
    }
}
