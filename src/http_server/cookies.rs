//! Cookie parser stage.

use std::collections::HashMap;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;

/// Request cookies, name to value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookies(HashMap<String, String>);

impl Cookies {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<&CookieJar> for Cookies {
    fn from(jar: &CookieJar) -> Self {
        Self(
            jar.iter()
                .map(|c| (c.name().to_string(), c.value().to_string()))
                .collect(),
        )
    }
}

pub async fn parse_cookies(mut request: Request, next: Next) -> Response {
    let cookies = Cookies::from(&CookieJar::from_headers(request.headers()));
    request.extensions_mut().insert(cookies);
    next.run(request).await
}
