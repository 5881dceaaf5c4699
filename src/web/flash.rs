//! One-shot status messages carried across a redirect in a signed cookie

use axum_extra::extract::cookie::{Cookie, SignedCookieJar};

const FLASH_COOKIE: &str = "flash";

/// Queue a message for the next page view
pub fn push(jar: SignedCookieJar, message: impl AsRef<str>) -> SignedCookieJar {
    let value = urlencoding::encode(message.as_ref()).into_owned();
    jar.add(
        Cookie::build((FLASH_COOKIE, value))
            .path("/")
            .http_only(true),
    )
}

/// Read and clear the pending message, if any
pub fn take(jar: SignedCookieJar) -> (SignedCookieJar, Option<String>) {
    let message = jar.get(FLASH_COOKIE).map(|cookie| {
        urlencoding::decode(cookie.value())
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| cookie.value().to_string())
    });

    match message {
        Some(message) => (
            jar.remove(Cookie::build(FLASH_COOKIE).path("/")),
            Some(message),
        ),
        None => (jar, None),
    }
}
