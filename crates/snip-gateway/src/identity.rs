use axum_extra::extract::cookie::{Cookie, CookieJar};
use uuid::Uuid;

const USER_COOKIE: &str = "snip_user";

/// Reads the caller's opaque identity from the cookie jar, minting a new
/// one when absent. The returned jar carries any newly issued cookie and
/// must be included in the response.
///
/// Identity is an external concern: the value is treated as an opaque
/// owner id string and nothing here verifies it.
pub fn identify(jar: CookieJar) -> (CookieJar, String) {
    if let Some(cookie) = jar.get(USER_COOKIE) {
        let id = cookie.value().to_owned();
        if !id.is_empty() {
            return (jar, id);
        }
    }

    let id = Uuid::new_v4().to_string();
    let mut cookie = Cookie::new(USER_COOKIE, id.clone());
    cookie.set_path("/");
    (jar.add(cookie), id)
}
