use parking_lot::RwLock;
use url::Url;

use crate::cookies::store::{keys_to_urls, store_key, CookieSet, CookieStore};
use crate::cookies::Cookie;
use crate::errors::{ErrorKind, NetError, Result};

/// Cookie store kept in memory only.
#[derive(Debug, Default)]
pub struct InMemoryCookieStore {
    cookies: RwLock<CookieSet>,
}

impl InMemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieStore for InMemoryCookieStore {
    fn add(&self, url: &Url, cookie: Cookie) -> Result<()> {
        let key = store_key(url)?;
        self.cookies.write().add(key, cookie);
        Ok(())
    }

    fn add_all(&self, url: &Url, cookies: Vec<Cookie>) -> Result<()> {
        let key = store_key(url)?;
        let mut set = self.cookies.write();
        for cookie in cookies {
            set.add(key.clone(), cookie);
        }
        Ok(())
    }

    fn get(&self, url: &Url) -> Result<Vec<Cookie>> {
        let key = store_key(url)?;
        let host = url
            .host_str()
            .ok_or_else(|| NetError::new(ErrorKind::MalformedUrl))?;
        Ok(self.cookies.read().get(&key, host))
    }

    fn cookies(&self) -> Result<Vec<Cookie>> {
        Ok(self.cookies.read().cookies())
    }

    fn urls(&self) -> Result<Vec<Url>> {
        Ok(keys_to_urls(self.cookies.read().keys()))
    }

    fn remove(&self, url: &Url, cookie: &Cookie) -> Result<bool> {
        let key = store_key(url)?;
        Ok(self.cookies.write().remove(&key, cookie))
    }

    fn remove_all(&self) -> Result<bool> {
        Ok(self.cookies.write().clear())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn cookie(name: &str, value: &str, domain: &str, path: &str) -> Cookie {
        let mut c = Cookie::new(name, value);
        c.domain = Some(domain.to_string());
        c.path = Some(path.to_string());
        c
    }

    #[test]
    fn remove_all_reports_whether_anything_changed() {
        let store = InMemoryCookieStore::new();
        store.add(&url("http://code.google.com/"), Cookie::new("a", "android")).unwrap();
        assert!(store.remove_all().unwrap());
        assert!(store.urls().unwrap().is_empty());
        assert!(store.cookies().unwrap().is_empty());
        assert!(!store.remove_all().unwrap());
    }

    #[test]
    fn add_accepts_conflicting_url() {
        let store = InMemoryCookieStore::new();
        let a = cookie("a", "android", ".android.com", "/source/");
        store.add(&url("http://google.com/source/"), a.clone()).unwrap();
        assert_eq!(store.cookies().unwrap(), vec![a]);
    }

    #[test]
    fn remove_requires_matching_url() {
        let store = InMemoryCookieStore::new();
        let a = Cookie::new("a", "android");
        store.add(&url("http://android.com/source/"), a.clone()).unwrap();
        assert!(!store.remove(&url("http://code.google.com/"), &a).unwrap());
        assert_eq!(store.cookies().unwrap(), vec![a.clone()]);
        assert!(store.remove(&url("https://android.com/other"), &a).unwrap());
        assert!(store.cookies().unwrap().is_empty());
    }

    #[test]
    fn urls_are_normalized() {
        let store = InMemoryCookieStore::new();
        store.add(&url("https://a.com:443/a/foo?q=1#f"), Cookie::new("a", "1")).unwrap();
        store.add(&url("http://b.com/"), Cookie::new("b", "1")).unwrap();
        assert_eq!(store.urls().unwrap(), vec![url("http://a.com"), url("http://b.com")]);
    }

    #[test]
    fn get_matches_host_but_ignores_scheme_port_and_path() {
        let store = InMemoryCookieStore::new();
        let c1 = cookie("a1", "android", "a.com", "/path1");
        let c2 = cookie("a2", "android", "a.com", "/path2");
        let mut c3 = cookie("a3", "android", "a.com", "/path3");
        c3.secure = true;
        let b1 = cookie("b1", "android", "b.com", "/path5");

        store.add(&url("http://a.com:443/path1"), c1.clone()).unwrap();
        store.add(&url("http://a.com:8080/path2"), c2.clone()).unwrap();
        store.add(&url("https://a.com:443/path3"), c3.clone()).unwrap();
        store.add(&url("https://b.com:8080/path5"), b1).unwrap();

        let expected = vec![c1, c2, c3];
        assert_eq!(store.get(&url("http://a.com:443/anypath")).unwrap(), expected);
        assert_eq!(store.get(&url("http://a.com:8080/anypath")).unwrap(), expected);
        assert_eq!(store.get(&url("https://a.com/anypath")).unwrap(), expected);
    }

    #[test]
    fn host_only_cookies_stay_on_their_host() {
        let store = InMemoryCookieStore::new();
        store.add(&url("http://a.com/"), Cookie::new("theme", "light")).unwrap();
        assert_eq!(store.get(&url("http://a.com/x")).unwrap().len(), 1);
        assert!(store.get(&url("http://sub.a.com/x")).unwrap().is_empty());
    }

    #[test]
    fn same_identity_replaces_and_moves_to_end() {
        let store = InMemoryCookieStore::new();
        let u = url("http://a.com/");
        store.add(&u, cookie("theme", "light", "a.com", "/")).unwrap();
        store.add(&u, cookie("sid", "mysid", "a.com", "/")).unwrap();
        store.add(&u, cookie("theme", "dark", "a.com", "/")).unwrap();

        let pairs: Vec<String> = store.get(&u).unwrap().iter().map(Cookie::pair).collect();
        assert_eq!(pairs, vec!["sid=mysid", "theme=dark"]);

        store.add(&u, cookie("sid", "mynewsid", "A.cOm", "/")).unwrap();
        let pairs: Vec<String> = store.get(&u).unwrap().iter().map(Cookie::pair).collect();
        assert_eq!(pairs, vec!["theme=dark", "sid=mynewsid"]);
    }

    #[test]
    fn expired_cookies_are_not_returned() {
        let store = InMemoryCookieStore::new();
        let mut gone = cookie("old", "1", "a.com", "/");
        gone.expires_at = Some(0);
        store.add(&url("http://a.com/"), gone).unwrap();
        assert!(store.get(&url("http://a.com/")).unwrap().is_empty());
        assert!(store.cookies().unwrap().is_empty());
    }
}
