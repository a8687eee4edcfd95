//! HTTP client for the program API.

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::models::{
    families_from_value, ConnectionStatus, ContactLookup, Family, FamilyRegistered,
    FamilyRegistration, FamilyUpdate, FileUploadResponse, LoginResponse, PhotoUploadResponse,
    RegisterResponse, Role, SimpleResponse, TotalImages, Totals, User,
};
use crate::search::{CancelToken, SearchBackend};
use crate::session::{clear_session, load_session, save_session, Session};
use crate::store::KvStore;
use crate::upload::{
    generic_file_form, plant_photo_form, FileKind, PlantPhotoMeta, UploadFile,
};

pub struct ApiClient {
    config: ClientConfig,
    http: Client,
    session: RwLock<Option<Session>>,
    store: Option<KvStore>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(format!("hgm/{}", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            config,
            http,
            session: RwLock::new(None),
            store: None,
        })
    }

    /// Mirror the session into `store` on login/logout.
    pub fn with_store(mut self, store: KvStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Load a previously persisted session into memory.
    pub fn restore_session(&self) -> Result<Option<Session>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let session = load_session(store)?;
        self.set_session(session.clone());
        Ok(session)
    }

    pub fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn token(&self) -> Option<String> {
        self.session().map(|s| s.token)
    }

    /// Replace the in-memory session without touching storage.
    pub fn set_session(&self, session: Option<Session>) {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = session;
    }

    fn establish_session(&self, session: Session) -> Result<()> {
        if let Some(store) = &self.store {
            save_session(store, &session)?;
        }
        self.set_session(Some(session));
        Ok(())
    }

    fn drop_session(&self) -> Result<()> {
        self.set_session(None);
        if let Some(store) = &self.store {
            clear_session(store)?;
        }
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        log::debug!("{method} {url}");
        let builder = self.http.request(method, url);
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn execute(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send()?;
        let status = response.status();
        log::debug!("{status} {}", response.url());
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        log::debug!("Error body: {body}");
        Err(ApiError::from_body(status, &body))
    }

    fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let body = self.execute(builder)?.text()?;
        serde_json::from_str(&body).map_err(|e| {
            ApiError::UnexpectedShape(format!("{e} in response body: {}", truncate(&body, 200)))
        })
    }

    /// Pre-flight check: POST an empty login. Anything but 404 counts as
    /// reachable, whatever the auth outcome. Never fails.
    pub fn test_connection(&self) -> ConnectionStatus {
        log::debug!("Testing connection to {}", self.config.base_url);
        let result = self
            .http
            .post(self.url("/login"))
            .timeout(self.config.probe_timeout)
            .json(&json!({ "username": "", "password": "" }))
            .send();

        match result {
            Ok(response) => {
                let status = response.status();
                ConnectionStatus {
                    success: status != StatusCode::NOT_FOUND,
                    message: format!("Status: {}", status.as_u16()),
                }
            }
            Err(e) if e.is_timeout() => ConnectionStatus {
                success: false,
                message: "Connection timeout".to_string(),
            },
            Err(e) => ConnectionStatus {
                success: false,
                message: e.to_string(),
            },
        }
    }

    /// On success with a token, the token becomes the session in memory and
    /// in storage. The raw response is returned either way.
    pub fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let response: LoginResponse = self.fetch(
            self.request(Method::POST, "/login")
                .json(&json!({ "username": username, "password": password })),
        )?;

        if response.success {
            if let Some(token) = response.token.as_deref().filter(|t| !t.is_empty()) {
                let mut user = response.user.clone();
                // keep the top-level role with the session when the user lacks one
                if let (Some(user), Some(role)) = (user.as_mut(), response.role.as_ref()) {
                    user.role.get_or_insert_with(|| role.clone());
                }
                self.establish_session(Session::new(token, user))?;
            }
        }
        Ok(response)
    }

    /// Invalidate the server session. The local session is cleared even if
    /// the server call fails.
    pub fn logout(&self) -> Result<SimpleResponse> {
        let result = self.fetch(self.request(Method::POST, "/logout"));
        self.drop_session()?;
        result
    }

    /// Create an account.
    pub fn register(&self, payload: &Value) -> Result<RegisterResponse> {
        self.fetch(self.request(Method::POST, "/register").json(payload))
    }

    pub fn get_details(&self) -> Result<Value> {
        self.fetch(self.request(Method::GET, "/details"))
    }

    /// Household lookup by child name or mobile number. Any failure,
    /// cancellation included, yields an empty list.
    pub fn search_households(&self, query: &str) -> Vec<Family> {
        match self.try_search_households(query, &CancelToken::never()) {
            Ok(families) => families,
            Err(e) => {
                if !e.is_cancelled() {
                    log::warn!("Search for {query:?} failed: {e}");
                }
                Vec::new()
            }
        }
    }

    pub fn try_search_households(&self, query: &str, cancel: &CancelToken) -> Result<Vec<Family>> {
        cancel.check()?;
        let path = format!("/search?query={}", urlencoding::encode(query));
        let value: Value = self.fetch(self.request(Method::GET, &path))?;
        cancel.check()?;
        Ok(families_from_value(value))
    }

    /// Household lookup on the `/families/search` path, optionally limited
    /// to one center.
    pub fn search_families(&self, query: &str, center_code: Option<&str>) -> Result<Vec<Family>> {
        let mut path = format!("/families/search?q={}", urlencoding::encode(query));
        if let Some(code) = center_code {
            path.push_str(&format!("&centerCode={}", urlencoding::encode(code)));
        }
        let value: Value = self.fetch(self.request(Method::GET, &path))?;
        Ok(families_from_value(value))
    }

    pub fn get_families(&self, center_code: Option<&str>) -> Result<Vec<Family>> {
        let path = match center_code {
            Some(code) => format!("/families?centerCode={}", urlencoding::encode(code)),
            None => "/families".to_string(),
        };
        let value: Value = self.fetch(self.request(Method::GET, &path))?;
        Ok(families_from_value(value))
    }

    pub fn register_family(&self, form: &FamilyRegistration) -> Result<FamilyRegistered> {
        form.validate()?;
        self.fetch(self.request(Method::POST, "/families/register").json(form))
    }

    pub fn get_family_details(&self, family_id: &str) -> Result<Family> {
        let path = format!("/families/{}", urlencoding::encode(family_id));
        self.fetch(self.request(Method::GET, &path))
    }

    pub fn get_family_by_user_id(&self, user_id: &str) -> Result<Family> {
        let path = format!("/families/user/{}", urlencoding::encode(user_id));
        self.fetch(self.request(Method::GET, &path))
    }

    pub fn update_family(&self, family_id: &str, update: &FamilyUpdate) -> Result<SimpleResponse> {
        if update.is_empty() {
            return Err(ApiError::InvalidInput("Nothing to update".into()));
        }
        let path = format!("/families/{}", urlencoding::encode(family_id));
        self.fetch(self.request(Method::PUT, &path).json(update))
    }

    pub fn upload_plant_photo(
        &self,
        image_uri: &str,
        meta: PlantPhotoMeta<'_>,
    ) -> Result<PhotoUploadResponse> {
        let photo = UploadFile::plant_photo(image_uri, meta.username, now_millis())?;
        log::debug!("Uploading {} as {}", photo.path.display(), photo.file_name);
        let form = plant_photo_form(meta, photo)?;
        self.fetch(
            self.request(Method::POST, "/upload_plant_photo")
                .multipart(form),
        )
    }

    pub fn upload_file(
        &self,
        file_uri: &str,
        kind: FileKind,
        extra: &BTreeMap<String, String>,
    ) -> Result<FileUploadResponse> {
        let file = UploadFile::generic(file_uri, kind, now_millis())?;
        let form = generic_file_form(file, kind, extra)?;
        self.fetch(self.request(Method::POST, "/upload/file").multipart(form))
    }

    pub fn get_total_images(&self) -> Result<TotalImages> {
        self.fetch(self.request(Method::GET, "/photos/total"))
    }

    /// Total registered households and uploaded photos.
    pub fn fetch_totals(&self) -> Result<Totals> {
        self.fetch(self.request(Method::GET, "/search2"))
    }

    /// Find an account by contact number in the external roster. Never fails;
    /// problems are reported in the returned message.
    pub fn lookup_contact(&self, contact: &str) -> ContactLookup {
        let failed = |message: String| ContactLookup {
            success: false,
            message,
            user: None,
        };

        let value: Value = match self.fetch(self.request(Method::GET, "/data1")) {
            Ok(value) => value,
            Err(e) => return failed(format!("Error fetching data: {e}")),
        };
        let Value::Array(rows) = value else {
            return failed("Invalid data format received from server".to_string());
        };

        let row = rows.into_iter().find_map(|row| match row {
            Value::Object(map) if roster_contact(&map).as_deref() == Some(contact) => Some(map),
            _ => None,
        });

        match row {
            Some(map) => ContactLookup {
                success: true,
                message: "User found in external table".to_string(),
                user: Some(user_from_roster_row(map)),
            },
            None => failed("User not found in external table".to_string()),
        }
    }
}

impl SearchBackend for ApiClient {
    fn search(&self, query: &str, cancel: &CancelToken) -> Result<Vec<Family>> {
        self.try_search_households(query, cancel)
    }
}

fn roster_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn roster_contact(map: &Map<String, Value>) -> Option<String> {
    roster_field(map, &["contact_number", "mobile_number", "phone"])
}

/// Map a roster row onto a `User`. Without an explicit role, worker fields
/// mean a center worker and anything else a household member.
fn user_from_roster_row(map: Map<String, Value>) -> User {
    let has_any = |keys: &[&str]| keys.iter().any(|k| roster_field(&map, &[k]).is_some());

    let role = match roster_field(&map, &["role"]) {
        Some(role) => Role::from(role.as_str()),
        None if has_any(&["worker_name", "anganwadi_worker_name", "worker_id", "anganwadi_id"]) => {
            Role::Anganwadi
        }
        None => Role::Family,
    };

    let id = roster_field(&map, &["id", "user_id"]);
    let username = roster_contact(&map);
    let name = roster_field(&map, &["name", "full_name", "child_name", "worker_name"]);
    let center_code = roster_field(&map, &["center_code", "anganwadi_code", "kendra_code"]);
    let center_name = roster_field(
        &map,
        &["center_name", "anganwadi_center_name", "kendra_name"],
    );

    let mut user = User::from(map);
    user.id = id.or(user.id);
    user.username = username;
    user.role = Some(role);
    user.name = name.or(user.name);
    user.center_code = center_code.or(user.center_code);
    user.center_name = center_name.or(user.center_name);
    user
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_roster_worker_row_maps_to_anganwadi() {
        let user = user_from_roster_row(row(json!({
            "user_id": 7,
            "contact_number": "9876543210",
            "worker_name": "Sunita Devi",
            "kendra_code": "AWC-123",
            "kendra_name": "Saraswati"
        })));
        assert_eq!(user.role, Some(Role::Anganwadi));
        assert_eq!(user.id.as_deref(), Some("7"));
        assert_eq!(user.username.as_deref(), Some("9876543210"));
        assert_eq!(user.name.as_deref(), Some("Sunita Devi"));
        assert_eq!(user.center_code.as_deref(), Some("AWC-123"));
        assert_eq!(user.center_name.as_deref(), Some("Saraswati"));
    }

    #[test]
    fn test_roster_child_row_maps_to_family() {
        let user = user_from_roster_row(row(json!({
            "phone": 9123456780u64,
            "child_name": "Aarav",
            "mother_name": "Sunita"
        })));
        assert_eq!(user.role, Some(Role::Family));
        assert_eq!(user.username.as_deref(), Some("9123456780"));
        assert_eq!(user.name.as_deref(), Some("Aarav"));
        assert_eq!(user.mother_name.as_deref(), Some("Sunita"));
    }

    #[test]
    fn test_roster_explicit_role_wins() {
        let user = user_from_roster_row(row(json!({
            "mobile_number": "1",
            "role": "admin",
            "worker_name": "x"
        })));
        assert_eq!(user.role, Some(Role::Admin));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
