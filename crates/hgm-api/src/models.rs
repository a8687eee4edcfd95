//! Records mirrored from the remote API.
//!
//! The server is loose about types (ids and mobile numbers arrive as strings
//! or numbers, booleans as `0/1`), so the decoders here are lenient.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ApiError, Result};

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(opt_string_or_number(d)?.unwrap_or_default())
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<String>, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Counts arrive as numbers, numeric strings or null. Anything unreadable
/// is treated as unknown.
fn opt_u64_or_string<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<u64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn flexible_bool<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<bool, D::Error> {
    Ok(value_as_bool(&Value::deserialize(d)?))
}

fn value_as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "y"
        ),
        _ => false,
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Remove every key in `keys` from `map` and return the first usable value,
/// in key order.
fn take_first(map: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    let mut found = None;
    for key in keys {
        if let Some(value) = map.remove(*key) {
            if found.is_none() {
                found = value_as_string(&value);
            }
        }
    }
    found
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Anganwadi,
    Family,
    Admin,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Anganwadi => "anganwadi",
            Role::Family => "family",
            Role::Admin => "admin",
            Role::Other(s) => s,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            // older accounts carry the alternate spelling
            "anganwadi" | "aanganwadi" => Role::Anganwadi,
            "family" => Role::Family,
            "admin" => Role::Admin,
            _ => Role::Other(s.trim().to_string()),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(Role::from(s.as_str()))
    }
}

/// An account as returned by `/login` or `/data1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Map<String, Value>")]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardian_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub father_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mother_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    /// Role-specific fields the client does not model.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl From<Map<String, Value>> for User {
    fn from(mut map: Map<String, Value>) -> Self {
        let role = map
            .remove("role")
            .as_ref()
            .and_then(value_as_string)
            .map(|r| Role::from(r.as_str()));

        Self {
            id: take_first(&mut map, &["id", "user_id"]),
            username: take_first(&mut map, &["username"]),
            role,
            name: take_first(&mut map, &["name"]),
            guardian_name: take_first(&mut map, &["guardianName", "guardian_name"]),
            father_name: take_first(&mut map, &["fatherName", "father_name"]),
            mother_name: take_first(&mut map, &["motherName", "mother_name"]),
            age: take_first(&mut map, &["age"]),
            center_code: take_first(
                &mut map,
                &[
                    "centerCode",
                    "aanganwadi_code",
                    "center_code",
                    "anganwadi_center_code",
                ],
            ),
            center_name: take_first(&mut map, &["centerName", "center_name"]),
            district: take_first(&mut map, &["district"]),
            block: take_first(&mut map, &["block"]),
            extra: map.into_iter().collect(),
        }
    }
}

/// Raw `/login` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default, deserialize_with = "flexible_bool")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Some deployments put the role beside `user` instead of inside it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A registered household as returned by search and detail endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub child_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub parent_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub mobile_number: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub village: String,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub plant_distributed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_u64_or_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_images_yet: Option<u64>,
    #[serde(default, rename = "plant_photo", skip_serializing_if = "Option::is_none")]
    pub plant_photo: Option<String>,
    #[serde(default, rename = "pledge_photo", skip_serializing_if = "Option::is_none")]
    pub pledge_photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mother_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub father_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anganwadi_code: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub weight: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub height: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panchayat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
}

/// Decode a list endpoint. Anything that is not a JSON array yields an empty
/// list; elements that fail to decode are skipped.
pub fn families_from_value(value: Value) -> Vec<Family> {
    let Value::Array(items) = value else {
        log::warn!("Expected a list of families, got: {value}");
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Family>(item) {
            Ok(family) => Some(family),
            Err(e) => {
                log::warn!("Skipping malformed family record: {e}");
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "लड़का")]
    Boy,
    #[serde(rename = "लड़की")]
    Girl,
}

/// The household registration form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyRegistration {
    pub child_name: String,
    pub gender: Option<Gender>,
    pub date_of_birth: String,
    pub age: String,
    pub weight: String,
    pub height: String,

    pub mother_name: String,
    pub father_name: String,
    pub mobile_number: String,
    pub village: String,
    pub ward: String,
    pub panchayat: String,
    pub district: String,

    pub distribution_date: String,

    pub anganwadi_center_name: String,
    pub anganwadi_code: String,
    pub worker_name: String,
    pub worker_code: String,
    pub block: String,
    pub registration_date: String,

    pub plant_photo: Option<String>,
    pub pledge_photo: Option<String>,
}

impl FamilyRegistration {
    pub fn validate(&self) -> Result<()> {
        if self.child_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("Child name is required".into()));
        }
        if self.mother_name.trim().is_empty() && self.father_name.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "Mother or father name is required".into(),
            ));
        }
        if self.village.trim().is_empty() {
            return Err(ApiError::InvalidInput("Village is required".into()));
        }
        let mobile = self.mobile_number.trim();
        if mobile.len() != 10 || !mobile.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ApiError::InvalidInput(format!(
                "Mobile number must be 10 digits, got '{mobile}'"
            )));
        }
        Ok(())
    }

    /// The name shown as "parent" in search results.
    pub fn parent_name(&self) -> &str {
        if self.mother_name.trim().is_empty() {
            self.father_name.trim()
        } else {
            self.mother_name.trim()
        }
    }
}

/// Partial household update; only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub village: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plant_distributed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl FamilyUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleResponse {
    #[serde(default, deserialize_with = "flexible_bool")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[serde(default, deserialize_with = "flexible_bool")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyRegistered {
    #[serde(default, deserialize_with = "flexible_bool")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub family_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUploadResponse {
    #[serde(default, deserialize_with = "flexible_bool")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub photo_id: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadResponse {
    #[serde(default, deserialize_with = "flexible_bool")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub file_url: Option<String>,
}

/// Aggregate counts from `/search2`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    #[serde(default, deserialize_with = "opt_u64_or_string")]
    pub total_students: Option<u64>,
    #[serde(default, deserialize_with = "opt_u64_or_string")]
    pub total_images_uploaded: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalImages {
    #[serde(rename = "totalImages", default)]
    pub total_images: u64,
}

/// Outcome of the connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
}

/// Result of looking a contact number up in the external roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContactLookup {
    pub success: bool,
    pub message: String,
    pub user: Option<User>,
}
