pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod notifications;
pub mod roles;
pub mod search;
pub mod session;
pub mod store;
pub mod tui;
pub mod upload;

pub use client::ApiClient;
pub use config::{default_home_dir, ClientConfig, Config, DEFAULT_API_URL};
pub use error::{ApiError, Result};
pub use models::{
    ConnectionStatus, ContactLookup, Family, FamilyRegistered, FamilyRegistration, FamilyUpdate,
    Gender, LoginResponse, Role, SimpleResponse, TotalImages, Totals, User,
};
pub use notifications::{Notification, NotificationKind, NotificationLog};
pub use roles::{login_flow, resolve_destination, Destination, FamilyProfile, LoginOutcome, RoutingPolicy};
pub use search::{CancelToken, SearchBackend, SearchCoordinator, SearchNotice, SearchState};
pub use session::Session;
pub use store::KvStore;
pub use upload::{FileKind, PlantPhotoMeta};

impl Config {
    pub fn routing_policy(&self) -> RoutingPolicy {
        RoutingPolicy {
            legacy_username_inference: self.legacy_role_inference,
        }
    }
}
