//! Data each route shows once the gate has let it through.

use std::sync::Arc;

use async_trait::async_trait;
use domain::models::{
    AdminUser, EventInformation, FeatureFlag, Guest, GuestListResponse, GuestQuery,
    GuestTypeSettings, Volunteer,
};
use domain::services::Route;
use shared::pagination::PageRequest;

use crate::admin::EventAdmin;
use crate::backend::HttpBackend;
use crate::directory::GuestDirectory;
use crate::error::ConsoleError;
use crate::rsvp::RsvpPortal;
use crate::users::UserAdmin;

#[derive(Debug, Clone)]
pub enum ViewData {
    Home(EventInformation),
    Login,
    /// Scanner screen; nothing to prefetch
    CheckIn,
    ManualCheckIn(GuestListResponse),
    Participants(GuestListResponse),
    Users(Vec<AdminUser>),
    Settings {
        guests: GuestListResponse,
        capacities: GuestTypeSettings,
    },
    AdminSettings {
        flags: Vec<(FeatureFlag, bool)>,
        capacities: GuestTypeSettings,
        volunteers: Vec<Volunteer>,
    },
    Invitation {
        guest: Guest,
        event: EventInformation,
    },
    Rsvp {
        guest: Guest,
        rsvp_enabled: bool,
    },
    Confirmation,
    NotFound,
}

/// Loads the data behind a route. Only called for routes the gate rendered.
#[async_trait]
pub trait ViewSource: Send + Sync {
    async fn load(&self, route: &Route) -> Result<ViewData, ConsoleError>;
}

pub struct BackendViews {
    directory: GuestDirectory,
    users: UserAdmin,
    rsvp: RsvpPortal,
    admin: EventAdmin,
}

impl BackendViews {
    pub fn new(backend: Arc<HttpBackend>) -> Self {
        Self {
            directory: GuestDirectory::new(backend.clone()),
            users: UserAdmin::new(backend.clone()),
            rsvp: RsvpPortal::new(backend.clone()),
            admin: EventAdmin::new(backend),
        }
    }
}

#[async_trait]
impl ViewSource for BackendViews {
    async fn load(&self, route: &Route) -> Result<ViewData, ConsoleError> {
        let first_page = PageRequest::default();
        let data = match route {
            Route::Home => ViewData::Home(self.rsvp.event_information().await?),
            Route::Login => ViewData::Login,
            Route::CheckIn => ViewData::CheckIn,
            Route::ManualCheckIn => {
                ViewData::ManualCheckIn(self.directory.participants(&first_page, None).await?)
            }
            Route::Participants => {
                ViewData::Participants(self.directory.participants(&first_page, None).await?)
            }
            Route::Users => ViewData::Users(self.users.list().await?),
            Route::Settings => ViewData::Settings {
                guests: self
                    .directory
                    .list(&first_page, &GuestQuery::default())
                    .await?,
                capacities: self.admin.guest_type_settings().await?,
            },
            Route::AdminSettings => {
                let mut flags = Vec::with_capacity(FeatureFlag::ALL.len());
                for flag in FeatureFlag::ALL {
                    flags.push((flag, self.admin.flag(flag).await?));
                }
                ViewData::AdminSettings {
                    flags,
                    capacities: self.admin.guest_type_settings().await?,
                    volunteers: self.admin.volunteers().await?,
                }
            }
            Route::Invitation(qr_id) => ViewData::Invitation {
                guest: self.rsvp.guest(qr_id).await?,
                event: self.rsvp.event_information().await?,
            },
            Route::Rsvp(qr_id) => ViewData::Rsvp {
                guest: self.rsvp.guest(qr_id).await?,
                rsvp_enabled: self.rsvp.rsvp_enabled().await?,
            },
            Route::Confirmation => ViewData::Confirmation,
            Route::NotFound => ViewData::NotFound,
        };
        Ok(data)
    }
}
