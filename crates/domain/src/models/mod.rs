//! Domain models for the event console.

pub mod checkin;
pub mod event;
pub mod guest;
pub mod import;
pub mod mail;
pub mod role;
pub mod settings;
pub mod user;

pub use checkin::{CheckInReply, CheckInRequest};
pub use event::EventInformation;
pub use guest::{
    Guest, GuestForm, GuestListResponse, GuestQuery, GuestType, InvitersResponse, PlusOneForm,
    PlusOnesResponse,
};
pub use import::{
    value_text, FieldKind, ImportReport, ImportRowResult, RetryReport, RetryRequest, RetryRow, RowRef,
};
pub use mail::{
    BulkMailRequest, GuestMailRequest, MailCustomData, MailFilters, MailMessage, MailResponse,
    MailTemplate,
};
pub use role::Role;
pub use settings::{
    FeatureFlag, GuestTypeSettings, GuestTypeSettingsEnvelope, Volunteer, VolunteerSettings,
};
pub use user::{AdminUser, UserForm, UserListResponse};
