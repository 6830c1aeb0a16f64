//! Plus-one capacity rules.

use crate::models::guest::Guest;
use crate::models::settings::GuestTypeSettings;

/// Whether another plus-one fits under the inviter's type capacity.
pub fn can_add_plus_one(inviter: &Guest, current: usize, settings: &GuestTypeSettings) -> bool {
    current < settings.capacity(inviter.guest_type) as usize
}

/// Whether the public RSVP page offers the plus-one form.
pub fn shows_plus_one_form(guest: &Guest, rsvp_enabled: bool) -> bool {
    guest.will_attend == Some(true)
        && rsvp_enabled
        && guest.guest_type.is_inviter()
        && guest.guests.len() < guest.max_guests.unwrap_or(0) as usize
}

/// Inviter picker label: `"First Last (used/max)"`.
pub fn inviter_label(inviter: &Guest, settings: &GuestTypeSettings) -> String {
    format!(
        "{} {} ({}/{})",
        inviter.first_name,
        inviter.last_name,
        inviter.guests.len(),
        settings.capacity(inviter.guest_type)
    )
}
