//! Domain services for the event console.
//!
//! Services are pure rules over domain models; anything that talks to the
//! backend lives in the console crate.

pub mod capability;
pub mod capacity;
pub mod headers;
pub mod messages;

pub use capability::{accessible_menu, may_render, Access, Route};
pub use capacity::{can_add_plus_one, inviter_label, shows_plus_one_form};
pub use headers::{classify_header, highlighted_headers, HeaderMapping};
pub use messages::{is_message_for, translate, translate_error, Locale};
