pub mod admin;
pub mod backend;
pub mod checkin;
pub mod cli;
pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod feedback;
pub mod import;
pub mod jobs;
pub mod logging;
pub mod navigation;
pub mod rsvp;
pub mod scanner;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod users;
pub mod views;
