// Dev-server channel protocol: event envelope and save-story payloads.

pub mod channel;
pub mod story;
