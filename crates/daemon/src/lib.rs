// storysave-daemon library entry point (embeddable in a dev-server host).

pub mod channel;
pub mod config;
pub mod runtime;
pub mod save;
pub mod startup;
pub mod store;
