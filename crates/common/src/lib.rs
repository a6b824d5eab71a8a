// storysave-common: story file engine and wire types shared by the storysave workspace

pub mod csf;
pub mod path;
pub mod protocol;
