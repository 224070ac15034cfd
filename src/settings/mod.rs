// Settings: session configuration and the remembered effect choice.

pub mod store;
pub mod types;
