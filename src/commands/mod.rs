pub mod auth;
pub mod clean;
pub mod completions;
pub mod configure;
pub mod status;

pub use auth::AuthCommand;
pub use clean::CleanCommand;
pub use completions::CompletionsCommand;
pub use configure::ConfigureCommand;
pub use status::StatusCommand;
