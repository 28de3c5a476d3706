pub mod api_client;
pub mod credentials;
pub mod drive;
pub mod encryption;
pub mod google_auth;
pub mod jobs;
pub mod orchestrator;
pub mod poller;
pub mod resources;
pub mod search;
pub mod sheet_parser;
pub mod worker;
