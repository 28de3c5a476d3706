pub mod credential;
pub mod job;
pub mod resource;
pub mod search;
pub mod verification;
