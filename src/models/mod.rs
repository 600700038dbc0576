pub mod activity_log;
pub mod admin;
pub mod building;
pub mod contract;
pub mod invoice;
pub mod maintenance_request;
pub mod refresh_token;
pub mod room;
pub mod student;
pub mod user;
