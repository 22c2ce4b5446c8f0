pub mod auth;
pub mod change_requests;
pub mod installments;
pub mod invites;
pub mod profiles;
pub mod projects;
