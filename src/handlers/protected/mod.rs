pub mod areas;
pub mod attachments;
pub mod auth;
pub mod comments;
pub mod containers;
pub mod impediments;
pub mod notifications;
pub mod projects;
pub mod risks;
pub mod stages;
pub mod tasks;
pub mod teams;
pub mod workflows;
