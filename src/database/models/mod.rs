pub mod area;
pub mod attachment;
pub mod comment;
pub mod impediment;
pub mod notification;
pub mod principal;
pub mod project;
pub mod risk;
pub mod stage;
pub mod task;
pub mod team;

pub use area::Area;
pub use attachment::Attachment;
pub use comment::Comment;
pub use impediment::Impediment;
pub use notification::Notification;
pub use principal::Principal;
pub use project::{Project, Workflow};
pub use risk::Risk;
pub use stage::Stage;
pub use task::Task;
pub use team::{Team, TeamMember};
