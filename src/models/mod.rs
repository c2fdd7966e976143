pub mod document_name;
pub mod loaders;
pub mod syllabus;
pub mod topic;

pub use document_name::DocumentName;
pub use loaders::document_loader::{load_inventory, DocumentEntry, DocumentInventory};
pub use syllabus::{Module, SyllabusDocument};
pub use topic::{MatchedTopic, TopicStat, TopicStatKey};
