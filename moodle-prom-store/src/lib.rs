pub mod memory;
pub mod rows;
pub mod source;
pub mod sql;

pub use memory::{MemorySource, QueryLog};
pub use rows::{CourseRow, EnrolmentRow, LogRow, ModuleRow, TaskRow, UserAuthRow};
pub use source::MoodleSource;
pub use sql::{Dialect, SqlSource};
