pub mod primitive;
pub mod group;
pub mod entry;
pub mod order;
pub mod categories;
pub mod view;
pub mod scan;
pub mod sortfile;
pub mod arrange;
pub mod workshop;

pub use group::{GroupKind, Groups};
pub use entry::{Entry, EntryError};
pub use order::{OrderFile, OrderError, CountMismatch};
pub use categories::{CategoriesFile, Category, CategoryError};
pub use view::{zip, unzip, LabelOrder, LabelWarning, NestedView, Session};
pub use scan::{reconcile_new_entries, ScanReport};
pub use workshop::{Workshop, WorkshopError, WorkshopOptions};
