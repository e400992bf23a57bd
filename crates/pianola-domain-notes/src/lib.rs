pub mod model;
pub mod naming;
pub mod note_list_import;

pub use model::*;
pub use naming::*;
pub use note_list_import::*;
