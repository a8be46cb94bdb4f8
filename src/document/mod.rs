pub mod conversion;
pub mod editor;
pub mod snapshot;

pub use conversion::*;
pub use editor::*;
pub use snapshot::*;
