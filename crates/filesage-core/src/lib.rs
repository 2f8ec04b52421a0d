pub mod config;
pub mod logging;

pub mod bench;
pub mod cancel;
pub mod compare;
pub mod digest;
pub mod error;
pub mod handle;
pub mod reader;

pub use compare::{compare, CompareOptions, Strategy, Verdict};
pub use error::{ReadError, ReadErrorKind};
pub use handle::FileHandle;
