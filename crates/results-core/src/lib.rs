pub mod config;
pub mod key;
pub mod models;
pub mod ordering;

pub use config::{LoggingConfig, ResourceConfig, ViewerConfig};
pub use key::{base_name, parse_key, KeyCodec, KeyError};
pub use models::{
    CheckRequest, CheckResponse, InParams, InRequest, InResponse, OutParams, OutRequest,
    OutResponse, Source, Summary, Version, TEST_SUITE_COUNT,
};
pub use ordering::{decode_all, sort_ascending, sort_descending, VersionedKey};
