// Adapters layer: concrete implementations for external systems (http backend, files, terminal).

pub mod form_file;
pub mod http;
pub mod terminal;
