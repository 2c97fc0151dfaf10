pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    build_crawl_job, config_paths, emit_report, init_config, open_database, parse_format,
    render_report, resolve_db_path,
};
