pub mod cache_file;
