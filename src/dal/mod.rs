pub mod search_cache_db;
