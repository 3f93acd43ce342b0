pub mod file_fetcher_reqwest;
