pub mod configured_url_builder;
