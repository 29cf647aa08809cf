// Epidemiology dashboard: source adapters, derived series and the HTTP API over them
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
