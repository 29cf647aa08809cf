// Application layer - Use cases over the source repository
pub mod chart_service;
pub mod custom_graph_service;
pub mod source_repository;
