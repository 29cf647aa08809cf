// Pure core: series model, classification, derived series and assembly
pub mod chart;
pub mod custom_graph;
pub mod derived;
pub mod locale;
pub mod naming;
pub mod timeseries;
pub mod visibility;
