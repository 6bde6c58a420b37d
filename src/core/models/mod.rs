pub mod arn;
pub mod deployment_unit;
pub mod diff_result;
pub mod environment;
pub mod manifest;
pub mod resource_graph;
pub mod routing;
pub mod template;
