use serde_json::{Value, json};

use crate::core::models::routing::RoutingPolicy;

/// What a listener rule matches on.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleCondition {
    HostHeader(Vec<String>),
    PathPattern(Vec<String>),
}

/// What a listener rule does with a matching request.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleAction {
    /// Forward to the target group of a backend port group.
    Forward { port: u16 },
    /// Answer with an HTTP 302 pointing at `path` (load balancer
    /// placeholders such as `#{path}` allowed).
    Redirect { path: String },
}

/// A listener rule, independent of how target groups are named.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerRuleSpec {
    pub logical_id: String,
    pub priority: u32,
    pub condition: RuleCondition,
    pub action: RuleAction,
}

impl ListenerRuleSpec {
    pub fn conditions_json(&self) -> Value {
        match &self.condition {
            RuleCondition::HostHeader(values) => json!([{
                "Field": "host-header",
                "HostHeaderConfig": { "Values": values }
            }]),
            RuleCondition::PathPattern(values) => json!([{
                "Field": "path-pattern",
                "PathPatternConfig": { "Values": values }
            }]),
        }
    }

    /// `target_group` maps a backend port to the target group ARN value.
    pub fn actions_json(&self, target_group: impl Fn(u16) -> Value) -> Value {
        match &self.action {
            RuleAction::Forward { port } => json!([{
                "Type": "forward",
                "TargetGroupArn": target_group(*port)
            }]),
            RuleAction::Redirect { path } => json!([{
                "Type": "redirect",
                "RedirectConfig": {
                    "Protocol": "#{protocol}",
                    "Host": "#{host}",
                    "Port": "#{port}",
                    "Path": path,
                    "Query": "#{query}",
                    "StatusCode": "HTTP_302"
                }
            }]),
        }
    }
}

/// Lower a routing policy into listener rules.
///
/// A path route with `rewrite_to` becomes two rules, because the load
/// balancer can only change a path in a redirect action:
///
/// 1. priority `p`: `/prefix` and `/prefix/*` → 302 to `/<rewrite_to>/#{path}`
/// 2. priority `p + 1`: `/<rewrite_to>/*` → forward to the route's port
///
/// The default policy produces no rules; the listener's default action
/// covers it.
pub fn lower(routing: &RoutingPolicy) -> Vec<ListenerRuleSpec> {
    let mut rules = Vec::new();

    match routing {
        RoutingPolicy::Default => {}
        RoutingPolicy::HostBased { routes } => {
            for route in routes {
                rules.push(ListenerRuleSpec {
                    logical_id: format!("HostRule{}", route.priority),
                    priority: route.priority,
                    condition: RuleCondition::HostHeader(vec![route.host_pattern.clone()]),
                    action: RuleAction::Forward { port: route.port },
                });
            }
        }
        RoutingPolicy::PathBased { routes } => {
            for route in routes {
                let segment = route.segment();
                let matched = vec![format!("/{segment}"), format!("/{segment}/*")];

                match route.rewrite_segment() {
                    Some(internal) => {
                        rules.push(ListenerRuleSpec {
                            logical_id: format!("RewriteRedirectRule{}", route.priority),
                            priority: route.priority,
                            condition: RuleCondition::PathPattern(matched),
                            action: RuleAction::Redirect {
                                path: format!("/{internal}/#{{path}}"),
                            },
                        });
                        rules.push(ListenerRuleSpec {
                            logical_id: format!("RewriteForwardRule{}", route.priority),
                            priority: route.priority + 1,
                            condition: RuleCondition::PathPattern(vec![format!("/{internal}/*")]),
                            action: RuleAction::Forward { port: route.port },
                        });
                    }
                    None => {
                        rules.push(ListenerRuleSpec {
                            logical_id: format!("PathRule{}", route.priority),
                            priority: route.priority,
                            condition: RuleCondition::PathPattern(matched),
                            action: RuleAction::Forward { port: route.port },
                        });
                    }
                }
            }
        }
    }

    rules
}
