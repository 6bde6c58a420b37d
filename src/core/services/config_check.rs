use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::app_config::EnvironmentTable;
use crate::core::models::arn::Arn;
use crate::core::models::environment::{EnvironmentConfig, RegionConfig};
use crate::core::models::routing::{DeploymentStrategy, RoutingPolicy};
use crate::core::services::env_resolver::SYSTEM_KEYS;

static REGION_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]{2}(-gov)?-[a-z]+-[0-9]$").expect("region pattern is valid")
});

/// Retention periods CloudWatch Logs accepts, in days.
const LOG_RETENTION_DAYS: &[u32] = &[
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922,
    3288, 3653,
];

/// One violated invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub environment: String,
    pub region: Option<String>,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}/{}: {}", self.environment, region, self.message),
            None => write!(f, "{}: {}", self.environment, self.message),
        }
    }
}

/// Result of checking an environment table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckResult {
    pub environments_checked: usize,
    pub issues: Vec<ConfigIssue>,
}

impl CheckResult {
    /// Returns true if no invariant is violated.
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }

    /// Total number of issues found.
    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }
}

/// Validates the invariants of environment and region configurations.
pub struct ConfigCheck;

impl ConfigCheck {
    /// Check every environment in the table.
    ///
    /// Issues are ordered by environment name, then by the order the
    /// checks run in.
    pub fn check_table(&self, table: &EnvironmentTable) -> CheckResult {
        let mut issues = Vec::new();
        for (name, env) in &table.environments {
            issues.extend(self.check_environment(name, env));
        }
        CheckResult {
            environments_checked: table.environments.len(),
            issues,
        }
    }

    /// Check a single environment and all of its regions.
    pub fn check_environment(&self, name: &str, env: &EnvironmentConfig) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let mut issue = |message: String| {
            issues.push(ConfigIssue {
                environment: name.to_string(),
                region: None,
                message,
            })
        };

        if env.app_name.is_empty()
            || !env
                .app_name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            issue(format!(
                "app_name '{}' must be lowercase letters, digits and '-'",
                env.app_name
            ));
        }
        if env.image.trim().is_empty() {
            issue("image must not be empty".into());
        }
        if env.domain_name.trim().is_empty() {
            issue("domain_name must not be empty".into());
        }
        if env.container_port == 0 {
            issue("container_port must be greater than 0".into());
        }
        if !env.health_check_path.starts_with('/') {
            issue(format!(
                "health_check_path '{}' must start with '/'",
                env.health_check_path
            ));
        }

        if env.max_capacity == 0 {
            issue("max_capacity must be at least 1".into());
        }
        if !(env.min_capacity <= env.desired_count && env.desired_count <= env.max_capacity) {
            issue(format!(
                "capacity must satisfy min <= desired <= max (got {} <= {} <= {})",
                env.min_capacity, env.desired_count, env.max_capacity
            ));
        }
        if !is_valid_fargate_size(env.cpu, env.memory_mib) {
            issue(format!(
                "cpu {} with memory {} MiB is not a supported Fargate size",
                env.cpu, env.memory_mib
            ));
        }
        if !LOG_RETENTION_DAYS.contains(&env.log_retention_days) {
            issue(format!(
                "log_retention_days {} is not a CloudWatch retention period",
                env.log_retention_days
            ));
        }

        if let Some(error) = &env.env_file_error {
            issue(error.clone());
        }
        for key in env.env_vars.keys().chain(env.file_env_vars.keys()) {
            if SYSTEM_KEYS.contains(&key.as_str()) {
                issue(format!("custom variable '{key}' collides with a system variable"));
            }
            if key.trim().is_empty() {
                issue("custom variable with an empty name".into());
            }
        }

        for message in routing_issues(&env.routing) {
            issue(message);
        }
        if let DeploymentStrategy::BlueGreen {
            test_listener_port, ..
        } = env.deployment
        {
            if matches!(test_listener_port, 0 | 80 | 443) {
                issue(format!(
                    "test_listener_port {test_listener_port} clashes with a production listener"
                ));
            }
            if !env.routing.extra_ports(env.container_port).is_empty() {
                issue(
                    "blue-green deployment supports a single backend port group; \
                     every route must target container_port"
                        .into(),
                );
            }
        }

        if env.regions.is_empty() {
            issue("at least one region must be configured".into());
        }

        for (region, config) in &env.regions {
            for message in region_issues(region, config) {
                issues.push(ConfigIssue {
                    environment: name.to_string(),
                    region: Some(region.clone()),
                    message,
                });
            }
        }

        issues
    }
}

/// Whether a region key looks like an AWS region identifier.
pub fn is_region_identifier(region: &str) -> bool {
    REGION_ID.is_match(region)
}

fn region_issues(region: &str, config: &RegionConfig) -> Vec<String> {
    let mut out = Vec::new();

    if !is_region_identifier(region) {
        out.push(format!("'{region}' is not a valid region identifier"));
    }
    if config.vpc_id.trim().is_empty() {
        out.push("vpc_id must not be empty".into());
    }
    if config.subnet_ids.is_empty() || config.subnet_ids.iter().any(|s| s.trim().is_empty()) {
        out.push("subnet_ids must list at least one non-empty subnet".into());
    }
    if config.security_group_ids.is_empty()
        || config.security_group_ids.iter().any(|s| s.trim().is_empty())
    {
        out.push("security_group_ids must list at least one non-empty group".into());
    }
    if config.hosted_zone_id.trim().is_empty() {
        out.push("hosted_zone_id must not be empty".into());
    }

    match Arn::parse(&config.certificate_arn) {
        None => out.push(format!(
            "certificate_arn '{}' is not an ARN",
            config.certificate_arn
        )),
        Some(arn) if arn.service != "acm" => out.push(format!(
            "certificate_arn must be an ACM certificate, got service '{}'",
            arn.service
        )),
        Some(arn) if arn.region != region => out.push(format!(
            "certificate lives in '{}' but must be in '{region}'",
            arn.region
        )),
        Some(_) => {}
    }

    out
}

fn routing_issues(routing: &RoutingPolicy) -> Vec<String> {
    let mut out = Vec::new();
    let mut priorities = BTreeSet::new();
    let mut check_priority = |priority: u32, out: &mut Vec<String>| {
        if !(1..=50_000).contains(&priority) {
            out.push(format!("rule priority {priority} must be between 1 and 50000"));
        }
        if !priorities.insert(priority) {
            out.push(format!("rule priority {priority} is used more than once"));
        }
    };

    match routing {
        RoutingPolicy::Default => {}
        RoutingPolicy::HostBased { routes } => {
            if routes.is_empty() {
                out.push("host-based routing needs at least one route".into());
            }
            for route in routes {
                if route.host_pattern.trim().is_empty() {
                    out.push("host route with an empty host_pattern".into());
                }
                if route.port == 0 {
                    out.push(format!("host route '{}' has port 0", route.host_pattern));
                }
                check_priority(route.priority, &mut out);
            }
        }
        RoutingPolicy::PathBased { routes } => {
            if routes.is_empty() {
                out.push("path-based routing needs at least one route".into());
            }
            for route in routes {
                if route.segment().is_empty() {
                    out.push("path route with an empty prefix".into());
                }
                if route.port == 0 {
                    out.push(format!("path route '{}' has port 0", route.prefix));
                }
                if let Some(rewrite) = route.rewrite_segment() {
                    if rewrite.is_empty() || captures(route.segment(), rewrite) {
                        out.push(format!(
                            "path route '{}' must rewrite to a prefix outside its own",
                            route.prefix
                        ));
                    } else if let Some(other) = routes.iter().find(|other| {
                        other.priority <= route.priority && captures(other.segment(), rewrite)
                    }) {
                        out.push(format!(
                            "path route '{}' rewrites to '/{rewrite}', which route '{}' matches first",
                            route.prefix, other.prefix
                        ));
                    }
                    // The redirect hop takes the route priority, the forward hop the next one.
                    check_priority(route.priority.saturating_add(1), &mut out);
                }
                check_priority(route.priority, &mut out);
            }
        }
    }

    out
}

/// Whether a rule for `/<segment>/*` also matches paths under `/<target>/`.
fn captures(segment: &str, target: &str) -> bool {
    !segment.is_empty()
        && (target == segment
            || target
                .strip_prefix(segment)
                .is_some_and(|rest| rest.starts_with('/')))
}

/// Fargate CPU/memory combinations.
pub fn is_valid_fargate_size(cpu: u32, memory_mib: u32) -> bool {
    match cpu {
        256 => matches!(memory_mib, 512 | 1024 | 2048),
        512 => (1024..=4096).contains(&memory_mib) && memory_mib % 1024 == 0,
        1024 => (2048..=8192).contains(&memory_mib) && memory_mib % 1024 == 0,
        2048 => (4096..=16384).contains(&memory_mib) && memory_mib % 1024 == 0,
        4096 => (8192..=30720).contains(&memory_mib) && memory_mib % 1024 == 0,
        8192 => (16384..=61440).contains(&memory_mib) && memory_mib % 4096 == 0,
        16384 => (32768..=122880).contains(&memory_mib) && memory_mib % 8192 == 0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::routing::{HostRoute, PathRoute};
    use std::collections::BTreeMap;

    fn region(region: &str) -> RegionConfig {
        RegionConfig {
            vpc_id: "vpc-1".into(),
            subnet_ids: vec!["subnet-1".into(), "subnet-2".into()],
            security_group_ids: vec!["sg-1".into()],
            certificate_arn: format!("arn:aws:acm:{region}:123456789012:certificate/abc"),
            hosted_zone_id: "Z1".into(),
        }
    }

    fn make_env() -> EnvironmentConfig {
        let mut regions = BTreeMap::new();
        regions.insert("us-east-1".to_string(), region("us-east-1"));
        EnvironmentConfig {
            app_name: "orders-api".into(),
            image: "orders:1".into(),
            container_port: 8080,
            health_check_path: "/health".into(),
            min_capacity: 2,
            max_capacity: 10,
            desired_count: 3,
            cpu: 1024,
            memory_mib: 2048,
            domain_name: "orders.example.com".into(),
            log_retention_days: 30,
            env_vars: BTreeMap::new(),
            env_file: None,
            file_env_vars: BTreeMap::new(),
            env_file_error: None,
            routing: RoutingPolicy::Default,
            deployment: DeploymentStrategy::Rolling,
            regions,
        }
    }

    fn messages(env: &EnvironmentConfig) -> Vec<String> {
        ConfigCheck
            .check_environment("qa", env)
            .into_iter()
            .map(|i| i.to_string())
            .collect()
    }

    #[test]
    fn valid_environment_has_no_issues() {
        assert!(messages(&make_env()).is_empty());
    }

    #[test]
    fn builtin_table_is_valid() {
        let table = EnvironmentTable::builtin().unwrap();
        let result = ConfigCheck.check_table(&table);

        assert!(result.is_ok(), "issues: {:?}", result.issues);
        assert_eq!(result.environments_checked, 4);
    }

    #[test]
    fn desired_above_max_reported() {
        let mut env = make_env();
        env.desired_count = 11;

        let msgs = messages(&env);

        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("min <= desired <= max"));
    }

    #[test]
    fn desired_below_min_reported() {
        let mut env = make_env();
        env.desired_count = 1;

        assert!(messages(&env)[0].contains("got 2 <= 1 <= 10"));
    }

    #[test]
    fn certificate_in_other_region_reported() {
        let mut env = make_env();
        let mut west = region("us-west-2");
        west.certificate_arn = "arn:aws:acm:us-east-1:123456789012:certificate/abc".into();
        env.regions.insert("us-west-2".into(), west);

        let issues = ConfigCheck.check_environment("qa", &env);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].region.as_deref(), Some("us-west-2"));
        assert!(issues[0].message.contains("must be in 'us-west-2'"));
    }

    #[test]
    fn non_acm_certificate_reported() {
        let mut env = make_env();
        env.regions.get_mut("us-east-1").unwrap().certificate_arn =
            "arn:aws:iam::123456789012:server-certificate/x".into();

        assert!(messages(&env)[0].contains("ACM certificate"));
    }

    #[test]
    fn bad_region_key_reported() {
        let mut env = make_env();
        env.regions.insert("moon-base-1".into(), region("moon-base-1"));

        assert!(messages(&env)
            .iter()
            .any(|m| m.contains("not a valid region identifier")));
    }

    #[test]
    fn region_identifier_pattern() {
        assert!(is_region_identifier("us-east-1"));
        assert!(is_region_identifier("ap-southeast-2"));
        assert!(is_region_identifier("us-gov-west-1"));
        assert!(!is_region_identifier("US-EAST-1"));
        assert!(!is_region_identifier("us-east"));
    }

    #[test]
    fn system_key_collision_reported() {
        let mut env = make_env();
        env.env_vars.insert("REGION".into(), "mars".into());
        env.file_env_vars.insert("ENVIRONMENT".into(), "x".into());

        let msgs = messages(&env);

        assert_eq!(msgs.len(), 2);
        assert!(msgs.iter().all(|m| m.contains("collides with a system variable")));
    }

    #[test]
    fn unreadable_env_file_reported() {
        let mut env = make_env();
        env.env_file = Some("qa.env".into());
        env.env_file_error = Some("env_file qa.env could not be read: not found".into());

        let msgs = messages(&env);

        assert_eq!(msgs, vec!["qa: env_file qa.env could not be read: not found"]);
    }

    #[test]
    fn empty_regions_reported() {
        let mut env = make_env();
        env.regions.clear();

        assert!(messages(&env)[0].contains("at least one region"));
    }

    #[test]
    fn missing_network_identifiers_reported() {
        let mut env = make_env();
        let r = env.regions.get_mut("us-east-1").unwrap();
        r.subnet_ids.clear();
        r.security_group_ids = vec!["".into()];

        assert_eq!(messages(&env).len(), 2);
    }

    #[test]
    fn unsupported_fargate_size_reported() {
        let mut env = make_env();
        env.memory_mib = 512;

        assert!(messages(&env)[0].contains("Fargate size"));
    }

    #[test]
    fn fargate_sizes() {
        assert!(is_valid_fargate_size(256, 512));
        assert!(is_valid_fargate_size(512, 3072));
        assert!(is_valid_fargate_size(4096, 30720));
        assert!(!is_valid_fargate_size(256, 4096));
        assert!(!is_valid_fargate_size(300, 1024));
    }

    #[test]
    fn duplicate_route_priority_reported() {
        let mut env = make_env();
        env.routing = RoutingPolicy::HostBased {
            routes: vec![
                HostRoute {
                    host_pattern: "a.*".into(),
                    port: 9000,
                    priority: 10,
                },
                HostRoute {
                    host_pattern: "b.*".into(),
                    port: 9001,
                    priority: 10,
                },
            ],
        };

        assert!(messages(&env)[0].contains("used more than once"));
    }

    #[test]
    fn rewrite_reserves_next_priority() {
        let mut env = make_env();
        env.routing = RoutingPolicy::PathBased {
            routes: vec![
                PathRoute {
                    prefix: "/reports".into(),
                    port: 9000,
                    priority: 10,
                    rewrite_to: Some("reports-internal".into()),
                },
                PathRoute {
                    prefix: "/files".into(),
                    port: 9001,
                    priority: 11,
                    rewrite_to: None,
                },
            ],
        };

        assert!(messages(&env)[0].contains("priority 11"));
    }

    #[test]
    fn rewrite_to_same_prefix_reported() {
        let mut env = make_env();
        env.routing = RoutingPolicy::PathBased {
            routes: vec![PathRoute {
                prefix: "/reports".into(),
                port: 9000,
                priority: 10,
                rewrite_to: Some("/reports/".into()),
            }],
        };

        assert!(messages(&env)[0].contains("outside its own"));
    }

    #[test]
    fn rewrite_nested_under_prefix_reported() {
        let mut env = make_env();
        env.routing = RoutingPolicy::PathBased {
            routes: vec![PathRoute {
                prefix: "/reports".into(),
                port: 9000,
                priority: 10,
                rewrite_to: Some("reports/v2".into()),
            }],
        };

        let msgs = messages(&env);

        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("outside its own"));
    }

    #[test]
    fn rewrite_sharing_a_name_prefix_is_fine() {
        let mut env = make_env();
        env.routing = RoutingPolicy::PathBased {
            routes: vec![PathRoute {
                prefix: "/reports".into(),
                port: 9000,
                priority: 10,
                rewrite_to: Some("reports-v2".into()),
            }],
        };

        assert!(messages(&env).is_empty());
    }

    #[test]
    fn rewrite_captured_by_earlier_route_reported() {
        let mut env = make_env();
        env.routing = RoutingPolicy::PathBased {
            routes: vec![
                PathRoute {
                    prefix: "/legacy".into(),
                    port: 9000,
                    priority: 20,
                    rewrite_to: Some("api/legacy".into()),
                },
                PathRoute {
                    prefix: "/api".into(),
                    port: 9001,
                    priority: 5,
                    rewrite_to: None,
                },
            ],
        };

        let msgs = messages(&env);

        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("which route '/api' matches first"));
    }

    #[test]
    fn rewrite_into_later_route_is_fine() {
        let mut env = make_env();
        env.routing = RoutingPolicy::PathBased {
            routes: vec![
                PathRoute {
                    prefix: "/legacy".into(),
                    port: 9000,
                    priority: 5,
                    rewrite_to: Some("api/legacy".into()),
                },
                PathRoute {
                    prefix: "/api".into(),
                    port: 9001,
                    priority: 20,
                    rewrite_to: None,
                },
            ],
        };

        assert!(messages(&env).is_empty());
    }

    #[test]
    fn blue_green_rejects_extra_port_groups() {
        let mut env = make_env();
        env.deployment = DeploymentStrategy::BlueGreen {
            test_listener_port: 8443,
            termination_wait_minutes: 5,
        };
        env.routing = RoutingPolicy::HostBased {
            routes: vec![HostRoute {
                host_pattern: "admin.*".into(),
                port: 9090,
                priority: 10,
            }],
        };

        let msgs = messages(&env);

        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("single backend port group"));
    }

    #[test]
    fn blue_green_test_port_must_not_clash() {
        let mut env = make_env();
        env.deployment = DeploymentStrategy::BlueGreen {
            test_listener_port: 443,
            termination_wait_minutes: 5,
        };

        assert!(messages(&env)[0].contains("clashes"));
    }
}
