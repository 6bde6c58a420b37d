use serde::{Deserialize, Serialize};

/// How the HTTPS listener spreads requests across backend port groups.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RoutingPolicy {
    /// All traffic goes to the container port.
    #[default]
    Default,
    /// Match on the `Host` header.
    HostBased { routes: Vec<HostRoute> },
    /// Match on the request path, optionally rewriting the prefix.
    PathBased { routes: Vec<PathRoute> },
}

impl RoutingPolicy {
    /// Ports other than the main container port that need their own
    /// target group, deduplicated in first-seen order.
    pub fn extra_ports(&self, container_port: u16) -> Vec<u16> {
        let ports: Vec<u16> = match self {
            Self::Default => Vec::new(),
            Self::HostBased { routes } => routes.iter().map(|r| r.port).collect(),
            Self::PathBased { routes } => routes.iter().map(|r| r.port).collect(),
        };
        let mut seen = Vec::new();
        for port in ports {
            if port != container_port && !seen.contains(&port) {
                seen.push(port);
            }
        }
        seen
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::HostBased { .. } => "host-based",
            Self::PathBased { .. } => "path-based",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HostRoute {
    /// e.g. `admin.*` or `api.example.com`
    pub host_pattern: String,
    pub port: u16,
    pub priority: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PathRoute {
    /// Leading path segment, with or without slashes (`/reports`).
    pub prefix: String,
    pub port: u16,
    pub priority: u32,
    /// Internal prefix the request is rewritten to before forwarding.
    #[serde(default)]
    pub rewrite_to: Option<String>,
}

impl PathRoute {
    /// The prefix without surrounding slashes.
    pub fn segment(&self) -> &str {
        self.prefix.trim_matches('/')
    }

    pub fn rewrite_segment(&self) -> Option<&str> {
        self.rewrite_to.as_deref().map(|r| r.trim_matches('/'))
    }
}

/// How new task revisions replace running ones.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DeploymentStrategy {
    /// Platform rolling update with circuit-breaker rollback.
    #[default]
    Rolling,
    /// Two target groups, traffic shifted by CodeDeploy.
    BlueGreen {
        #[serde(default = "default_test_listener_port")]
        test_listener_port: u16,
        #[serde(default = "default_termination_wait_minutes")]
        termination_wait_minutes: u32,
    },
}

impl DeploymentStrategy {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rolling => "rolling",
            Self::BlueGreen { .. } => "blue-green",
        }
    }
}

fn default_test_listener_port() -> u16 {
    8443
}

fn default_termination_wait_minutes() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_ports_skip_container_port_and_duplicates() {
        let policy = RoutingPolicy::HostBased {
            routes: vec![
                HostRoute {
                    host_pattern: "admin.*".into(),
                    port: 9090,
                    priority: 10,
                },
                HostRoute {
                    host_pattern: "api.*".into(),
                    port: 8080,
                    priority: 20,
                },
                HostRoute {
                    host_pattern: "ops.*".into(),
                    port: 9090,
                    priority: 30,
                },
            ],
        };

        assert_eq!(policy.extra_ports(8080), vec![9090]);
        assert!(RoutingPolicy::Default.extra_ports(8080).is_empty());
    }

    #[test]
    fn path_route_segments_strip_slashes() {
        let route = PathRoute {
            prefix: "/reports/".into(),
            port: 9000,
            priority: 5,
            rewrite_to: Some("/reports-internal".into()),
        };
        assert_eq!(route.segment(), "reports");
        assert_eq!(route.rewrite_segment(), Some("reports-internal"));
    }

    #[test]
    fn blue_green_defaults_apply() {
        let strategy: DeploymentStrategy = toml::from_str(r#"kind = "blue-green""#).unwrap();
        assert_eq!(
            strategy,
            DeploymentStrategy::BlueGreen {
                test_listener_port: 8443,
                termination_wait_minutes: 5,
            }
        );
    }

    #[test]
    fn path_based_policy_deserializes() {
        let policy: RoutingPolicy = toml::from_str(
            r#"
kind = "path-based"
[[routes]]
prefix = "/reports"
port = 9000
priority = 10
rewrite_to = "reports-internal"
"#,
        )
        .unwrap();

        match policy {
            RoutingPolicy::PathBased { routes } => {
                assert_eq!(routes.len(), 1);
                assert_eq!(routes[0].rewrite_segment(), Some("reports-internal"));
            }
            other => panic!("unexpected policy: {other:?}"),
        }
    }
}
