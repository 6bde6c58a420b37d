use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::core::errors::Result;
use crate::core::models::deployment_unit::DeploymentUnit;
use crate::core::models::environment::{
    EnvironmentConfig, RegionConfig, ResolvedEnvironment, StackMode,
};
use crate::core::models::resource_graph::ResourceGraph;
use crate::core::models::routing::{DeploymentStrategy, RoutingPolicy};
use crate::core::models::template::{Output, Resource, ResourceRef};
use crate::core::services::env_resolver::EnvResolver;
use crate::core::services::listener_rules;

pub const CPU_TARGET_PERCENT: f64 = 70.0;
pub const MEMORY_TARGET_PERCENT: f64 = 80.0;
pub const SCALING_COOLDOWN_SECONDS: u32 = 300;

const HTTPS_PORT: u16 = 443;
const HTTP_PORT: u16 = 80;
const SSL_POLICY: &str = "ELBSecurityPolicy-TLS13-1-2-2021-06";
const HEALTH_CHECK_GRACE_SECONDS: u32 = 60;

/// Builds one deployment unit per resolved region.
///
/// Every unit is independent: nothing is shared between regions, and the
/// order of units follows the resolver's region order.
pub struct StackAssembler;

/// Everything one unit needs, borrowed from the resolved environment.
struct UnitContext<'a> {
    stack_name: String,
    environment: &'a str,
    region: &'a str,
    env: &'a EnvironmentConfig,
    network: &'a RegionConfig,
    routing: RoutingPolicy,
    deployment: DeploymentStrategy,
}

impl UnitContext<'_> {
    /// `<app>-<environment>`, used for names shared by all regions.
    fn base_name(&self) -> String {
        format!("{}-{}", self.env.app_name, self.environment)
    }

    fn tags(&self) -> Value {
        json!([
            { "Key": "ecsforge:app", "Value": self.env.app_name },
            { "Key": "ecsforge:environment", "Value": self.environment },
            { "Key": "ecsforge:region", "Value": self.region }
        ])
    }
}

/// Target groups of a unit keyed by backend port.
struct TargetGroups {
    main: ResourceRef,
    green: Option<ResourceRef>,
    by_port: BTreeMap<u16, ResourceRef>,
}

impl TargetGroups {
    fn arn_for(&self, port: u16) -> Value {
        self.by_port
            .get(&port)
            .unwrap_or(&self.main)
            .reference()
    }
}

impl StackAssembler {
    /// Fan out over the resolved regions.
    pub fn assemble(&self, resolved: &ResolvedEnvironment) -> Result<Vec<DeploymentUnit>> {
        resolved
            .regions
            .iter()
            .map(|(region, network)| self.assemble_unit(resolved, region, network))
            .collect()
    }

    /// Build the resource graph for a single (environment, region) pair
    /// and emit it as a template.
    pub fn assemble_unit(
        &self,
        resolved: &ResolvedEnvironment,
        region: &str,
        network: &RegionConfig,
    ) -> Result<DeploymentUnit> {
        let env = &resolved.config;
        let (routing, deployment) = match resolved.mode {
            StackMode::Standard => {
                if env.routing != RoutingPolicy::Default || env.deployment != DeploymentStrategy::Rolling {
                    tracing::debug!(
                        routing = env.routing.kind(),
                        deployment = env.deployment.kind(),
                        "standard stack ignores configured routing and deployment variants"
                    );
                }
                (RoutingPolicy::Default, DeploymentStrategy::Rolling)
            }
            StackMode::ExplicitResource => (env.routing.clone(), env.deployment.clone()),
        };

        let ctx = UnitContext {
            stack_name: DeploymentUnit::stack_name_for(&env.app_name, &resolved.name, region),
            environment: &resolved.name,
            region,
            env,
            network,
            routing,
            deployment,
        };

        let mut graph = ResourceGraph::new(&ctx.stack_name);
        let mut outputs = BTreeMap::new();

        let log_group = graph.add(Resource::new(
            "LogGroup",
            "AWS::Logs::LogGroup",
            json!({
                "LogGroupName": format!("/ecs/{}", ctx.base_name()),
                "RetentionInDays": env.log_retention_days
            }),
        ))?;

        let cluster = graph.add(Resource::new(
            "Cluster",
            "AWS::ECS::Cluster",
            json!({
                "ClusterName": ctx.base_name(),
                "ClusterSettings": [{ "Name": "containerInsights", "Value": "enabled" }],
                "Tags": ctx.tags()
            }),
        ))?;

        let execution_role = graph.add(Resource::new(
            "TaskExecutionRole",
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": trust_policy("ecs-tasks.amazonaws.com"),
                "ManagedPolicyArns": [managed_policy("service-role/AmazonECSTaskExecutionRolePolicy")]
            }),
        ))?;
        let task_role = graph.add(Resource::new(
            "TaskRole",
            "AWS::IAM::Role",
            json!({ "AssumeRolePolicyDocument": trust_policy("ecs-tasks.amazonaws.com") }),
        ))?;

        let ports = backend_ports(&ctx);
        let task_definition = graph.add(task_definition_resource(
            &ctx,
            &ports,
            &log_group,
            &execution_role,
            &task_role,
        ))?;

        let load_balancer = graph.add(Resource::new(
            "LoadBalancer",
            "AWS::ElasticLoadBalancingV2::LoadBalancer",
            json!({
                "Type": "application",
                "Scheme": "internet-facing",
                "Subnets": network.subnet_ids,
                "SecurityGroups": network.security_group_ids,
                "LoadBalancerAttributes": [
                    { "Key": "idle_timeout.timeout_seconds", "Value": "60" }
                ],
                "Tags": ctx.tags()
            }),
        ))?;

        let target_groups = add_target_groups(&mut graph, &ctx, &ports)?;

        graph.add(Resource::new(
            "HttpListener",
            "AWS::ElasticLoadBalancingV2::Listener",
            json!({
                "LoadBalancerArn": load_balancer.reference(),
                "Port": HTTP_PORT,
                "Protocol": "HTTP",
                "DefaultActions": [{
                    "Type": "redirect",
                    "RedirectConfig": { "Protocol": "HTTPS", "Port": HTTPS_PORT.to_string(), "StatusCode": "HTTP_301" }
                }]
            }),
        ))?;

        let https_listener = graph.add(https_listener_resource(
            "HttpsListener",
            HTTPS_PORT,
            &load_balancer,
            network,
            &target_groups.main,
        ))?;

        let test_listener = match (&ctx.deployment, &target_groups.green) {
            (DeploymentStrategy::BlueGreen { test_listener_port, .. }, Some(green)) => Some(graph.add(
                https_listener_resource("TestListener", *test_listener_port, &load_balancer, network, green),
            )?),
            _ => None,
        };

        let mut rule_refs = Vec::new();
        for rule in listener_rules::lower(&ctx.routing) {
            let resource = Resource::new(
                rule.logical_id.clone(),
                "AWS::ElasticLoadBalancingV2::ListenerRule",
                json!({
                    "ListenerArn": https_listener.reference(),
                    "Priority": rule.priority,
                    "Conditions": rule.conditions_json(),
                    "Actions": rule.actions_json(|port| target_groups.arn_for(port))
                }),
            );
            rule_refs.push(graph.add(resource)?);
        }

        let mut service = service_resource(&ctx, &ports, &cluster, &task_definition, &target_groups)
            .depends_on(&https_listener);
        for rule in &rule_refs {
            service = service.depends_on(rule);
        }
        if let Some(test_listener) = &test_listener {
            service = service.depends_on(test_listener);
        }
        let service = graph.add(service)?;

        add_scaling(&mut graph, &ctx, &cluster, &service)?;

        graph.add(Resource::new(
            "DnsRecord",
            "AWS::Route53::RecordSet",
            json!({
                "HostedZoneId": network.hosted_zone_id,
                "Name": env.domain_name,
                "Type": "A",
                "SetIdentifier": region,
                "Region": region,
                "AliasTarget": {
                    "DNSName": load_balancer.attr("DNSName"),
                    "HostedZoneId": load_balancer.attr("CanonicalHostedZoneID"),
                    "EvaluateTargetHealth": true
                }
            }),
        ))?;

        if let (DeploymentStrategy::BlueGreen { termination_wait_minutes, .. }, Some(green), Some(test)) =
            (&ctx.deployment, &target_groups.green, &test_listener)
        {
            let group = add_blue_green(
                &mut graph,
                &ctx,
                *termination_wait_minutes,
                &cluster,
                &service,
                (&target_groups.main, green),
                (&https_listener, test),
            )?;
            outputs.insert(
                "DeploymentGroupName".to_string(),
                Output::new("CodeDeploy deployment group", group.reference()),
            );
        }

        outputs.insert(
            "LoadBalancerDnsName".to_string(),
            Output::new("Public DNS name of the load balancer", load_balancer.attr("DNSName"))
                .exported_as(format!("{}-LoadBalancerDnsName", ctx.stack_name)),
        );
        outputs.insert(
            "ServiceName".to_string(),
            Output::new("ECS service name", service.attr("Name")),
        );
        outputs.insert(
            "ClusterName".to_string(),
            Output::new("ECS cluster name", cluster.reference()),
        );
        outputs.insert(
            "ServiceUrl".to_string(),
            Output::new("Public URL of the service", json!(format!("https://{}", env.domain_name))),
        );

        let description = format!(
            "{} {} in {} ({} stack, {} deployment) - generated by ecsforge",
            env.app_name,
            ctx.environment,
            region,
            resolved.mode,
            ctx.deployment.kind()
        );
        let resource_count = graph.resource_count();
        let template = graph.into_template(&description, outputs)?;

        tracing::debug!(
            stack = %ctx.stack_name,
            resources = resource_count,
            "assembled deployment unit"
        );

        Ok(DeploymentUnit {
            stack_name: ctx.stack_name,
            environment: resolved.name.clone(),
            region: region.to_string(),
            mode: resolved.mode,
            template,
        })
    }
}

/// The container port first, then every extra route port.
fn backend_ports(ctx: &UnitContext<'_>) -> Vec<u16> {
    let mut ports = vec![ctx.env.container_port];
    ports.extend(ctx.routing.extra_ports(ctx.env.container_port));
    ports
}

fn trust_policy(service: &str) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": service },
            "Action": "sts:AssumeRole"
        }]
    })
}

fn managed_policy(name: &str) -> Value {
    json!({ "Fn::Sub": format!("arn:${{AWS::Partition}}:iam::aws:policy/{name}") })
}

fn task_definition_resource(
    ctx: &UnitContext<'_>,
    ports: &[u16],
    log_group: &ResourceRef,
    execution_role: &ResourceRef,
    task_role: &ResourceRef,
) -> Resource {
    let env = ctx.env;
    let environment: Vec<Value> =
        EnvResolver::container_environment(ctx.environment, ctx.region, env)
            .into_iter()
            .map(|(name, value)| json!({ "Name": name, "Value": value }))
            .collect();
    let port_mappings: Vec<Value> = ports
        .iter()
        .map(|port| json!({ "ContainerPort": port, "Protocol": "tcp" }))
        .collect();

    Resource::new(
        "TaskDefinition",
        "AWS::ECS::TaskDefinition",
        json!({
            "Family": ctx.base_name(),
            "Cpu": env.cpu.to_string(),
            "Memory": env.memory_mib.to_string(),
            "NetworkMode": "awsvpc",
            "RequiresCompatibilities": ["FARGATE"],
            "ExecutionRoleArn": execution_role.attr("Arn"),
            "TaskRoleArn": task_role.attr("Arn"),
            "ContainerDefinitions": [{
                "Name": env.app_name,
                "Image": env.image,
                "Essential": true,
                "PortMappings": port_mappings,
                "Environment": environment,
                "LogConfiguration": {
                    "LogDriver": "awslogs",
                    "Options": {
                        "awslogs-group": log_group.reference(),
                        "awslogs-region": ctx.region,
                        "awslogs-stream-prefix": env.app_name
                    }
                }
            }],
            "Tags": ctx.tags()
        }),
    )
}

fn target_group(logical_id: String, ctx: &UnitContext<'_>, port: u16) -> Resource {
    Resource::new(
        logical_id,
        "AWS::ElasticLoadBalancingV2::TargetGroup",
        json!({
            "Port": port,
            "Protocol": "HTTP",
            "TargetType": "ip",
            "VpcId": ctx.network.vpc_id,
            "HealthCheckProtocol": "HTTP",
            "HealthCheckPath": ctx.env.health_check_path,
            "HealthCheckIntervalSeconds": 30,
            "HealthyThresholdCount": 2,
            "UnhealthyThresholdCount": 3,
            "Matcher": { "HttpCode": "200" },
            "TargetGroupAttributes": [
                { "Key": "deregistration_delay.timeout_seconds", "Value": "30" }
            ]
        }),
    )
}

fn add_target_groups(
    graph: &mut ResourceGraph,
    ctx: &UnitContext<'_>,
    ports: &[u16],
) -> Result<TargetGroups> {
    let container_port = ctx.env.container_port;
    let blue_green = matches!(ctx.deployment, DeploymentStrategy::BlueGreen { .. });

    let (main, green) = if blue_green {
        let blue = graph.add(target_group("BlueTargetGroup".into(), ctx, container_port))?;
        let green = graph.add(target_group("GreenTargetGroup".into(), ctx, container_port))?;
        (blue, Some(green))
    } else {
        (graph.add(target_group("TargetGroup".into(), ctx, container_port))?, None)
    };

    let mut by_port = BTreeMap::new();
    by_port.insert(container_port, main.clone());
    for port in ports.iter().copied().filter(|p| *p != container_port) {
        let tg = graph.add(target_group(format!("TargetGroup{port}"), ctx, port))?;
        by_port.insert(port, tg);
    }

    Ok(TargetGroups {
        main,
        green,
        by_port,
    })
}

fn https_listener_resource(
    logical_id: &str,
    port: u16,
    load_balancer: &ResourceRef,
    network: &RegionConfig,
    default_target: &ResourceRef,
) -> Resource {
    Resource::new(
        logical_id,
        "AWS::ElasticLoadBalancingV2::Listener",
        json!({
            "LoadBalancerArn": load_balancer.reference(),
            "Port": port,
            "Protocol": "HTTPS",
            "SslPolicy": SSL_POLICY,
            "Certificates": [{ "CertificateArn": network.certificate_arn }],
            "DefaultActions": [{ "Type": "forward", "TargetGroupArn": default_target.reference() }]
        }),
    )
}

fn service_resource(
    ctx: &UnitContext<'_>,
    ports: &[u16],
    cluster: &ResourceRef,
    task_definition: &ResourceRef,
    target_groups: &TargetGroups,
) -> Resource {
    let env = ctx.env;

    // CodeDeploy-controlled services accept exactly one load balancer entry.
    let (controller, deployment_configuration, registered_ports) = match ctx.deployment {
        DeploymentStrategy::Rolling => (
            "ECS",
            json!({
                "MinimumHealthyPercent": 100,
                "MaximumPercent": 200,
                "DeploymentCircuitBreaker": { "Enable": true, "Rollback": true }
            }),
            ports.to_vec(),
        ),
        DeploymentStrategy::BlueGreen { .. } => (
            "CODE_DEPLOY",
            json!({ "MinimumHealthyPercent": 100, "MaximumPercent": 200 }),
            vec![env.container_port],
        ),
    };

    let load_balancers: Vec<Value> = registered_ports
        .iter()
        .map(|port| {
            json!({
                "ContainerName": env.app_name,
                "ContainerPort": port,
                "TargetGroupArn": target_groups.arn_for(*port)
            })
        })
        .collect();

    Resource::new(
        "Service",
        "AWS::ECS::Service",
        json!({
            "ServiceName": ctx.base_name(),
            "Cluster": cluster.reference(),
            "TaskDefinition": task_definition.reference(),
            "LaunchType": "FARGATE",
            "PlatformVersion": "LATEST",
            "DesiredCount": env.desired_count,
            "HealthCheckGracePeriodSeconds": HEALTH_CHECK_GRACE_SECONDS,
            "DeploymentController": { "Type": controller },
            "DeploymentConfiguration": deployment_configuration,
            "NetworkConfiguration": {
                "AwsvpcConfiguration": {
                    "AssignPublicIp": "DISABLED",
                    "Subnets": ctx.network.subnet_ids,
                    "SecurityGroups": ctx.network.security_group_ids
                }
            },
            "LoadBalancers": load_balancers,
            "Tags": ctx.tags()
        }),
    )
}

/// Scalable target plus the CPU and memory target-tracking policies.
fn add_scaling(
    graph: &mut ResourceGraph,
    ctx: &UnitContext<'_>,
    cluster: &ResourceRef,
    service: &ResourceRef,
) -> Result<()> {
    let target = graph.add(Resource::new(
        "ScalableTarget",
        "AWS::ApplicationAutoScaling::ScalableTarget",
        json!({
            "MinCapacity": ctx.env.min_capacity,
            "MaxCapacity": ctx.env.max_capacity,
            "ResourceId": { "Fn::Join": ["/", ["service", cluster.reference(), service.attr("Name")]] },
            "ScalableDimension": "ecs:service:DesiredCount",
            "ServiceNamespace": "ecs"
        }),
    ))?;

    for (logical_id, suffix, metric, target_value) in [
        ("CpuScalingPolicy", "cpu", "ECSServiceAverageCPUUtilization", CPU_TARGET_PERCENT),
        ("MemoryScalingPolicy", "memory", "ECSServiceAverageMemoryUtilization", MEMORY_TARGET_PERCENT),
    ] {
        graph.add(Resource::new(
            logical_id,
            "AWS::ApplicationAutoScaling::ScalingPolicy",
            json!({
                "PolicyName": format!("{}-{suffix}", ctx.stack_name),
                "PolicyType": "TargetTrackingScaling",
                "ScalingTargetId": target.reference(),
                "TargetTrackingScalingPolicyConfiguration": {
                    "PredefinedMetricSpecification": { "PredefinedMetricType": metric },
                    "TargetValue": target_value,
                    "ScaleInCooldown": SCALING_COOLDOWN_SECONDS,
                    "ScaleOutCooldown": SCALING_COOLDOWN_SECONDS
                }
            }),
        ))?;
    }

    Ok(())
}

/// CodeDeploy application and deployment group shifting traffic between
/// the blue and green target groups. Returns the deployment group.
fn add_blue_green(
    graph: &mut ResourceGraph,
    ctx: &UnitContext<'_>,
    termination_wait_minutes: u32,
    cluster: &ResourceRef,
    service: &ResourceRef,
    (blue, green): (&ResourceRef, &ResourceRef),
    (prod_listener, test_listener): (&ResourceRef, &ResourceRef),
) -> Result<ResourceRef> {
    let role = graph.add(Resource::new(
        "CodeDeployServiceRole",
        "AWS::IAM::Role",
        json!({
            "AssumeRolePolicyDocument": trust_policy("codedeploy.amazonaws.com"),
            "ManagedPolicyArns": [managed_policy("AWSCodeDeployRoleForECS")]
        }),
    ))?;

    let application = graph.add(Resource::new(
        "CodeDeployApplication",
        "AWS::CodeDeploy::Application",
        json!({ "ApplicationName": ctx.stack_name, "ComputePlatform": "ECS" }),
    ))?;

    graph.add(Resource::new(
        "DeploymentGroup",
        "AWS::CodeDeploy::DeploymentGroup",
        json!({
            "ApplicationName": application.reference(),
            "DeploymentGroupName": ctx.stack_name,
            "ServiceRoleArn": role.attr("Arn"),
            "DeploymentConfigName": "CodeDeployDefault.ECSAllAtOnce",
            "DeploymentStyle": {
                "DeploymentType": "BLUE_GREEN",
                "DeploymentOption": "WITH_TRAFFIC_CONTROL"
            },
            "BlueGreenDeploymentConfiguration": {
                "DeploymentReadyOption": { "ActionOnTimeout": "CONTINUE_DEPLOYMENT" },
                "TerminateBlueInstancesOnDeploymentSuccess": {
                    "Action": "TERMINATE",
                    "TerminationWaitTimeInMinutes": termination_wait_minutes
                }
            },
            "AutoRollbackConfiguration": {
                "Enabled": true,
                "Events": ["DEPLOYMENT_FAILURE"]
            },
            "ECSServices": [{
                "ClusterName": cluster.reference(),
                "ServiceName": service.attr("Name")
            }],
            "LoadBalancerInfo": {
                "TargetGroupPairInfoList": [{
                    "TargetGroups": [
                        { "Name": blue.attr("TargetGroupName") },
                        { "Name": green.attr("TargetGroupName") }
                    ],
                    "ProdTrafficRoute": { "ListenerArns": [prod_listener.reference()] },
                    "TestTrafficRoute": { "ListenerArns": [test_listener.reference()] }
                }]
            }
        }),
    ))
}
