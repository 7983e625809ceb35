//! AWS metadata for segments.
//!
//! The `aws` block combines where the service runs (read from resource
//! attributes set by the AWS resource detectors) with details of AWS SDK
//! calls (read from, and removed from, span attributes). The `origin` field
//! names the AWS platform the service runs on.

use crate::constants::attributes::*;
use crate::constants::{origins, platforms};
use crate::segment::{
    non_empty, AwsData, BeanstalkMetadata, Ec2Metadata, EcsMetadata, EksMetadata, LogGroupMetadata,
    XRayMetadata,
};
use crate::span::Resource;
use crate::value::{AttributeMap, AttributeValue};
use once_cell::sync::Lazy;
use regex::Regex;

/// `arn:aws:logs:<region>:<account>:log-group:<name>[:*]`
static LOG_GROUP_ARN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^arn:aws[a-z-]*:logs:[^:]*:[^:]*:log-group:([^:]+)")
        .expect("Invalid log group ARN pattern")
});

/// Resource attributes the `aws` block is built from.
#[derive(Debug, Default)]
struct ResourceFacts<'a> {
    provider: &'a str,
    platform: &'a str,
    account: &'a str,
    zone: &'a str,
    host_id: &'a str,
    host_type: &'a str,
    ami_id: &'a str,
    container_name: &'a str,
    container_id: &'a str,
    cluster_name: &'a str,
    pod: &'a str,
    namespace: &'a str,
    deployment_id: &'a str,
    version_label: &'a str,
    sdk_name: &'a str,
    sdk_language: &'a str,
    sdk_version: &'a str,
    auto_version: &'a str,
    ecs_cluster_arn: &'a str,
    ecs_container_arn: &'a str,
    ecs_task_arn: &'a str,
    ecs_task_family: &'a str,
    ecs_launch_type: &'a str,
    log_group_names: Vec<String>,
    log_group_arns: Vec<String>,
}

impl<'a> ResourceFacts<'a> {
    fn read(resource: &'a Resource) -> Self {
        let mut facts = Self::default();
        for (key, value) in &resource.attributes {
            let text = value.as_str().unwrap_or("");
            match key.as_str() {
                CLOUD_PROVIDER => facts.provider = text,
                CLOUD_PLATFORM => facts.platform = text,
                CLOUD_ACCOUNT_ID => facts.account = text,
                CLOUD_AVAILABILITY_ZONE => facts.zone = text,
                HOST_ID => facts.host_id = text,
                HOST_TYPE => facts.host_type = text,
                HOST_IMAGE_ID => facts.ami_id = text,
                CONTAINER_NAME => facts.container_name = text,
                CONTAINER_ID => facts.container_id = text,
                K8S_CLUSTER_NAME => facts.cluster_name = text,
                K8S_POD_NAME => facts.pod = text,
                SERVICE_NAMESPACE => facts.namespace = text,
                SERVICE_INSTANCE_ID => facts.deployment_id = text,
                SERVICE_VERSION => facts.version_label = text,
                TELEMETRY_SDK_NAME => facts.sdk_name = text,
                TELEMETRY_SDK_LANGUAGE => facts.sdk_language = text,
                TELEMETRY_SDK_VERSION => facts.sdk_version = text,
                TELEMETRY_AUTO_VERSION => facts.auto_version = text,
                AWS_ECS_CLUSTER_ARN => facts.ecs_cluster_arn = text,
                AWS_ECS_CONTAINER_ARN => facts.ecs_container_arn = text,
                AWS_ECS_TASK_ARN => facts.ecs_task_arn = text,
                AWS_ECS_TASK_FAMILY => facts.ecs_task_family = text,
                AWS_ECS_LAUNCHTYPE => facts.ecs_launch_type = text,
                AWS_LOG_GROUP_NAMES => facts.log_group_names = string_list(value),
                AWS_LOG_GROUP_ARNS => facts.log_group_arns = string_list(value),
                _ => {}
            }
        }
        facts
    }
}

/// Span attributes describing an AWS SDK call.
#[derive(Debug, Default)]
struct CallFacts {
    operation: Option<String>,
    account: Option<String>,
    region: Option<String>,
    request_id: Option<String>,
    queue_url: Option<String>,
    table_name: Option<String>,
}

/// Builds the `aws` block and removes the SDK-call attributes it consumed.
///
/// Returns `None` for resources attributed to another cloud provider, and
/// when there is nothing AWS-related to report.
pub fn make_aws(attributes: AttributeMap, resource: &Resource) -> (AttributeMap, Option<AwsData>) {
    let facts = ResourceFacts::read(resource);

    let is_aws_api = attributes
        .get(RPC_SYSTEM)
        .and_then(AttributeValue::as_str)
        .is_some_and(|system| system == RPC_SYSTEM_AWS_API);
    let rpc_method = attributes
        .get(RPC_METHOD)
        .and_then(AttributeValue::as_non_empty_str)
        .map(str::to_string);
    let span_log_groups = attributes
        .get(AWS_LOG_GROUP_NAMES)
        .map(string_list)
        .unwrap_or_default();

    let mut call = CallFacts::default();
    let mut filtered = AttributeMap::with_capacity(attributes.len());
    for (key, value) in attributes {
        let text = || value.as_non_empty_str().map(str::to_string);
        match key.as_str() {
            AWS_OPERATION => call.operation = text(),
            AWS_ACCOUNT_ID => call.account = text(),
            AWS_REGION => call.region = text(),
            AWS_REQUEST_ID | AWS_REQUEST_ID_ALT => call.request_id = text(),
            AWS_QUEUE_URL | AWS_QUEUE_URL_ALT => call.queue_url = text(),
            AWS_TABLE_NAME | AWS_TABLE_NAME_ALT => call.table_name = text(),
            _ => {
                filtered.insert(key, value);
            }
        }
    }

    if !facts.provider.is_empty() && facts.provider != CLOUD_PROVIDER_AWS {
        return (filtered, None);
    }

    if call.operation.is_none() && is_aws_api {
        call.operation = rpc_method;
    }

    let ec2 = (facts.platform == platforms::AWS_EC2 || !facts.host_id.is_empty()).then(|| {
        Ec2Metadata {
            instance_id: non_empty(facts.host_id),
            availability_zone: non_empty(facts.zone),
            instance_size: non_empty(facts.host_type),
            ami_id: non_empty(facts.ami_id),
        }
    });

    let ecs = (facts.platform == platforms::AWS_ECS).then(|| EcsMetadata {
        container_name: non_empty(facts.container_name),
        container_id: non_empty(facts.container_id),
        task_arn: non_empty(facts.ecs_task_arn),
        task_family: non_empty(facts.ecs_task_family),
        cluster_arn: non_empty(facts.ecs_cluster_arn),
        container_arn: non_empty(facts.ecs_container_arn),
        availability_zone: non_empty(facts.zone),
        launch_type: non_empty(facts.ecs_launch_type),
    });

    let beanstalk = (facts.platform == platforms::AWS_ELASTIC_BEANSTALK
        && !facts.deployment_id.is_empty())
    .then(|| BeanstalkMetadata {
        environment: non_empty(facts.namespace),
        version_label: non_empty(facts.version_label),
        deployment_id: Some(facts.deployment_id.parse().unwrap_or(0)),
    });

    let eks = (facts.platform == platforms::AWS_EKS).then(|| EksMetadata {
        cluster_name: non_empty(facts.cluster_name),
        pod: non_empty(facts.pod),
        container_id: non_empty(facts.container_id),
    });

    // ARNs carry the group name too, so they win over bare names.
    let cloudwatch_logs = if !facts.log_group_arns.is_empty() {
        log_groups_from_arns(&facts.log_group_arns)
    } else if !facts.log_group_names.is_empty() {
        log_groups_from_names(&facts.log_group_names)
    } else {
        log_groups_from_names(&span_log_groups)
    };

    let sdk = match (facts.sdk_name, facts.sdk_language) {
        ("", _) => None,
        (name, "") => Some(name.to_string()),
        (name, language) => Some(format!("{name} for {language}")),
    };
    let auto_instrumentation = !facts.auto_version.is_empty();
    let xray = (sdk.is_some() || !facts.sdk_version.is_empty() || auto_instrumentation).then(
        || XRayMetadata {
            sdk,
            sdk_version: non_empty(facts.sdk_version),
            auto_instrumentation: Some(auto_instrumentation),
        },
    );

    let data = AwsData {
        account_id: call.account.or_else(|| non_empty(facts.account)),
        beanstalk,
        cloudwatch_logs,
        ecs,
        ec2,
        eks,
        xray,
        operation: call.operation,
        remote_region: call.region,
        request_id: call.request_id,
        queue_url: call.queue_url,
        table_name: call.table_name,
    };

    if data == AwsData::default() {
        (filtered, None)
    } else {
        (filtered, Some(data))
    }
}

/// Maps the resource's cloud platform to an X-Ray origin.
pub fn determine_aws_origin(resource: &Resource) -> Option<&'static str> {
    if resource.is_empty() {
        return None;
    }
    if let Some(provider) = resource.attribute(CLOUD_PROVIDER) {
        if provider.as_str() != Some(CLOUD_PROVIDER_AWS) {
            return None;
        }
    }

    match resource.attribute_str(CLOUD_PLATFORM)? {
        platforms::AWS_APP_RUNNER => Some(origins::APP_RUNNER),
        platforms::AWS_EKS => Some(origins::EKS),
        platforms::AWS_ELASTIC_BEANSTALK => Some(origins::ELASTIC_BEANSTALK),
        platforms::AWS_ECS => match resource.attribute_str(AWS_ECS_LAUNCHTYPE) {
            Some(AWS_ECS_LAUNCHTYPE_EC2) => Some(origins::ECS_EC2),
            Some(AWS_ECS_LAUNCHTYPE_FARGATE) => Some(origins::ECS_FARGATE),
            _ => Some(origins::ECS),
        },
        platforms::AWS_EC2 => Some(origins::EC2),
        platforms::AWS_LAMBDA => Some(origins::LAMBDA),
        _ => None,
    }
}

/// Reads a string or list-of-strings attribute.
fn string_list(value: &AttributeValue) -> Vec<String> {
    match value {
        AttributeValue::String(s) if !s.is_empty() => vec![s.clone()],
        AttributeValue::List(items) => items
            .iter()
            .filter_map(AttributeValue::as_non_empty_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn log_groups_from_arns(arns: &[String]) -> Vec<LogGroupMetadata> {
    arns.iter()
        .map(|arn| LogGroupMetadata {
            log_group: LOG_GROUP_ARN
                .captures(arn)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string()),
            arn: Some(arn.clone()),
        })
        .collect()
}

fn log_groups_from_names(names: &[String]) -> Vec<LogGroupMetadata> {
    names
        .iter()
        .map(|name| LogGroupMetadata {
            log_group: Some(name.clone()),
            arn: None,
        })
        .collect()
}
