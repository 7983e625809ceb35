//! Constants for the xray-segment-translator package.
//!
//! This file centralizes all constants to ensure consistency across the codebase
//! and provide a single source of truth for configuration parameters and the
//! semantic-convention keys the translator recognizes.

/// Environment variable names for configuration.
pub mod env_vars {
    /// Comma-separated list of attribute keys to index as X-Ray annotations.
    pub const INDEXED_ATTRIBUTES: &str = "XRAY_SEGMENT_INDEXED_ATTRIBUTES";

    /// Index every scalar attribute as an annotation ("true" or "1").
    pub const INDEX_ALL_ATTRIBUTES: &str = "XRAY_SEGMENT_INDEX_ALL_ATTRIBUTES";

    /// Maximum number of encode buffers kept by the writer pool.
    pub const WRITER_POOL_SIZE: &str = "XRAY_SEGMENT_WRITER_POOL_SIZE";
}

/// Default values for configuration parameters.
pub mod defaults {
    /// Default number of pooled encode buffers.
    pub const WRITER_POOL_SIZE: usize = 2048;

    /// Initial capacity of a freshly allocated encode buffer.
    pub const WRITER_BUFFER_CAPACITY: usize = 2048;

    /// Segment name used when nothing valid survives sanitization.
    pub const SEGMENT_NAME: &str = "span";

    /// Maximum length of a segment name, in characters.
    pub const MAX_SEGMENT_NAME_LENGTH: usize = 200;

    /// Prefix applied to resource attribute keys stored on a segment.
    pub const RESOURCE_ATTRIBUTE_PREFIX: &str = "otel.resource.";

    /// Metadata namespace used for all stored attributes.
    pub const METADATA_NAMESPACE: &str = "default";
}

/// X-Ray trace id layout.
pub mod trace_id {
    /// Fixed length of an X-Ray trace id ("1-" + 8 + "-" + 24).
    pub const LENGTH: usize = 35;

    /// Oldest accepted embedded epoch, relative to now (28 days).
    pub const MAX_AGE_SECS: i64 = 60 * 60 * 24 * 28;

    /// Furthest accepted embedded epoch into the future (5 minutes).
    pub const MAX_SKEW_SECS: i64 = 60 * 5;
}

/// Attribute keys read by the translator.
///
/// These follow the OpenTelemetry semantic conventions the X-Ray format was
/// mapped against (HTTP/net conventions before the 1.20 renames), plus the
/// `aws.*` keys emitted by the AWS SDK instrumentations.
pub mod attributes {
    pub const HTTP_METHOD: &str = "http.method";
    pub const HTTP_CLIENT_IP: &str = "http.client_ip";
    pub const HTTP_USER_AGENT: &str = "http.user_agent";
    pub const HTTP_STATUS_CODE: &str = "http.status_code";
    pub const HTTP_STATUS_TEXT: &str = "http.status_text";
    pub const HTTP_URL: &str = "http.url";
    pub const HTTP_SCHEME: &str = "http.scheme";
    pub const HTTP_HOST: &str = "http.host";
    pub const HTTP_TARGET: &str = "http.target";
    pub const HTTP_SERVER_NAME: &str = "http.server_name";

    pub const NET_HOST_PORT: &str = "net.host.port";
    pub const NET_HOST_NAME: &str = "net.host.name";
    pub const NET_PEER_NAME: &str = "net.peer.name";
    pub const NET_PEER_PORT: &str = "net.peer.port";
    pub const NET_PEER_IP: &str = "net.peer.ip";
    pub const HOST_NAME: &str = "host.name";

    pub const MESSAGE_TYPE: &str = "message.type";
    pub const MESSAGE_TYPE_RECEIVED: &str = "RECEIVED";
    pub const MESSAGING_PAYLOAD_SIZE: &str = "messaging.message_payload_size_bytes";

    pub const PEER_SERVICE: &str = "peer.service";
    pub const RPC_SYSTEM: &str = "rpc.system";
    pub const RPC_SYSTEM_AWS_API: &str = "aws-api";
    pub const RPC_SERVICE: &str = "rpc.service";
    pub const RPC_METHOD: &str = "rpc.method";

    pub const DB_SYSTEM: &str = "db.system";
    pub const DB_NAME: &str = "db.name";
    pub const DB_CONNECTION_STRING: &str = "db.connection_string";
    pub const DB_STATEMENT: &str = "db.statement";
    pub const DB_USER: &str = "db.user";

    pub const ENDUSER_ID: &str = "enduser.id";

    pub const EXCEPTION_EVENT_NAME: &str = "exception";
    pub const EXCEPTION_TYPE: &str = "exception.type";
    pub const EXCEPTION_MESSAGE: &str = "exception.message";
    pub const EXCEPTION_STACKTRACE: &str = "exception.stacktrace";

    pub const SERVICE_NAME: &str = "service.name";
    pub const SERVICE_NAMESPACE: &str = "service.namespace";
    pub const SERVICE_INSTANCE_ID: &str = "service.instance.id";
    pub const SERVICE_VERSION: &str = "service.version";

    pub const CLOUD_PROVIDER: &str = "cloud.provider";
    pub const CLOUD_PROVIDER_AWS: &str = "aws";
    pub const CLOUD_PLATFORM: &str = "cloud.platform";
    pub const CLOUD_ACCOUNT_ID: &str = "cloud.account.id";
    pub const CLOUD_AVAILABILITY_ZONE: &str = "cloud.availability_zone";

    pub const HOST_ID: &str = "host.id";
    pub const HOST_TYPE: &str = "host.type";
    pub const HOST_IMAGE_ID: &str = "host.image.id";

    pub const CONTAINER_NAME: &str = "container.name";
    pub const CONTAINER_ID: &str = "container.id";
    pub const CONTAINER_IMAGE_TAG: &str = "container.image.tag";

    pub const K8S_CLUSTER_NAME: &str = "k8s.cluster.name";
    pub const K8S_POD_NAME: &str = "k8s.pod.name";

    pub const TELEMETRY_SDK_NAME: &str = "telemetry.sdk.name";
    pub const TELEMETRY_SDK_LANGUAGE: &str = "telemetry.sdk.language";
    pub const TELEMETRY_SDK_VERSION: &str = "telemetry.sdk.version";
    pub const TELEMETRY_AUTO_VERSION: &str = "telemetry.auto.version";

    pub const AWS_ECS_CLUSTER_ARN: &str = "aws.ecs.cluster.arn";
    pub const AWS_ECS_CONTAINER_ARN: &str = "aws.ecs.container.arn";
    pub const AWS_ECS_TASK_ARN: &str = "aws.ecs.task.arn";
    pub const AWS_ECS_TASK_FAMILY: &str = "aws.ecs.task.family";
    pub const AWS_ECS_LAUNCHTYPE: &str = "aws.ecs.launchtype";
    pub const AWS_ECS_LAUNCHTYPE_EC2: &str = "ec2";
    pub const AWS_ECS_LAUNCHTYPE_FARGATE: &str = "fargate";
    pub const AWS_LOG_GROUP_NAMES: &str = "aws.log.group.names";
    pub const AWS_LOG_GROUP_ARNS: &str = "aws.log.group.arns";

    pub const AWS_SERVICE: &str = "aws.service";
    pub const AWS_OPERATION: &str = "aws.operation";
    pub const AWS_ACCOUNT_ID: &str = "aws.account_id";
    pub const AWS_REGION: &str = "aws.region";
    pub const AWS_REQUEST_ID: &str = "aws.request_id";
    pub const AWS_REQUEST_ID_ALT: &str = "aws.requestId";
    pub const AWS_QUEUE_URL: &str = "aws.queue_url";
    pub const AWS_QUEUE_URL_ALT: &str = "aws.queue.url";
    pub const AWS_TABLE_NAME: &str = "aws.table_name";
    pub const AWS_TABLE_NAME_ALT: &str = "aws.table.name";
}

/// `cloud.platform` values recognized for AWS.
pub mod platforms {
    pub const AWS_EC2: &str = "aws_ec2";
    pub const AWS_ECS: &str = "aws_ecs";
    pub const AWS_EKS: &str = "aws_eks";
    pub const AWS_ELASTIC_BEANSTALK: &str = "aws_elastic_beanstalk";
    pub const AWS_APP_RUNNER: &str = "aws_app_runner";
    pub const AWS_LAMBDA: &str = "aws_lambda";
}

/// Values accepted by X-Ray for the segment `origin` field.
pub mod origins {
    pub const EC2: &str = "AWS::EC2::Instance";
    pub const ECS: &str = "AWS::ECS::Container";
    pub const ECS_EC2: &str = "AWS::ECS::EC2";
    pub const ECS_FARGATE: &str = "AWS::ECS::Fargate";
    pub const ELASTIC_BEANSTALK: &str = "AWS::ElasticBeanstalk::Environment";
    pub const EKS: &str = "AWS::EKS::Container";
    pub const APP_RUNNER: &str = "AWS::AppRunner::Service";
    pub const LAMBDA: &str = "AWS::Lambda::Function";
}
