//! Built-in model catalog for the 1.19 API release.
//!
//! Covers the core/apps `v1` kinds used day to day, every watchable kind of
//! the `v1beta1` surface, and the `unversioned` server `Info`. Larger model sets
//! are loaded from generated metadata with [`TypeRegistryBuilder::extend_json`].
//!
//! [`TypeRegistryBuilder::extend_json`]: crate::TypeRegistryBuilder::extend_json

use kmodel_core::{ElemShape, FieldShape, FieldSpec, RegistryResult, ScalarKind, TypeDescriptor};
use once_cell::sync::OnceCell;

use crate::registry::TypeRegistry;

pub const RELEASE_1_19: &str = "rel_1_19";

static RELEASE_1_19_REGISTRY: OnceCell<TypeRegistry> = OnceCell::new();

/// Process-wide registry of the 1.19 catalog, built on first use.
pub fn release_1_19() -> RegistryResult<&'static TypeRegistry> {
    RELEASE_1_19_REGISTRY.get_or_try_init(build_release_1_19)
}

/// Registry for a named release.
pub fn release(name: &str) -> RegistryResult<&'static TypeRegistry> {
    match name {
        RELEASE_1_19 => release_1_19(),
        other => Err(kmodel_core::RegistryError::UnknownVersion(other.to_string())),
    }
}

// ---- shape shorthands ----

fn string() -> FieldShape { FieldShape::Scalar(ScalarKind::Str) }
fn int() -> FieldShape { FieldShape::Scalar(ScalarKind::Int) }
fn boolean() -> FieldShape { FieldShape::Scalar(ScalarKind::Bool) }
fn int_or_str() -> FieldShape { FieldShape::Scalar(ScalarKind::IntOrStr) }
fn node(name: &str) -> FieldShape { FieldShape::Node(name.to_string()) }
fn list_of(name: &str) -> FieldShape { FieldShape::Seq(ElemShape::Node(name.to_string())) }
fn strings() -> FieldShape { FieldShape::Seq(ElemShape::Scalar(ScalarKind::Str)) }
fn raw_list() -> FieldShape { FieldShape::Seq(ElemShape::Raw) }
fn string_map() -> FieldShape { FieldShape::Map(ElemShape::Scalar(ScalarKind::Str)) }
fn raw() -> FieldShape { FieldShape::Raw }

fn f(name: &str, shape: FieldShape) -> FieldSpec { FieldSpec::new(name, shape) }

fn t(version: &str, name: &str, fields: Vec<FieldSpec>) -> TypeDescriptor {
    TypeDescriptor::new(version, name, fields)
}

/// Item and list document types for one resource kind.
fn resource(version: &str, group: &str, kind: &str, body: Vec<FieldSpec>) -> [TypeDescriptor; 2] {
    let mut fields = vec![f("api_version", string()), f("kind", string()), f("metadata", node("ObjectMeta"))];
    fields.extend(body);
    let item = t(version, kind, fields).document(group, kind);

    let list_kind = format!("{}List", kind);
    let list = t(version, &list_kind, vec![
        f("api_version", string()),
        f("items", list_of(kind)).required(),
        f("kind", string()),
        f("metadata", node("ListMeta")),
    ])
    .document(group, list_kind.clone());
    [item, list]
}

/// Object and list metadata, repeated in every version module.
fn meta_types(version: &str) -> Vec<TypeDescriptor> {
    vec![
        t(version, "ObjectMeta", vec![
            f("annotations", string_map()),
            f("cluster_name", string()),
            f("creation_timestamp", string()),
            f("deletion_grace_period_seconds", int()),
            f("deletion_timestamp", string()),
            f("finalizers", strings()),
            f("generate_name", string()),
            f("generation", int()),
            f("labels", string_map()),
            f("managed_fields", raw_list()),
            f("name", string()),
            f("namespace", string()),
            f("owner_references", list_of("OwnerReference")),
            f("resource_version", string()),
            f("self_link", string()),
            f("uid", string()),
        ]),
        t(version, "OwnerReference", vec![
            f("api_version", string()).required(),
            f("block_owner_deletion", boolean()),
            f("controller", boolean()),
            f("kind", string()).required(),
            f("name", string()).required(),
            f("uid", string()).required(),
        ]),
        t(version, "ListMeta", vec![
            f("continue_", string()),
            f("remaining_item_count", int()),
            f("resource_version", string()),
            f("self_link", string()),
        ]),
        t(version, "LabelSelector", vec![
            f("match_expressions", raw_list()),
            f("match_labels", string_map()),
        ]),
    ]
}

fn v1_types() -> Vec<TypeDescriptor> {
    const V: &str = "v1";
    let mut out = meta_types(V);

    out.extend(resource(V, "", "Pod", vec![f("spec", node("PodSpec")), f("status", node("PodStatus"))]));
    out.push(t(V, "PodSpec", vec![
        f("containers", list_of("Container")).required(),
        f("host_network", boolean()),
        f("init_containers", list_of("Container")),
        f("node_name", string()),
        f("node_selector", string_map()),
        f("restart_policy", string()),
        f("service_account_name", string()),
        f("termination_grace_period_seconds", int()),
        f("volumes", raw_list()),
    ]));
    out.push(t(V, "Container", vec![
        f("args", strings()),
        f("command", strings()),
        f("env", list_of("EnvVar")),
        f("image", string()),
        f("image_pull_policy", string()),
        f("name", string()).required(),
        f("ports", list_of("ContainerPort")),
        f("resources", node("ResourceRequirements")),
    ]));
    out.push(t(V, "EnvVar", vec![
        f("name", string()).required(),
        f("value", string()),
        f("value_from", raw()),
    ]));
    out.push(t(V, "ContainerPort", vec![
        f("container_port", int()).required(),
        f("host_port", int()),
        f("name", string()),
        f("protocol", string()),
    ]));
    out.push(t(V, "ResourceRequirements", vec![
        f("limits", string_map()),
        f("requests", string_map()),
    ]));
    out.push(t(V, "PodStatus", vec![
        f("conditions", list_of("PodCondition")),
        f("container_statuses", raw_list()),
        f("host_ip", string()).wire("hostIP"),
        f("message", string()),
        f("phase", string()),
        f("pod_ip", string()).wire("podIP"),
        f("reason", string()),
        f("start_time", string()),
    ]));
    out.push(t(V, "PodCondition", vec![
        f("last_probe_time", string()),
        f("last_transition_time", string()),
        f("message", string()),
        f("reason", string()),
        f("status", string()).required(),
        f("type_", string()).required(),
    ]));
    out.push(t(V, "PodTemplateSpec", vec![
        f("metadata", node("ObjectMeta")),
        f("spec", node("PodSpec")),
    ]));

    out.extend(resource(V, "", "Namespace", vec![f("spec", node("NamespaceSpec")), f("status", node("NamespaceStatus"))]));
    out.push(t(V, "NamespaceSpec", vec![f("finalizers", strings())]));
    out.push(t(V, "NamespaceStatus", vec![f("conditions", raw_list()), f("phase", string())]));

    out.extend(resource(V, "", "ConfigMap", vec![
        f("binary_data", string_map()),
        f("data", string_map()),
        f("immutable", boolean()),
    ]));
    out.extend(resource(V, "", "Secret", vec![
        f("data", string_map()),
        f("immutable", boolean()),
        f("string_data", string_map()),
        f("type_", string()),
    ]));

    out.extend(resource(V, "", "Service", vec![f("spec", node("ServiceSpec")), f("status", raw())]));
    out.push(t(V, "ServiceSpec", vec![
        f("cluster_ip", string()).wire("clusterIP"),
        f("cluster_ips", strings()).wire("clusterIPs"),
        f("external_ips", strings()).wire("externalIPs"),
        f("ports", list_of("ServicePort")),
        f("selector", string_map()),
        f("session_affinity", string()),
        f("type_", string()),
    ]));
    out.push(t(V, "ServicePort", vec![
        f("app_protocol", string()),
        f("name", string()),
        f("node_port", int()),
        f("port", int()).required(),
        f("protocol", string()),
        f("target_port", int_or_str()),
    ]));

    out.extend(resource(V, "", "Node", vec![f("spec", raw()), f("status", raw())]));

    out.extend(resource(V, "", "Event", vec![
        f("action", string()),
        f("count", int()),
        f("event_time", string()),
        f("first_timestamp", string()),
        f("involved_object", node("ObjectReference")).required(),
        f("last_timestamp", string()),
        f("message", string()),
        f("reason", string()),
        f("reporting_component", string()),
        f("reporting_instance", string()),
        f("source", raw()),
        f("type_", string()),
    ]));
    out.push(t(V, "ObjectReference", vec![
        f("api_version", string()),
        f("field_path", string()),
        f("kind", string()),
        f("name", string()),
        f("namespace", string()),
        f("resource_version", string()),
        f("uid", string()),
    ]));

    out.extend(resource(V, "apps", "Deployment", vec![f("spec", node("DeploymentSpec")), f("status", raw())]));
    out.push(t(V, "DeploymentSpec", vec![
        f("min_ready_seconds", int()),
        f("paused", boolean()),
        f("progress_deadline_seconds", int()),
        f("replicas", int()),
        f("revision_history_limit", int()),
        f("selector", node("LabelSelector")).required(),
        f("strategy", raw()),
        f("template", node("PodTemplateSpec")).required(),
    ]));
    out
}

fn v1beta1_types() -> Vec<TypeDescriptor> {
    const V: &str = "v1beta1";
    let mut out = meta_types(V);

    out.extend(resource(V, "admissionregistration.k8s.io", "MutatingWebhookConfiguration", vec![f("webhooks", raw_list())]));
    out.extend(resource(V, "admissionregistration.k8s.io", "ValidatingWebhookConfiguration", vec![f("webhooks", raw_list())]));

    out.extend(resource(V, "batch", "CronJob", vec![f("spec", node("CronJobSpec")), f("status", raw())]));
    out.push(t(V, "CronJobSpec", vec![
        f("concurrency_policy", string()),
        f("failed_jobs_history_limit", int()),
        f("job_template", raw()).required(),
        f("schedule", string()).required(),
        f("starting_deadline_seconds", int()),
        f("successful_jobs_history_limit", int()),
        f("suspend", boolean()),
    ]));

    out.extend(resource(V, "certificates.k8s.io", "CertificateSigningRequest", vec![f("spec", raw()).required(), f("status", raw())]));

    out.extend(resource(V, "coordination.k8s.io", "Lease", vec![f("spec", node("LeaseSpec"))]));
    out.push(t(V, "LeaseSpec", vec![
        f("acquire_time", string()),
        f("holder_identity", string()),
        f("lease_duration_seconds", int()),
        f("lease_transitions", int()),
        f("renew_time", string()),
    ]));

    out.extend(resource(V, "discovery.k8s.io", "EndpointSlice", vec![
        f("address_type", string()).required(),
        f("endpoints", raw_list()).required(),
        f("ports", raw_list()),
    ]));

    out.extend(resource(V, "events.k8s.io", "Event", vec![
        f("action", string()),
        f("deprecated_count", int()),
        f("deprecated_first_timestamp", string()),
        f("deprecated_last_timestamp", string()),
        f("deprecated_source", raw()),
        f("event_time", string()).required(),
        f("note", string()),
        f("reason", string()),
        f("regarding", raw()),
        f("related", raw()),
        f("reporting_controller", string()),
        f("reporting_instance", string()),
        f("series", raw()),
        f("type_", string()),
    ]));

    out.extend(resource(V, "networking.k8s.io", "IngressClass", vec![f("spec", raw())]));
    out.extend(resource(V, "networking.k8s.io", "Ingress", vec![f("spec", raw()), f("status", raw())]));

    out.extend(resource(V, "node.k8s.io", "RuntimeClass", vec![
        f("handler", string()).required(),
        f("overhead", raw()),
        f("scheduling", raw()),
    ]));

    out.extend(resource(V, "policy", "PodDisruptionBudget", vec![f("spec", node("PodDisruptionBudgetSpec")), f("status", raw())]));
    out.push(t(V, "PodDisruptionBudgetSpec", vec![
        f("max_unavailable", int_or_str()),
        f("min_available", int_or_str()),
        f("selector", node("LabelSelector")),
    ]));
    out.extend(resource(V, "policy", "PodSecurityPolicy", vec![f("spec", raw())]));

    const RBAC: &str = "rbac.authorization.k8s.io";
    out.extend(resource(V, RBAC, "ClusterRole", vec![f("aggregation_rule", raw()), f("rules", list_of("PolicyRule"))]));
    out.extend(resource(V, RBAC, "Role", vec![f("rules", list_of("PolicyRule"))]));
    out.extend(resource(V, RBAC, "ClusterRoleBinding", vec![
        f("role_ref", node("RoleRef")).required(),
        f("subjects", list_of("Subject")),
    ]));
    out.extend(resource(V, RBAC, "RoleBinding", vec![
        f("role_ref", node("RoleRef")).required(),
        f("subjects", list_of("Subject")),
    ]));
    out.push(t(V, "PolicyRule", vec![
        f("api_groups", strings()),
        f("non_resource_urls", strings()).wire("nonResourceURLs"),
        f("resource_names", strings()),
        f("resources", strings()),
        f("verbs", strings()).required(),
    ]));
    out.push(t(V, "RoleRef", vec![
        f("api_group", string()).required(),
        f("kind", string()).required(),
        f("name", string()).required(),
    ]));
    out.push(t(V, "Subject", vec![
        f("api_group", string()),
        f("kind", string()).required(),
        f("name", string()).required(),
        f("namespace", string()),
    ]));

    out.extend(resource(V, "scheduling.k8s.io", "PriorityClass", vec![
        f("description", string()),
        f("global_default", boolean()),
        f("preemption_policy", string()),
        f("value", int()).required(),
    ]));

    const STORAGE: &str = "storage.k8s.io";
    out.extend(resource(V, STORAGE, "CSIDriver", vec![f("spec", raw()).required()]));
    out.extend(resource(V, STORAGE, "CSINode", vec![f("spec", raw()).required()]));
    out.extend(resource(V, STORAGE, "StorageClass", vec![
        f("allow_volume_expansion", boolean()),
        f("allowed_topologies", raw_list()),
        f("mount_options", strings()),
        f("parameters", string_map()),
        f("provisioner", string()).required(),
        f("reclaim_policy", string()),
        f("volume_binding_mode", string()),
    ]));
    out.extend(resource(V, STORAGE, "VolumeAttachment", vec![f("spec", raw()).required(), f("status", raw())]));

    out.extend(resource(V, "apiextensions.k8s.io", "CustomResourceDefinition", vec![f("spec", raw()).required(), f("status", raw())]));
    out.extend(resource(V, "apiregistration.k8s.io", "APIService", vec![f("spec", raw()), f("status", raw())]));
    out
}

fn unversioned_types() -> Vec<TypeDescriptor> {
    let fields = [
        "build_date", "compiler", "git_commit", "git_tree_state", "git_version", "go_version", "major", "minor",
        "platform",
    ]
    .iter()
    .map(|name| f(name, string()).required())
    .collect();
    vec![t("unversioned", "Info", fields)]
}

fn build_release_1_19() -> RegistryResult<TypeRegistry> {
    TypeRegistry::builder()
        .extend(v1_types())
        .extend(v1beta1_types())
        .extend(unversioned_types())
        .alias("extensions/v1beta1", "Ingress", "Ingress")
        .alias("extensions/v1beta1", "IngressList", "IngressList")
        .build()
}
