// Watch tables per release and version: (kind, item type, list type).
// A kind whose single items cannot be watched has no item type.

pub(crate) type Row = (&'static str, Option<&'static str>, &'static str);

pub(crate) const REL_1_19_V1BETA1_ALL: &[Row] = &[
    ("MutatingWebhookConfiguration", Some("MutatingWebhookConfiguration"), "MutatingWebhookConfigurationList"),
    ("ValidatingWebhookConfiguration", Some("ValidatingWebhookConfiguration"), "ValidatingWebhookConfigurationList"),
    ("CronJob", Some("CronJob"), "CronJobList"),
    ("CertificateSigningRequest", Some("CertificateSigningRequest"), "CertificateSigningRequestList"),
    ("Lease", Some("Lease"), "LeaseList"),
    ("EndpointSlice", Some("EndpointSlice"), "EndpointSliceList"),
    ("Event", None, "EventList"),
    ("IngressClass", Some("IngressClass"), "IngressClassList"),
    ("RuntimeClass", Some("RuntimeClass"), "RuntimeClassList"),
    ("PodDisruptionBudget", Some("PodDisruptionBudget"), "PodDisruptionBudgetList"),
    ("PodSecurityPolicy", Some("PodSecurityPolicy"), "PodSecurityPolicyList"),
    ("ClusterRoleBinding", Some("ClusterRoleBinding"), "ClusterRoleBindingList"),
    ("ClusterRole", Some("ClusterRole"), "ClusterRoleList"),
    ("RoleBinding", Some("RoleBinding"), "RoleBindingList"),
    ("Role", Some("Role"), "RoleList"),
    ("PriorityClass", Some("PriorityClass"), "PriorityClassList"),
    ("CSIDriver", Some("CSIDriver"), "CSIDriverList"),
    ("CSINode", Some("CSINode"), "CSINodeList"),
    ("StorageClass", Some("StorageClass"), "StorageClassList"),
    ("VolumeAttachment", Some("VolumeAttachment"), "VolumeAttachmentList"),
    ("CustomResourceDefinition", Some("CustomResourceDefinition"), "CustomResourceDefinitionList"),
    ("APIService", Some("APIService"), "APIServiceList"),
    ("Ingress", Some("Ingress"), "IngressList"),
];

pub(crate) const REL_1_19_V1BETA1_NAMESPACED: &[Row] = &[
    ("CronJob", Some("CronJob"), "CronJobList"),
    ("Lease", Some("Lease"), "LeaseList"),
    ("EndpointSlice", Some("EndpointSlice"), "EndpointSliceList"),
    ("Event", None, "EventList"),
    ("PodDisruptionBudget", Some("PodDisruptionBudget"), "PodDisruptionBudgetList"),
    ("RoleBinding", Some("RoleBinding"), "RoleBindingList"),
    ("Role", Some("Role"), "RoleList"),
    ("Ingress", Some("Ingress"), "IngressList"),
];

pub(crate) const REL_1_19_V1_ALL: &[Row] = &[
    ("Namespace", Some("Namespace"), "NamespaceList"),
    ("Node", Some("Node"), "NodeList"),
    ("Pod", Some("Pod"), "PodList"),
    ("ConfigMap", Some("ConfigMap"), "ConfigMapList"),
    ("Secret", Some("Secret"), "SecretList"),
    ("Service", Some("Service"), "ServiceList"),
    ("Event", Some("Event"), "EventList"),
    ("Deployment", Some("Deployment"), "DeploymentList"),
];

pub(crate) const REL_1_19_V1_NAMESPACED: &[Row] = &[
    ("Pod", Some("Pod"), "PodList"),
    ("ConfigMap", Some("ConfigMap"), "ConfigMapList"),
    ("Secret", Some("Secret"), "SecretList"),
    ("Service", Some("Service"), "ServiceList"),
    ("Event", Some("Event"), "EventList"),
    ("Deployment", Some("Deployment"), "DeploymentList"),
];
