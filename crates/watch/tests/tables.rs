use kmodel_schema::{release_1_19, RELEASE_1_19};
use kmodel_watch::{WatchCapability, WatchRegistry};

#[test]
fn v1beta1_lookups() {
    let reg = WatchRegistry::for_version(RELEASE_1_19, "v1beta1").unwrap();
    assert_eq!(
        reg.lookup("CronJob"),
        Some(WatchCapability { kind: "CronJob", item_type: Some("CronJob"), list_type: "CronJobList", namespace_required: true })
    );

    let event = reg.lookup("Event").unwrap();
    assert_eq!(event.item_type, None);
    assert_eq!(event.list_type, "EventList");
    assert!(event.namespace_required);
    assert_eq!(reg.lookup("EventList"), Some(event));

    let crd = reg.lookup("CustomResourceDefinition").unwrap();
    assert!(!crd.namespace_required);
    assert!(reg.watchable("ClusterRole"));
    assert!(!reg.namespaced("ClusterRole"));
    assert!(reg.namespaced("Ingress"));

    assert!(reg.lookup("Pod").is_none());
    assert!(reg.lookup("List").is_none());
    assert_eq!(reg.kinds().len(), 23);
}

#[test]
fn v1_lookups() {
    let reg = WatchRegistry::for_version(RELEASE_1_19, "v1").unwrap();
    assert!(reg.namespaced("Pod"));
    assert!(reg.watchable("Node"));
    assert!(!reg.namespaced("Namespace"));
    assert_eq!(reg.lookup("Deployment").and_then(|c| c.item_type), Some("Deployment"));
    assert!(WatchRegistry::for_version(RELEASE_1_19, "v2").is_none());
    assert!(WatchRegistry::for_version("rel_1_16", "v1").is_none());
}

#[test]
fn every_table_agrees_with_the_type_catalog() {
    let types = release_1_19().unwrap();
    for reg in WatchRegistry::all() {
        reg.verify(types).unwrap();
        for cap in reg.capabilities() {
            if cap.namespace_required {
                let full = reg.lookup(cap.kind).unwrap();
                assert_eq!((full.item_type, full.list_type), (cap.item_type, cap.list_type));
            }
        }
    }
}

#[test]
fn capabilities_serialize_for_tooling() {
    let reg = WatchRegistry::for_version(RELEASE_1_19, "v1").unwrap();
    let pod = reg.lookup("Pod").unwrap();
    assert_eq!(
        serde_json::to_value(pod).unwrap(),
        serde_json::json!({"kind": "Pod", "item_type": "Pod", "list_type": "PodList", "namespace_required": true})
    );
}
