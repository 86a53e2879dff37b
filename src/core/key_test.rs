use serde::Serialize;
use serde_json::json;

use super::*;
use crate::test_utils::pod;
use crate::Error;
use crate::FilterError;

#[test]
fn namespaced_objects_key_as_namespace_slash_name() {
    assert_eq!(meta_namespace_key(&pod("default", "web")).unwrap(), "default/web");
}

#[test]
fn cluster_scoped_objects_key_as_name() {
    let node = json!({ "kind": "Node", "metadata": { "name": "node-1" } });
    let blank_ns = json!({ "metadata": { "name": "node-2", "namespace": "" } });

    assert_eq!(meta_namespace_key(&node).unwrap(), "node-1");
    assert_eq!(meta_namespace_key(&blank_ns).unwrap(), "node-2");
}

#[test]
fn typed_objects_key_through_serde() {
    #[derive(Serialize)]
    struct Meta {
        name: &'static str,
        namespace: &'static str,
    }
    #[derive(Serialize)]
    struct Deployment {
        metadata: Meta,
    }

    let deployment = Deployment {
        metadata: Meta {
            name: "api",
            namespace: "team-a",
        },
    };

    assert_eq!(meta_namespace_key(&deployment).unwrap(), "team-a/api");
}

#[test]
fn objects_without_name_are_rejected() {
    for obj in [
        json!({ "kind": "Pod" }),
        json!({ "metadata": "flat" }),
        json!({ "metadata": { "namespace": "default" } }),
        json!({ "metadata": { "name": "" } }),
        json!("just a string"),
    ] {
        assert!(
            matches!(
                meta_namespace_key(&obj),
                Err(Error::Filter(FilterError::KeyDerivation(_)))
            ),
            "{obj}"
        );
    }
}

#[test]
fn deletion_key_of_live_object() {
    let deleted = DeletedObject::Object(pod("default", "web"));

    assert_eq!(deletion_handling_key(&deleted).unwrap(), "default/web");
}

#[test]
fn deletion_key_of_tombstone_is_the_carried_key() {
    let stale: DeletedObject<serde_json::Value> = DeletedObject::Tombstone {
        key: "default/gone".to_string(),
        object: None,
    };
    // the carried key wins even if the stale copy disagrees
    let renamed = DeletedObject::Tombstone {
        key: "default/old".to_string(),
        object: Some(pod("default", "new")),
    };

    assert_eq!(deletion_handling_key(&stale).unwrap(), "default/gone");
    assert_eq!(deletion_handling_key(&renamed).unwrap(), "default/old");
}
