use apispec_core::{
    reconcile, DescriptionCatalog, Document, FunctionRegistry, LandmarkIndex, ReconcileOptions,
    Reconciliation,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const FUNCTIONS: &str = r#"{
    "paper": [
        {"get": true, "paper": true, "tags": ["Submissions"], "order": 1,
         "response": "paper", "response_info": {"paper": {"type": "object"}}},
        {"post": true, "paper": true, "tags": ["Submissions"],
         "parameters": "?=json ?@upload", "response": "?paper +?valid"}
    ],
    "review": {"get": true, "paper": true, "parameters": "r", "tags": ["Reviews"]},
    "search": {"get": true, "parameters": "q ?t ?sort", "tags": ["Search"],
               "response": "ids", "response_info": {"ids": "[pid]"}},
    "comment": {"parameters": "p ?=q @c", "tags": ["Comments"]},
    "whoami": {"get": true, "tags": ["Profile"], "response": "email",
               "description": "Identify the current user."},
    "oldwhoami": {"alias": "whoami"}
}"#;

const DESCRIPTIONS: &str = "# info\n\
    > HotCRP conference API\n\
    \n\
    # get /{p}/paper\n\
    > Fetch a submission\n\
    \n\
    # Reviews\n\
    Review management.\n\
    \n\
    # parameter p.path\n\
    The submission.\n";

fn registry() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    registry.load_json_str(FUNCTIONS).unwrap();
    registry
}

fn catalog() -> DescriptionCatalog {
    let mut catalog = DescriptionCatalog::new();
    catalog.add_markdown(DESCRIPTIONS);
    catalog
}

fn fresh(options: ReconcileOptions) -> Reconciliation {
    reconcile(&registry(), &catalog(), options, None, None).unwrap()
}

fn merge_text(text: &str, options: ReconcileOptions) -> Reconciliation {
    let doc = Document::parse(text).unwrap();
    let index = LandmarkIndex::build("openapi.json", text);
    reconcile(&registry(), &catalog(), options, Some(doc), Some(&index)).unwrap()
}

fn shown(out: &Reconciliation) -> Vec<String> {
    out.diagnostics.iter().map(|d| d.to_string()).collect()
}

fn as_value(out: &Reconciliation) -> Value {
    serde_json::to_value(&out.document).unwrap()
}

#[test]
fn test_second_run_is_byte_identical() {
    let first = fresh(ReconcileOptions::default());
    assert_eq!(shown(&first), Vec::<String>::new());
    let text = first.document.to_json_pretty().unwrap();

    let second = merge_text(&text, ReconcileOptions::default());
    assert_eq!(shown(&second), Vec::<String>::new());
    assert_eq!(second.document.to_json_pretty().unwrap(), text);

    let sorted = merge_text(
        &text,
        ReconcileOptions {
            sort: true,
            ..ReconcileOptions::default()
        },
    );
    assert_eq!(sorted.document.to_json_pretty().unwrap(), text);
}

#[test]
fn test_body_parameters_and_content_type() {
    let doc = as_value(&fresh(ReconcileOptions::default()));
    let post = &doc["paths"]["/{p}/comment"]["post"];
    let content = &post["requestBody"]["content"];
    assert_eq!(
        content.as_object().unwrap().keys().collect::<Vec<_>>(),
        vec!["multipart/form-data"]
    );
    assert_eq!(
        content["multipart/form-data"]["schema"],
        json!({
            "type": "object",
            "required": ["c"],
            "properties": {
                "q": {"$ref": "#/components/schemas/search_string"},
                "c": {"$ref": "#/components/schemas/cid"}
            }
        })
    );
    assert_eq!(
        post["parameters"],
        json!([{"$ref": "#/components/parameters/p.path"}])
    );
}

#[test]
fn test_paper_scoped_get_only_path() {
    let doc = as_value(&fresh(ReconcileOptions::default()));
    let review = doc["paths"]["/{p}/review"].as_object().unwrap();
    assert_eq!(review.keys().collect::<Vec<_>>(), vec!["get"]);
    assert_eq!(
        review["get"]["parameters"],
        json!([
            {"$ref": "#/components/parameters/p.path"},
            {"$ref": "#/components/parameters/r"}
        ])
    );
    assert!(doc["paths"].get("/review").is_none());

    let paper = doc["paths"]["/{p}/paper"].as_object().unwrap();
    assert_eq!(paper.keys().collect::<Vec<_>>(), vec!["get", "post"]);
}

#[test]
fn test_tag_conflicts_reported_unless_overridden() {
    let existing = r#"{
    "openapi": "3.1.0",
    "info": {"title": "HotCRP", "version": "0.1"},
    "paths": {
        "/whoami": {
            "get": {"tags": ["Session"]}
        }
    }
}"#;
    let out = merge_text(existing, ReconcileOptions::default());
    let doc = as_value(&out);
    assert_eq!(doc["paths"]["/whoami"]["get"]["tags"], json!(["Session"]));
    assert!(shown(&out).contains(
        &"openapi.json:6:29: /whoami.get: tags differ\n  input [\"Session\"], expected [\"Profile\"]"
            .to_string()
    ));

    let out = merge_text(
        existing,
        ReconcileOptions {
            override_tags: true,
            ..ReconcileOptions::default()
        },
    );
    let doc = as_value(&out);
    assert_eq!(doc["paths"]["/whoami"]["get"]["tags"], json!(["Profile"]));
    assert!(!shown(&out).iter().any(|d| d.contains("tags differ")));
}

#[test]
fn test_undeclared_response_uses_shared_schemas() {
    let doc = as_value(&fresh(ReconcileOptions::default()));
    let responses = &doc["paths"]["/{p}/review"]["get"]["responses"];
    assert_eq!(
        responses,
        &json!({
            "200": {
                "description": "",
                "content": {"application/json": {
                    "schema": {"$ref": "#/components/schemas/minimal_response"}
                }}
            },
            "default": {
                "description": "",
                "content": {"application/json": {
                    "schema": {"$ref": "#/components/schemas/error_response"}
                }}
            }
        })
    );
}

#[test]
fn test_shared_parameter_registered_once() {
    let doc = as_value(&fresh(ReconcileOptions::default()));
    let params = doc["components"]["parameters"].as_object().unwrap();
    assert_eq!(
        params.keys().filter(|k| k.starts_with("p")).collect::<Vec<_>>(),
        vec!["p.path"]
    );
    assert_eq!(
        params["p.path"],
        json!({
            "name": "p", "in": "path", "required": true,
            "description": "The submission.",
            "schema": {"$ref": "#/components/schemas/pid"}
        })
    );
}

#[test]
fn test_descriptions_and_metadata() {
    let doc = as_value(&fresh(ReconcileOptions::default()));
    assert_eq!(doc["openapi"], json!("3.1.0"));
    assert_eq!(
        doc["info"],
        json!({"title": "HotCRP", "version": "0.1", "summary": "HotCRP conference API"})
    );
    assert_eq!(
        doc["paths"]["/{p}/paper"]["get"]["summary"],
        json!("Fetch a submission")
    );
    assert!(doc["paths"]["/{p}/paper"]["post"].get("summary").is_none());
    assert_eq!(
        doc["paths"]["/whoami"]["get"]["description"],
        json!("Identify the current user.")
    );
    assert_eq!(doc["paths"]["/whoami"]["get"]["summary"], json!("/whoami"));
    assert_eq!(
        doc["tags"],
        json!([
            {"name": "Submissions"},
            {"name": "Search"},
            {"name": "Reviews", "description": "Review management."},
            {"name": "Comments"},
            {"name": "Profile"}
        ])
    );
}

#[test]
fn test_fresh_documents_are_sorted() {
    let doc = as_value(&fresh(ReconcileOptions::default()));
    let paths: Vec<&String> = doc["paths"].as_object().unwrap().keys().collect();
    assert_eq!(
        paths,
        vec!["/{p}/paper", "/search", "/{p}/review", "/{p}/comment", "/whoami"]
    );
}

#[test]
fn test_response_fields_follow_each_descriptor() {
    let doc = as_value(&fresh(ReconcileOptions::default()));
    let ok = |method: &str| {
        doc["paths"]["/{p}/paper"][method]["responses"]["200"]["content"]["application/json"]
            ["schema"]["allOf"][1]
            .clone()
    };
    assert_eq!(
        ok("get"),
        json!({
            "type": "object",
            "required": ["paper"],
            "properties": {"paper": {"type": "object"}}
        })
    );
    assert_eq!(
        ok("post"),
        json!({"type": "object", "properties": {"paper": {}, "valid": {}}})
    );

    let search = &doc["paths"]["/search"]["get"]["responses"]["200"]["content"]["application/json"]
        ["schema"]["allOf"][1]["properties"]["ids"];
    assert_eq!(
        search,
        &json!({"type": "array", "items": {"$ref": "#/components/schemas/pid"}})
    );
}

#[test]
fn test_unknown_inputs_are_reported_and_kept() {
    let existing = r#"{
    "paths": {
        "/retired": {"get": {"summary": "Gone"}},
        "/whoami": {
            "get": {"tags": ["Profile"]},
            "post": {"summary": "Never declared"},
            "delete": {}
        }
    }
}"#;
    let out = merge_text(existing, ReconcileOptions::default());
    let diags = shown(&out);
    assert!(diags.contains(&"openapi.json:3:21: input path /retired unknown".to_string()));
    assert!(diags.contains(&"openapi.json:6:21: input operation post /whoami unknown".to_string()));
    assert!(
        diags.contains(&"openapi.json:7:23: input operation delete /whoami unknown".to_string())
    );

    let doc = as_value(&out);
    assert_eq!(doc["paths"]["/retired"]["get"]["summary"], json!("Gone"));
    assert_eq!(doc["paths"]["/whoami"]["delete"], json!({}));
    let paths: Vec<&str> = doc["paths"].as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(paths[..2].to_vec(), vec!["/retired", "/whoami"]);
}

#[test]
fn test_existing_hand_written_content_survives() {
    let existing = r##"{
    "openapi": "3.0.3",
    "info": {"title": "My HotCRP", "version": "3.0", "x-logo": {"url": "logo.png"}},
    "servers": [{"url": "https://example.org/api"}],
    "paths": {
        "/{p}/review": {
            "get": {
                "operationId": "getReview",
                "tags": ["Reviews"],
                "parameters": [
                    {"$ref": "#/components/parameters/p.path"},
                    {"$ref": "#/components/parameters/r"}
                ],
                "x-rate-limit": 10
            }
        }
    },
    "components": {
        "securitySchemes": {"token": {"type": "http", "scheme": "bearer"}}
    }
}"##;
    let out = merge_text(existing, ReconcileOptions::default());
    let doc = as_value(&out);
    assert_eq!(doc["openapi"], json!("3.1.0"));
    assert_eq!(doc["info"]["title"], json!("My HotCRP"));
    assert_eq!(doc["info"]["x-logo"], json!({"url": "logo.png"}));
    assert_eq!(doc["servers"][0]["url"], json!("https://example.org/api"));
    assert_eq!(
        doc["components"]["securitySchemes"]["token"]["scheme"],
        json!("bearer")
    );
    let get = &doc["paths"]["/{p}/review"]["get"];
    assert_eq!(get["operationId"], json!("getReview"));
    assert_eq!(get["x-rate-limit"], json!(10));
    assert_eq!(get["summary"], json!("/{p}/review"));
}

#[test]
fn test_operation_keys_settle_after_first_merge() {
    let existing = r##"{
    "paths": {
        "/{p}/review": {
            "get": {
                "x-rate-limit": 10,
                "parameters": [
                    {"$ref": "#/components/parameters/p.path"},
                    {"$ref": "#/components/parameters/r"}
                ],
                "operationId": "getReview",
                "tags": ["Reviews"]
            }
        }
    }
}"##;
    let first = merge_text(existing, ReconcileOptions::default());
    let doc = as_value(&first);
    let keys: Vec<&String> = doc["paths"]["/{p}/review"]["get"]
        .as_object()
        .unwrap()
        .keys()
        .collect();
    let position = |key: &str| keys.iter().position(|k| *k == key).unwrap();
    assert_eq!(keys[0], "tags");
    assert!(position("operationId") < position("parameters"));
    assert_eq!(keys[keys.len() - 1], "x-rate-limit");

    let text = first.document.to_json_pretty().unwrap();
    let second = merge_text(&text, ReconcileOptions::default());
    assert_eq!(second.document.to_json_pretty().unwrap(), text);
}
