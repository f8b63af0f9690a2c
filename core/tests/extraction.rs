use promptfit_core::extraction::{build_feedback, extract, validate};
use promptfit_core::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Deserialize, Debug, Clone, PartialEq)]
struct Finding {
    title: String,
    tags: Vec<String>,
}

fn finding_schema() -> SchemaNode {
    SchemaNode::object([
        ("title", SchemaNode::String),
        ("tags", SchemaNode::array(SchemaNode::String)),
    ])
}

fn research_schema() -> SchemaNode {
    SchemaNode::object([
        ("query", SchemaNode::String),
        ("depth", SchemaNode::Number),
        ("complete", SchemaNode::Boolean),
        (
            "learnings",
            SchemaNode::array(SchemaNode::object([
                ("text", SchemaNode::String),
                ("sources", SchemaNode::array(SchemaNode::String)),
                ("score", SchemaNode::Number),
            ])),
        ),
        ("raw", SchemaNode::Unknown),
    ])
}

#[tokio::test]
async fn test_report_scenario_from_fenced_reply() {
    let model = |_prompt: String| async {
        Ok::<_, std::io::Error>(
            "Based on the sources, here is the result.\n```json\n{\"title\": \"Report\", \"tags\": [\"a\",\"b\"]}\n```"
                .to_string(),
        )
    };

    let extractor = StructuredExtractor::new(finding_schema());
    let value = extractor.extract(&model, "Summarize").await.unwrap();
    assert_eq!(value, json!({ "title": "Report", "tags": ["a", "b"] }));

    let typed: Finding = extractor.extract_typed(&model, "Summarize").await.unwrap();
    assert_eq!(typed.title, "Report");
    assert_eq!(typed.tags, vec!["a", "b"]);
}

#[tokio::test]
async fn test_synthesized_example_echoed_back_validates() {
    // A model that answers with exactly the example it was shown.
    let schema = research_schema();
    let example = schema.example();
    let reply = serde_json::to_string_pretty(&example).unwrap();
    let model = move |_prompt: String| {
        let reply = reply.clone();
        async move { Ok::<_, std::io::Error>(reply) }
    };

    let value = extract(&model, &schema, "Research", None).await.unwrap();
    assert_eq!(value, example);
    assert!(validate(&schema, &value).is_empty());
}

#[tokio::test]
async fn test_top_level_array_example_echoed_back_validates() {
    let schema = SchemaNode::array(finding_schema());
    let example = schema.example();
    let reply = serde_json::to_string_pretty(&example).unwrap();
    let model = move |_prompt: String| {
        let reply = reply.clone();
        async move { Ok::<_, std::io::Error>(reply) }
    };

    let value = extract(&model, &schema, "List the findings", None).await.unwrap();
    assert_eq!(value, example);
    assert!(value.is_array());

    let wrapped = |_prompt: String| async {
        Ok::<_, std::io::Error>(
            "Found two:\n[{\"title\": \"A\", \"tags\": []}, {\"title\": \"B\", \"tags\": [\"x\"]}]"
                .to_string(),
        )
    };
    let typed: Vec<Finding> = StructuredExtractor::new(schema)
        .extract_typed(&wrapped, "List the findings")
        .await
        .unwrap();
    assert_eq!(typed.len(), 2);
    assert_eq!(typed[1].tags, vec!["x"]);
}

#[tokio::test]
async fn test_two_missing_and_one_mistyped_field() {
    let model = |_prompt: String| async {
        Ok::<_, std::io::Error>(
            "{\"depth\": \"two\", \"learnings\": [], \"raw\": null}".to_string(),
        )
    };

    let error = extract(&model, &research_schema(), "Research", None)
        .await
        .unwrap_err();

    let violations = error.violations();
    assert_eq!(violations.len(), 3, "violations: {violations:?}");
    let by_path: Vec<(&str, ValueKind, ValueKind)> = violations
        .iter()
        .map(|v| (v.path.as_str(), v.expected, v.actual))
        .collect();
    assert!(by_path.contains(&("/query", ValueKind::String, ValueKind::Missing)));
    assert!(by_path.contains(&("/depth", ValueKind::Number, ValueKind::String)));
    assert!(by_path.contains(&("/complete", ValueKind::Boolean, ValueKind::Missing)));
}

#[tokio::test]
async fn test_no_partial_matches_accepted() {
    let model = |_prompt: String| async {
        Ok::<_, std::io::Error>("{\"title\": \"Only title\"}".to_string())
    };
    let result = StructuredExtractor::new(finding_schema())
        .extract(&model, "p")
        .await;
    assert!(matches!(result, Err(ExtractionError::Validation { .. })));
}

#[tokio::test]
async fn test_parse_failure_is_not_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let model = move |_prompt: String| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::io::Error>("{\"title\": \"unterminated".to_string())
        }
    };

    let error = StructuredExtractor::new(finding_schema())
        .extract(&model, "p")
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(error.raw_response(), Some("{\"title\": \"unterminated"));
    assert!(error.to_string().starts_with("Failed to parse JSON response"));
}

#[tokio::test]
async fn test_outer_retry_loop_with_feedback() {
    // The caller owns retry policy; the second attempt sees the feedback.
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let model = move |prompt: String| {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt == 0 {
                Ok::<_, std::io::Error>("{\"title\": 42}".to_string())
            } else {
                assert!(prompt.contains("Attempt 1/3: JSON validation failed."));
                Ok("{\"title\": \"fixed\", \"tags\": []}".to_string())
            }
        }
    };

    let schema = finding_schema();
    let extractor = StructuredExtractor::new(schema.clone());
    let mut prompt = "Describe the finding".to_string();
    let mut outcome: Option<Value> = None;
    for attempt in 1..=3 {
        match extractor.extract(&model, &prompt).await {
            Ok(value) => {
                outcome = Some(value);
                break;
            }
            Err(error) => {
                let feedback = build_feedback(&error, &schema, attempt, 3).unwrap();
                prompt = format!("{prompt}\n\n{feedback}");
            }
        }
    }

    assert_eq!(outcome, Some(json!({ "title": "fixed", "tags": [] })));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_extractions_share_nothing() {
    let extractor = Arc::new(StructuredExtractor::new(finding_schema()));
    let model = |prompt: String| async move {
        let title = prompt.lines().next().unwrap_or_default().to_string();
        Ok::<_, std::io::Error>(json!({ "title": title, "tags": [] }).to_string())
    };

    let futures = (0..8).map(|i| {
        let extractor = extractor.clone();
        async move { extractor.extract(&model, &format!("branch-{i}")).await }
    });
    let results = futures::future::join_all(futures).await;

    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap()["title"], format!("branch-{i}"));
    }
}
