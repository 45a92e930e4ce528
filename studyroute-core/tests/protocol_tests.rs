//! Wire names and request defaults

use std::str::FromStr;
use std::time::Duration;
use studyroute_core::audit::AuditStatus;
use studyroute_core::config::SecretString;
use studyroute_core::domain::CoursePlan;
use studyroute_core::protocol::{CallRequest, Provider, TaskType};
use studyroute_core::providers::TransportRequest;
use test_case::test_case;

#[test_case(TaskType::CourseParse, "course_parse")]
#[test_case(TaskType::PracticeGenerate, "practice_gen")]
#[test_case(TaskType::PracticeGrade, "practice_grade")]
#[test_case(TaskType::CuratorMessage, "curator_msg")]
fn test_task_type_wire_names(task_type: TaskType, wire: &str) {
    assert_eq!(task_type.to_string(), wire);
    assert_eq!(TaskType::from_str(wire).unwrap(), task_type);
    assert_eq!(serde_json::to_value(task_type).unwrap(), wire);
}

#[test]
fn test_closed_enums_reject_unknown_names() {
    let err = TaskType::from_str("summarize").unwrap_err();
    assert_eq!(err.to_string(), "unknown task type: 'summarize'");
    assert!(Provider::from_str("openai").is_err());
    assert!(serde_json::from_str::<Provider>("\"OpenRouter\"").is_err());
    assert!(AuditStatus::from_str("ok").is_err());
}

#[test]
fn test_provider_and_status_wire_names() {
    assert_eq!(serde_json::to_value(Provider::OpenRouter).unwrap(), "openrouter");
    assert_eq!(Provider::from_str("anthropic").unwrap(), Provider::Anthropic);
    for status in AuditStatus::ALL {
        assert_eq!(AuditStatus::from_str(status.as_str()).unwrap(), status);
    }
    assert_eq!(AuditStatus::ProviderUnavailable.as_str(), "provider_unavailable");
}

#[test]
fn test_call_request_defaults_and_builders() {
    let request = CallRequest::<CoursePlan>::new(TaskType::CourseParse, "sys", "usr", "corr");
    assert_eq!(request.max_output_tokens, 2048);
    assert!((request.temperature - 0.2).abs() < f32::EPSILON);
    assert_eq!(request.course_id, None);
    assert_eq!(request.module_id, None);

    let request = request
        .with_course_id("c")
        .with_module_id("m")
        .with_max_output_tokens(128)
        .with_temperature(0.9);
    assert_eq!(request.course_id.as_deref(), Some("c"));
    assert_eq!(request.module_id.as_deref(), Some("m"));
    assert_eq!(request.max_output_tokens, 128);
}

#[test]
fn test_api_key_never_appears_in_debug_output() {
    let request = TransportRequest {
        model: "claude-3-5-sonnet-latest".to_string(),
        api_key: SecretString::new("sk-ant-super-secret-value"),
        system_prompt: "sys".to_string(),
        user_prompt: "usr".to_string(),
        max_output_tokens: 16,
        temperature: 0.0,
        timeout: Duration::from_secs(1),
    };

    let debug = format!("{:?}", request);
    assert!(!debug.contains("super-secret"), "{}", debug);
    assert!(!request.api_key.to_string().contains("super-secret"));
    assert_eq!(request.api_key.expose_secret(), "sk-ant-super-secret-value");
}
