//! Environment-driven defaults
//!
//! Kept in its own test binary because it mutates process environment
//! variables read by other tests.

use studyroute_core::audit::AuditPayloadPolicy;
use studyroute_core::config::env::{
    ANTHROPIC_MODEL_ENV_VAR, OPENROUTER_MODEL_ENV_VAR, AUDIT_STORE_OUTPUT_ENV_VAR,
};
use studyroute_core::keys::{EnvKeyStore, KeyStore};
use studyroute_core::protocol::{Provider, TaskType};
use studyroute_core::providers::RoutingPolicy;

#[test]
fn test_environment_overrides() {
    std::env::set_var(ANTHROPIC_MODEL_ENV_VAR, "  claude-3-5-haiku-latest ");
    std::env::set_var(OPENROUTER_MODEL_ENV_VAR, "   ");

    let policy = RoutingPolicy::from_env().unwrap();
    assert_eq!(
        policy.resolve(TaskType::PracticeGrade).unwrap().model,
        "claude-3-5-haiku-latest"
    );
    // Blank overrides fall back to the built-in model
    assert_eq!(
        policy.resolve(TaskType::PracticeGenerate).unwrap().model,
        "openai/gpt-4o-mini"
    );

    std::env::remove_var(ANTHROPIC_MODEL_ENV_VAR);
    std::env::remove_var(OPENROUTER_MODEL_ENV_VAR);

    for (raw, expected) in [("false", false), ("0", false), ("No", false), ("true", true)] {
        std::env::set_var(AUDIT_STORE_OUTPUT_ENV_VAR, raw);
        assert_eq!(AuditPayloadPolicy::from_env().store_output, expected, "{}", raw);
    }
    std::env::remove_var(AUDIT_STORE_OUTPUT_ENV_VAR);
    assert!(AuditPayloadPolicy::from_env().store_output);

    std::env::set_var(EnvKeyStore::env_var(Provider::OpenRouter), " sk-or-env ");
    let key = EnvKeyStore::new().get_key(Provider::OpenRouter).unwrap().unwrap();
    assert_eq!(key.expose_secret(), "sk-or-env");
    std::env::remove_var(EnvKeyStore::env_var(Provider::OpenRouter));
    assert!(EnvKeyStore::new().get_key(Provider::OpenRouter).unwrap().is_none());
}
