//! Post-extraction pipeline.
//!
//! Runs after the cache lookup on every call, so its output is never cached.
//! Post-processors run stage by stage; a failing processor is recorded in the
//! result metadata as `processing_error_<name>`. Validators run last and fail fast.

use crate::core::config::{ExtractionConfig, PostProcessorConfig};
use crate::plugins::ProcessingStage;
use crate::plugins::registry::{get_post_processor_registry, get_validator_registry};
use crate::types::ExtractionResult;
use crate::{DocsieveError, Result};

fn processor_selected(pp_config: Option<&PostProcessorConfig>, name: &str) -> bool {
    let Some(config) = pp_config else {
        return true;
    };
    if let Some(enabled) = &config.enabled_processors {
        enabled.iter().any(|n| n == name)
    } else if let Some(disabled) = &config.disabled_processors {
        !disabled.iter().any(|n| n == name)
    } else {
        true
    }
}

pub async fn run_pipeline(mut result: ExtractionResult, config: &ExtractionConfig) -> Result<ExtractionResult> {
    let pp_config = config.postprocessor.as_ref();

    if pp_config.is_none_or(|c| c.enabled) {
        let registry = get_post_processor_registry();
        for stage in [ProcessingStage::Early, ProcessingStage::Middle, ProcessingStage::Late] {
            let processors = registry
                .read()
                .map_err(|e| DocsieveError::LockPoisoned(format!("Post-processor registry: {}", e)))?
                .get_for_stage(stage);

            for processor in processors {
                let name = processor.name();
                if !processor_selected(pp_config, name) || !processor.should_process(&result, config) {
                    continue;
                }
                if let Err(e) = processor.process(&mut result, config).await {
                    tracing::warn!(processor = name, error = %e, "Post-processor failed");
                    result.metadata.additional.insert(
                        format!("processing_error_{}", name),
                        serde_json::Value::String(e.to_string()),
                    );
                }
            }
        }
    }

    let validators = get_validator_registry()
        .read()
        .map_err(|e| DocsieveError::LockPoisoned(format!("Validator registry: {}", e)))?
        .get_all();
    for validator in validators {
        if validator.should_validate(&result, config) {
            validator.validate(&result, config).await?;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{
        Plugin, PostProcessor, Validator, register_post_processor, register_validator, unregister_post_processor,
        unregister_validator,
    };
    use async_trait::async_trait;
    use serial_test::serial;
    use std::sync::Arc;

    struct Suffix {
        name: &'static str,
        stage: ProcessingStage,
        suffix: &'static str,
    }

    impl Plugin for Suffix {
        fn name(&self) -> &str {
            self.name
        }
        fn version(&self) -> String {
            "1.0.0".to_string()
        }
        fn initialize(&self) -> Result<()> {
            Ok(())
        }
        fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl PostProcessor for Suffix {
        async fn process(&self, result: &mut ExtractionResult, _: &ExtractionConfig) -> Result<()> {
            if self.suffix.is_empty() {
                return Err(DocsieveError::Other("nothing to append".to_string()));
            }
            result.content.push_str(self.suffix);
            Ok(())
        }
        fn processing_stage(&self) -> ProcessingStage {
            self.stage
        }
    }

    struct RejectEmpty;

    impl Plugin for RejectEmpty {
        fn name(&self) -> &str {
            "pipeline-test-reject-empty"
        }
        fn version(&self) -> String {
            "1.0.0".to_string()
        }
        fn initialize(&self) -> Result<()> {
            Ok(())
        }
        fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl Validator for RejectEmpty {
        async fn validate(&self, result: &ExtractionResult, _: &ExtractionConfig) -> Result<()> {
            if result.content.is_empty() {
                return Err(DocsieveError::validation("empty content"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_stages_run_in_order_and_errors_are_recorded() {
        register_post_processor(
            Arc::new(Suffix {
                name: "pipeline-test-late",
                stage: ProcessingStage::Late,
                suffix: "!",
            }),
            50,
        )
        .unwrap();
        register_post_processor(
            Arc::new(Suffix {
                name: "pipeline-test-early",
                stage: ProcessingStage::Early,
                suffix: " world",
            }),
            50,
        )
        .unwrap();
        register_post_processor(
            Arc::new(Suffix {
                name: "pipeline-test-broken",
                stage: ProcessingStage::Middle,
                suffix: "",
            }),
            50,
        )
        .unwrap();

        let result = run_pipeline(ExtractionResult::new("hello", "text/plain"), &ExtractionConfig::default())
            .await
            .unwrap();

        for name in ["pipeline-test-late", "pipeline-test-early", "pipeline-test-broken"] {
            unregister_post_processor(name).unwrap();
        }

        assert_eq!(result.content, "hello world!");
        assert!(
            result
                .metadata
                .additional
                .contains_key("processing_error_pipeline-test-broken")
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_disabled_postprocessing_is_skipped() {
        register_post_processor(
            Arc::new(Suffix {
                name: "pipeline-test-skipped",
                stage: ProcessingStage::Early,
                suffix: "?",
            }),
            50,
        )
        .unwrap();

        let config = ExtractionConfig {
            postprocessor: Some(PostProcessorConfig {
                enabled: false,
                ..Default::default()
            }),
            ..Default::default()
        };
        let result = run_pipeline(ExtractionResult::new("plain", "text/plain"), &config)
            .await
            .unwrap();
        unregister_post_processor("pipeline-test-skipped").unwrap();

        assert_eq!(result.content, "plain");
    }

    #[test]
    fn test_processor_selection() {
        let only = PostProcessorConfig {
            enabled: true,
            enabled_processors: Some(vec!["a".to_string()]),
            disabled_processors: None,
        };
        assert!(processor_selected(Some(&only), "a"));
        assert!(!processor_selected(Some(&only), "b"));

        let except = PostProcessorConfig {
            enabled: true,
            enabled_processors: None,
            disabled_processors: Some(vec!["a".to_string()]),
        };
        assert!(!processor_selected(Some(&except), "a"));
        assert!(processor_selected(Some(&except), "b"));
        assert!(processor_selected(None, "anything"));
    }

    #[tokio::test]
    #[serial]
    async fn test_validator_failure_is_returned() {
        register_validator(Arc::new(RejectEmpty)).unwrap();
        let outcome = run_pipeline(ExtractionResult::new("", "text/plain"), &ExtractionConfig::default()).await;
        let ok = run_pipeline(ExtractionResult::new("x", "text/plain"), &ExtractionConfig::default()).await;
        unregister_validator("pipeline-test-reject-empty").unwrap();

        assert!(matches!(outcome, Err(DocsieveError::Validation { .. })));
        assert!(ok.is_ok());
    }
}
