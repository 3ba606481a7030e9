//! Logging plugin.
//!
//! Contributes a `bootstrap` step that installs the global `tracing`
//! subscriber, so every later step logs through it. Filtering follows
//! `RUST_LOG` unless an explicit directive set is configured.

use trellis_kernel::plugin::Plugin;
use trellis_kernel::step::OperationStep;
use trellis_ops::error::BoxedError;
use tracing_subscriber::EnvFilter;

use crate::lifecycle::BOOTSTRAP;

/// Installs the global tracing subscriber from a `bootstrap` step.
#[derive(Debug, Default)]
pub struct LoggingPlugin {
    filter: Option<String>,
}

impl LoggingPlugin {
    /// Creates the plugin with `RUST_LOG`-driven filtering.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the filter with an explicit directive set
    /// (e.g. `"info,trellis_kernel=debug"`).
    #[must_use]
    pub fn with_filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = Some(directives.into());
        self
    }

    fn install(filter: Option<&str>) -> Result<(), BoxedError> {
        let filter = match filter {
            Some(directives) => EnvFilter::new(directives),
            None => EnvFilter::from_default_env(),
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(Into::into)
    }
}

impl Plugin for LoggingPlugin {
    fn name(&self) -> &str {
        "logging"
    }

    fn version(&self) -> &str {
        "0.1.0"
    }

    fn operation_steps(&self, operation: &str) -> Vec<OperationStep> {
        match operation {
            "bootstrap" => {
                let filter = self.filter.clone();
                vec![
                    BOOTSTRAP
                        .implementation("logging.install", move |&()| {
                            LoggingPlugin::install(filter.as_deref())
                        })
                        .provided_by(self),
                ]
            }
            _ => Vec::new(),
        }
    }

    fn implemented_operations(
        &self,
    ) -> Result<Vec<String>, trellis_kernel::error::UnlistableOperationSet> {
        Ok(vec!["bootstrap".into()])
    }
}
