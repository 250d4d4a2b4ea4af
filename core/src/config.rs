use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;

pub const DEFAULT_SOLVER_PROGRAM: &str = "./toolkits/graph_analytics/label_propagation";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub delimiter: String,
    pub user_field: usize,
    pub product_field: usize,
    /// Marks an improperly escaped upstream value.
    pub sentinel: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    pub program: String,
    pub timeout_secs: u64,
    pub results_suffix: String,
    pub preamble_lines: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub top_k: usize,
    pub export_graph: bool,
    pub final_result_suffix: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub ingest: IngestConfig,
    pub solver: SolverConfig,
    pub output: OutputConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            user_field: 1,
            product_field: 4,
            sentinel: "\\".to_string(),
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_SOLVER_PROGRAM.to_string(),
            timeout_secs: 3600,
            results_suffix: "_U.mm".to_string(),
            preamble_lines: 3,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            export_graph: true,
            final_result_suffix: "_final_result".to_string(),
        }
    }
}

impl IngestConfig {
    pub fn delimiter_char(&self) -> Result<char, ConfigError> {
        single_char("ingest.delimiter", &self.delimiter)
    }

    pub fn sentinel_char(&self) -> Result<char, ConfigError> {
        single_char("ingest.sentinel", &self.sentinel)
    }
}

impl AppConfig {
    /// Layers: built-in defaults, `config/default`, `config/<RUN_MODE>`,
    /// an explicit file if given, then `LPREC_*` environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let defaults = AppConfig::default();

        let mut builder = Config::builder()
            .set_default("ingest.delimiter", defaults.ingest.delimiter.clone())?
            .set_default("ingest.user_field", defaults.ingest.user_field as i64)?
            .set_default("ingest.product_field", defaults.ingest.product_field as i64)?
            .set_default("ingest.sentinel", defaults.ingest.sentinel.clone())?
            .set_default("solver.program", defaults.solver.program.clone())?
            .set_default("solver.timeout_secs", defaults.solver.timeout_secs as i64)?
            .set_default("solver.results_suffix", defaults.solver.results_suffix.clone())?
            .set_default("solver.preamble_lines", defaults.solver.preamble_lines as i64)?
            .set_default("output.top_k", defaults.output.top_k as i64)?
            .set_default("output.export_graph", defaults.output.export_graph)?
            .set_default(
                "output.final_result_suffix",
                defaults.output.final_result_suffix.clone(),
            )?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: AppConfig = builder
            .add_source(
                Environment::with_prefix("LPREC")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let delimiter = self.ingest.delimiter_char()?;
        let sentinel = self.ingest.sentinel_char()?;
        if delimiter == sentinel {
            return Err(ConfigError::Message(
                "ingest.delimiter and ingest.sentinel must differ".to_string(),
            ));
        }
        if self.ingest.user_field == self.ingest.product_field {
            return Err(ConfigError::Message(
                "ingest.user_field and ingest.product_field must differ".to_string(),
            ));
        }
        if self.solver.program.trim().is_empty() {
            return Err(ConfigError::Message("solver.program is empty".to_string()));
        }
        if self.solver.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "solver.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn single_char(key: &str, value: &str) -> Result<char, ConfigError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ConfigError::Message(format!(
            "{key} must be exactly one character, got {value:?}"
        ))),
    }
}
