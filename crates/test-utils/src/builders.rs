#![allow(dead_code)]

use std::path::Path;

use tabpipe::config::model::RawRunnerVersion;
use tabpipe::config::{Config, RawConfigFile};
use tabpipe::spec::{PipelineSpec, Step};

/// Builder for `Config` to simplify test setup.
///
/// Starts from the defaults with short poll and kill intervals so
/// cancellation tests finish quickly.
pub struct ConfigBuilder {
    raw: RawConfigFile,
}

impl ConfigBuilder {
    pub fn new(cache_root: &Path) -> Self {
        let mut raw = RawConfigFile::default();
        raw.cache.root = cache_root.to_path_buf();
        raw.runner.poll_interval = "100ms".to_string();
        raw.runner.kill_grace = "500ms".to_string();
        Self { raw }
    }

    pub fn executable(mut self, path: &Path) -> Self {
        self.raw.runner.executable = path.to_string_lossy().into_owned();
        self
    }

    pub fn processor_path(mut self, path: &Path) -> Self {
        self.raw.runner.processor_path = path.to_path_buf();
        self
    }

    pub fn retention(mut self, retention: &str) -> Self {
        self.raw.cache.retention = retention.to_string();
        self
    }

    pub fn poll_interval(mut self, interval: &str) -> Self {
        self.raw.runner.poll_interval = interval.to_string();
        self
    }

    pub fn version(mut self, tag: &str, executable: &Path, processor_path: &Path) -> Self {
        self.raw.runner.versions.insert(
            tag.to_string(),
            RawRunnerVersion {
                executable: executable.to_string_lossy().into_owned(),
                processor_path: processor_path.to_path_buf(),
            },
        );
        self
    }

    pub fn build(self) -> Config {
        Config::try_from(self.raw).expect("Failed to build valid config from builder")
    }
}

/// Builder for `PipelineSpec`.
pub struct SpecBuilder {
    name: String,
    title: String,
    description: String,
    version: String,
    steps: Vec<Step>,
}

impl SpecBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            title: name.to_string(),
            description: String::new(),
            version: String::new(),
            steps: Vec::new(),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn build(self) -> PipelineSpec {
        let mut spec = PipelineSpec::new(self.name, self.title, self.description, self.version)
            .expect("valid pipeline name");
        for step in self.steps {
            spec.add_step(step).expect("step passes the rule table");
        }
        spec
    }
}

/// Load a CSV, convert its latitude column and sort it.
pub fn sample_spec(name: &str) -> PipelineSpec {
    let convert: serde_yaml::Value = serde_yaml::from_str(
        "run: convert_to_decimal_degrees\n\
         parameters:\n\
         \x20 fields:\n\
         \x20 - input_field: lat\n\
         \x20   output_field: lat_dd\n\
         \x20   pattern: '%directional% %degrees%o %decimal_minutes%'\n\
         \x20   format: degrees-decimal_minutes\n",
    )
    .expect("valid step yaml");

    let mut spec = SpecBuilder::new(name)
        .title("Sample pipeline")
        .description("Stations with converted latitudes")
        .step(
            Step::new("add_resource")
                .with_parameter("name", "stations")
                .with_parameter("url", "data/stations.csv"),
        )
        .build();
    spec.add_step_value(convert).expect("convert step passes the rule table");
    spec.add_step(Step::new("sort").with_parameter("sort-by", "{station}"))
        .expect("sort step passes the rule table");
    spec
}
