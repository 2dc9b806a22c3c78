use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;

/// Everything that determines one server launch.
///
/// Built once per scenario; the launch command line is a pure function of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    port: u16,
    model_name: String,
    model_path: PathBuf,
    use_saved_model: bool,
    enable_batching: bool,
}

impl ServerConfig {
    pub fn new(port: u16, model_name: impl Into<String>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            port,
            model_name: model_name.into(),
            model_path: model_path.into(),
            use_saved_model: false,
            enable_batching: false,
        }
    }

    /// Load the export with SavedModel semantics (upconverting legacy bundles).
    pub fn with_saved_model(mut self, enabled: bool) -> Self {
        self.use_saved_model = enabled;
        self
    }

    pub fn with_batching(mut self, enabled: bool) -> Self {
        self.enable_batching = enabled;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn use_saved_model(&self) -> bool {
        self.use_saved_model
    }

    pub fn enable_batching(&self) -> bool {
        self.enable_batching
    }

    /// `host:port` the server will listen on.
    pub fn address(&self) -> String {
        format!("localhost:{}", self.port)
    }

    pub fn args(&self) -> Vec<OsString> {
        let mut model_base_path = OsString::from("--model_base_path=");
        model_base_path.push(&self.model_path);

        vec![
            OsString::from(format!("--port={}", self.port)),
            OsString::from(format!("--model_name={}", self.model_name)),
            model_base_path,
            OsString::from(format!("--use_saved_model={}", self.use_saved_model)),
            OsString::from(format!("--enable_batching={}", self.enable_batching)),
            OsString::from("--alsologtostderr"),
        ]
    }

    /// Shell-like rendering of the launch command, for logs.
    pub fn command_line(&self, binary: &Path) -> String {
        let mut line = binary.display().to_string();
        for arg in self.args() {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}
