use serde::{Deserialize, Serialize};

/// Run-time options of the virtual machine.
/// Use [`OptionsBuilder`] to build them from code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Run images with a bad checksum or a mismatching version, after a warning.
    pub ignore_errors: bool,
    /// Deterministic random numbers and no interactive confirmations.
    pub regression: bool,
    /// Log the image header when loading, deterministic random numbers.
    pub debug: bool,
}

impl Options {
    pub fn deterministic(&self) -> bool {
        self.debug || self.regression
    }
}

/// `OptionsBuilder` is a convenience builder to create `Options` from code.
#[derive(Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.options.ignore_errors = ignore_errors;
        self
    }

    pub fn with_regression(mut self, regression: bool) -> Self {
        self.options.regression = regression;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.options.debug = debug;
        self
    }

    /// Retrieves the options built
    pub fn get(self) -> Options {
        self.options
    }
}
