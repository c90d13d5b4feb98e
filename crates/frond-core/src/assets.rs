//! Bookkeeping for emitted assets.
//!
//! Every file the pipeline writes into the staging directory is recorded
//! here, so the HTML shell step can reference exactly the filenames the
//! current build actually produced -- never a stale name from a previous
//! build.

/// What kind of asset a file is, which decides how the shell references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// A script bundle, referenced with a `<script>` tag.
    Script,
    /// A stylesheet, referenced with a `<link rel="stylesheet">` tag.
    Stylesheet,
    /// The compiled wasm artifact or its JS glue. Loaded dynamically by the
    /// bootstrap code, never referenced from the shell.
    WasmArtifact,
}

/// One file emitted by the current build.
#[derive(Debug, Clone)]
pub struct EmittedAsset {
    /// Logical name (e.g. the entry name `home`).
    pub name: String,
    /// Final content-hashed filename inside the output directory.
    pub filename: String,
    /// Asset kind.
    pub kind: AssetKind,
}

/// In-order record of everything emitted by one build.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    emitted: Vec<EmittedAsset>,
}

impl AssetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an emitted file.
    pub fn record(&mut self, name: impl Into<String>, filename: impl Into<String>, kind: AssetKind) {
        self.emitted.push(EmittedAsset {
            name: name.into(),
            filename: filename.into(),
            kind,
        });
    }

    /// All emitted assets, in emission order.
    pub fn all(&self) -> &[EmittedAsset] {
        &self.emitted
    }

    /// Emitted assets of one kind, in emission order.
    pub fn of_kind(&self, kind: AssetKind) -> impl Iterator<Item = &EmittedAsset> {
        self.emitted.iter().filter(move |a| a.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_emission_order() {
        let mut registry = AssetRegistry::new();
        registry.record("home", "home.aaaa.css", AssetKind::Stylesheet);
        registry.record("home", "home.bbbb.js", AssetKind::Script);
        registry.record("home", "home_bg.cccc.wasm", AssetKind::WasmArtifact);

        assert_eq!(registry.all().len(), 3);
        let scripts: Vec<_> = registry.of_kind(AssetKind::Script).collect();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].filename, "home.bbbb.js");
    }
}
