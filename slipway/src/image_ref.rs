use std::fmt;

/// A fully-qualified container image reference. Renders as `registry/name:tag` when a registry
/// host is configured and as `name:tag` otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub registry: Option<String>,
    pub name: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(registry: Option<String>, name: String, tag: String) -> Self {
        ImageRef {
            registry,
            name,
            tag,
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(registry) = self.registry.as_deref() {
            write!(f, "{registry}/")?;
        }
        write!(f, "{name}:{tag}", name = self.name, tag = self.tag)
    }
}
