//! Source-to-source refresh instrumentation.
//!
//! Scans eligible view-crate sources for component functions, hashes each
//! component's *declaration* (everything from `pub fn` to the opening
//! brace), and generates the registration shim the built artifact exports.
//! Body edits keep the declaration hash stable, so component state survives
//! them; a changed declaration resets it.
//!
//! Ineligible files (non-Rust sources, dependency and build-output trees,
//! the harness's own scratch tree) pass through unmodified.

use std::path::Path;

use regex::Regex;

use hotshell_api::REGISTER_SYMBOL;

/// Path fragments whose files are never instrumented. The scratch directory
/// is excluded to avoid instrumenting the instrumentation output itself.
const INELIGIBLE_SEGMENTS: &[&str] = &["target", "node_modules", ".git"];

// Explicit ASCII classes: the regex crate is built without unicode tables.

/// Component function signature: `pub fn name(f: &mut Frame, s: &mut StateBag)`.
const COMPONENT_PATTERN: &str = r"(?m)^[ \t]*pub fn ([a-z][a-z0-9_]*)[ \t]*\([ \t\r\n]*[a-z_][a-z0-9_]*[ \t]*:[ \t]*&[ \t]*mut[ \t\r\n]+(?:ratatui[ \t]*::[ \t]*)?Frame";

/// Input handler convention: `pub fn <component>_input(key, state)`.
const INPUT_PATTERN: &str = r"(?m)^[ \t]*pub fn ([a-z][a-z0-9_]*)_input[ \t]*\([ \t\r\n]*[a-z_][a-z0-9_]*[ \t]*:[ \t]*(?:[A-Za-z_:]+[ \t]*::[ \t]*)?KeyEvent";

/// One component found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentMeta {
    pub identity: String,
    pub signature: String,
    pub has_input: bool,
}

/// Result of instrumenting one eligible file.
#[derive(Debug)]
pub struct Transformed {
    pub text: String,
    pub components: Vec<ComponentMeta>,
}

/// The refresh-instrumentation transform.
pub struct RefreshTransform {
    component_re: Regex,
    input_re: Regex,
    scratch_dir: String,
}

impl RefreshTransform {
    pub fn new(scratch_dir: &str) -> Self {
        Self {
            component_re: Regex::new(COMPONENT_PATTERN).expect("valid pattern"),
            input_re: Regex::new(INPUT_PATTERN).expect("valid pattern"),
            scratch_dir: scratch_dir.to_owned(),
        }
    }

    /// Whether instrumentation applies to this path at all.
    pub fn is_eligible(&self, path: &Path) -> bool {
        if path.extension().and_then(|e| e.to_str()) != Some("rs") {
            return false;
        }
        !path.components().any(|c| {
            c.as_os_str().to_str().is_some_and(|name| {
                name == self.scratch_dir || INELIGIBLE_SEGMENTS.contains(&name)
            })
        })
    }

    /// Instrument one file.
    ///
    /// Returns `None` (declines) for ineligible paths. For eligible files,
    /// appends a hidden per-file component manifest and reports the
    /// components found; files without components come back unchanged.
    pub fn transform(&self, source: &str, path: &Path) -> Option<Transformed> {
        if !self.is_eligible(path) {
            return None;
        }

        let components = self.scan(source);
        if components.is_empty() {
            return Some(Transformed {
                text: source.to_owned(),
                components,
            });
        }

        let mut text = String::with_capacity(source.len() + 256);
        text.push_str(source);
        text.push_str("\n\n");
        text.push_str(&manifest_static(&components));
        Some(Transformed { text, components })
    }

    /// Find components and their declaration signatures in source text.
    pub fn scan(&self, source: &str) -> Vec<ComponentMeta> {
        let inputs: Vec<String> = self
            .input_re
            .captures_iter(source)
            .map(|c| c[1].to_owned())
            .collect();

        self.component_re
            .captures_iter(source)
            .filter_map(|captures| {
                let name = captures[1].to_owned();
                // Input handlers themselves are not components
                if name.ends_with("_input") {
                    return None;
                }
                let start = captures.get(0).expect("whole match").start();
                let declaration = declaration_span(source, start)?;
                Some(ComponentMeta {
                    signature: signature_hash(declaration),
                    has_input: inputs.iter().any(|i| i == &name),
                    identity: name,
                })
            })
            .collect()
    }

    /// Generate the registration export appended to the instrumented entry
    /// file. The artifact's only obligation across the boundary.
    pub fn registration_shim(&self, components: &[ComponentMeta]) -> String {
        let symbol =
            std::str::from_utf8(REGISTER_SYMBOL).expect("symbol name is ascii");
        let mut shim = String::new();
        shim.push_str("#[doc(hidden)]\n#[unsafe(no_mangle)]\n");
        shim.push_str(&format!(
            "pub fn {symbol}(registrar: &mut hotshell_api::Registrar) {{\n"
        ));
        for component in components {
            shim.push_str(&format!(
                "    registrar.component({:?}, {:?}, {})",
                component.identity, component.signature, component.identity
            ));
            if component.has_input {
                shim.push_str(&format!(".input({}_input)", component.identity));
            }
            shim.push_str(";\n");
        }
        shim.push_str("}\n");
        shim
    }
}

/// Extract the declaration: from `pub fn` to the opening brace (exclusive).
fn declaration_span(source: &str, start: usize) -> Option<&str> {
    let brace = source[start..].find('{')?;
    Some(source[start..start + brace].trim())
}

/// Hash a declaration, insensitive to formatting-only edits (line breaks,
/// rustfmt trailing commas).
fn signature_hash(declaration: &str) -> String {
    let collapsed: String = declaration.split_whitespace().collect();
    let normalized = collapsed.replace(",)", ")");
    let digest = blake3::hash(normalized.as_bytes());
    hex::encode(&digest.as_bytes()[..16])
}

/// Hidden per-file manifest of component identities and signatures.
fn manifest_static(components: &[ComponentMeta]) -> String {
    let entries: Vec<String> = components
        .iter()
        .map(|c| format!("({:?}, {:?})", c.identity, c.signature))
        .collect();
    format!(
        "#[doc(hidden)]\npub static __HOTSHELL_COMPONENTS: &[(&str, &str)] = &[{}];\n",
        entries.join(", ")
    )
}

// ============================================================================
// Tests
// ============================================================================
