//! Source rewriting.
//!
//! Declarative dependency directives are turned into static references:
//!
//! ```text
//! Ext.define('App.view.Main', {        require("src/app/model/User.js");
//!     requires: ['App.model.User'], => Ext.define('App.view.Main', {
//!     title: 'Main'                        title: 'Main'
//! });                                  });
//! ```
//!
//! Rewriting runs in three steps: collect edits (seeded dependencies plus
//! one insertion per directive that resolved to files), apply them back to
//! front, then prepend a reference before each `<root>.safeCreate('<name>'`.

mod directive;
mod edit;
mod loader;
mod resolve;

pub use directive::{extract_directives, Directive, DirectiveKind, DirectiveOptions, DirectiveTable};
pub use edit::{apply_edits, Edit};
pub use loader::Loader;
pub use resolve::{PathMap, PathPolicy};

use regex::Regex;

use crate::error::{Error, Result};
use crate::parser;

/// A static reference statement for `path`.
pub fn require_statement(path: &str) -> String {
    format!("require({});\n", serde_json::Value::from(path))
}

/// Rewrites one file at a time against a fixed path table.
#[derive(Debug)]
pub struct Rewriter {
    root: String,
    paths: PathMap,
    directives: DirectiveTable,
    safe_create: Regex,
}

impl Rewriter {
    /// `root` is the framework root class; `namespace` prefixes bare store
    /// and controller names.
    pub fn new(root: &str, namespace: &str, paths: PathMap) -> Result<Self> {
        let pattern = format!(r#"{}\.safeCreate\(['"]([^'"]*)['"]"#, regex::escape(root));
        let safe_create = Regex::new(&pattern).map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self {
            root: root.to_string(),
            paths,
            directives: DirectiveTable::new(namespace),
            safe_create,
        })
    }

    pub fn paths(&self) -> &PathMap {
        &self.paths
    }

    pub fn directives(&self) -> &DirectiveTable {
        &self.directives
    }

    pub fn directives_mut(&mut self) -> &mut DirectiveTable {
        &mut self.directives
    }

    /// Rewrite `source`.
    ///
    /// `requires` and `overrides` are files already known to be needed; a
    /// reference to each is placed at the top of the output. `src` never
    /// references itself. Fails without
    /// producing output when the source does not parse or a `safeCreate`
    /// target cannot be resolved.
    pub fn rewrite(
        &self,
        src: &str,
        source: &str,
        requires: &[String],
        overrides: &[String],
    ) -> Result<String> {
        let mut edits = Vec::new();

        let seed: String = requires
            .iter()
            .chain(overrides)
            .filter(|path| !path.is_empty() && path.as_str() != src)
            .map(|path| require_statement(path))
            .collect();
        if !seed.is_empty() {
            edits.push(Edit::Insert { at: 0, text: seed });
        }

        let parsed = parser::parse(src, source)?;
        for directive in extract_directives(&parsed, &self.directives) {
            edits.extend(self.directive_edits(src, &directive));
        }

        let text = apply_edits(source, edits);
        self.rewrite_safe_create(&text)
    }

    /// Static references for one directive value, empty when it does not
    /// resolve.
    ///
    /// Dotted names are used as is. A bare name is only resolved when a
    /// prefix applies (the prefix is prepended) or when it is the root class.
    pub fn add_require(&self, class_name: &str, prefix: Option<&str>) -> String {
        self.require_lines(class_name, prefix, "")
    }

    /// Like `add_require`, leaving out references to `from` itself.
    fn require_lines(&self, class_name: &str, prefix: Option<&str>, from: &str) -> String {
        let prefix = prefix.unwrap_or("");
        let dotted = class_name.find('.').map_or(false, |i| i > 0);
        if !dotted && prefix.is_empty() && class_name != self.root {
            return String::new();
        }

        let name = if dotted {
            class_name.to_string()
        } else {
            format!("{}{}", prefix, class_name)
        };

        let mut out = String::new();
        for file in self.paths.resolve_class_file(&name) {
            if file == from {
                continue;
            }
            tracing::debug!("Converting require: {} => {}", class_name, file);
            out.push_str(&require_statement(&file));
        }
        out
    }

    fn directive_edits(&self, src: &str, directive: &Directive) -> Vec<Edit> {
        let Some(options) = self.directives.options(directive.kind) else {
            return Vec::new();
        };

        let text: String = directive
            .values
            .iter()
            .map(|value| self.require_lines(value, options.prefix.as_deref(), src))
            .collect();
        if text.is_empty() {
            return Vec::new();
        }

        let mut edits = Vec::with_capacity(2);
        if options.remove {
            edits.push(Edit::Remove {
                start: directive.property.start_byte,
                end: directive.property.end_byte,
            });
        }
        let at = if options.end {
            directive.statement.end_byte
        } else {
            directive.statement.start_byte
        };
        edits.push(Edit::Insert { at, text });
        edits
    }

    fn rewrite_safe_create(&self, text: &str) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in self.safe_create.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let file = self
                .paths
                .resolve_class_file(name.as_str())
                .into_iter()
                .next()
                .ok_or_else(|| Error::Resolution {
                    name: name.as_str().to_string(),
                })?;

            out.push_str(&text[last..whole.start()]);
            out.push_str(&require_statement(&file));
            out.push_str(whole.as_str());
            last = whole.end();
        }

        out.push_str(&text[last..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ClassResolver;
    use std::sync::Arc;

    fn rewriter() -> Rewriter {
        let paths = PathMap::new()
            .with("Legacy", PathPolicy::Disabled)
            .unwrap()
            .with("App", PathPolicy::Template("src/app/".to_string()))
            .unwrap()
            .with("Ext", PathPolicy::Template("ext/src/".to_string()))
            .unwrap();
        Rewriter::new("Ext", "App", paths).unwrap()
    }

    #[test]
    fn test_identity_without_dependencies() {
        let source = "Ext.define('App.A', {\n    title: 'A'\n});\n";
        let out = rewriter().rewrite("a.js", source, &[], &[]).unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn test_require_statement_quotes() {
        assert_eq!(require_statement("src/a.js"), "require(\"src/a.js\");\n");
        assert_eq!(require_statement("we\"ird.js"), "require(\"we\\\"ird.js\");\n");
    }

    #[test]
    fn test_seeds_are_prepended() {
        let out = rewriter()
            .rewrite(
                "a.js",
                "var a = 1;",
                &["x.js".to_string(), String::new()],
                &["patch.js".to_string()],
            )
            .unwrap();
        assert_eq!(out, "require(\"x.js\");\nrequire(\"patch.js\");\nvar a = 1;");
    }

    #[test]
    fn test_bare_names() {
        let r = rewriter();
        assert_eq!(r.add_require("mainview", None), "");
        assert_eq!(r.add_require("Ext", None), "require(\"ext/src.js\");\n");
        assert_eq!(
            r.add_require("Users", Some("App.store.")),
            "require(\"src/app/store/Users.js\");\n"
        );
        assert_eq!(
            r.add_require("App.store.Users", Some("App.store.")),
            "require(\"src/app/store/Users.js\");\n"
        );
        assert_eq!(r.add_require(".Odd", None), "");
    }

    #[test]
    fn test_stores_and_controllers_use_namespace_prefix() {
        let source = "Ext.define('App.Application', { stores: ['Users'], controllers: ['Main'] });";
        let out = rewriter().rewrite("app.js", source, &[], &[]).unwrap();
        assert_eq!(
            out,
            format!(
                "require(\"src/app/controller/Main.js\");\nrequire(\"src/app/store/Users.js\");\n{}",
                source
            )
        );
    }

    #[test]
    fn test_uses_inserted_after_statement() {
        let source = "Ext.define('App.A', { uses: 'App.B' });\nfoo();";
        let out = rewriter().rewrite("a.js", source, &[], &[]).unwrap();
        assert_eq!(
            out,
            "Ext.define('App.A', { uses: 'App.B' });require(\"src/app/B.js\");\n\nfoo();"
        );
    }

    #[test]
    fn test_disabled_prefix_produces_nothing() {
        let source = "Ext.define('App.A', { requires: ['Legacy.Thing'] });";
        let out = rewriter().rewrite("a.js", source, &[], &[]).unwrap();
        assert_eq!(out, source, "unresolved directives leave the property in place");
    }

    #[test]
    fn test_safe_create() {
        let source = "var w = Ext.safeCreate('App.view.Win', {});";
        let out = rewriter().rewrite("a.js", source, &[], &[]).unwrap();
        assert_eq!(
            out,
            "var w = require(\"src/app/view/Win.js\");\nExt.safeCreate('App.view.Win', {});"
        );
    }

    #[test]
    fn test_safe_create_unresolved_is_fatal() {
        let source = "Ext.safeCreate(\"Legacy.Win\");";
        let err = rewriter().rewrite("a.js", source, &[], &[]).unwrap_err();
        match err {
            Error::Resolution { name } => assert_eq!(name, "Legacy.Win"),
            other => panic!("expected resolution error, got {:?}", other),
        }
    }

    #[test]
    fn test_no_self_reference() {
        let patch = "ext/src/overrides/Panel.js";
        let resolver: Arc<dyn ClassResolver> = Arc::new(|_: &str| {
            vec!["ext/src/Panel.js".to_string(), "ext/src/overrides/Panel.js".to_string()]
        });
        let paths = PathMap::new().with("Ext", PathPolicy::Resolver(resolver)).unwrap();
        let rewriter = Rewriter::new("Ext", "App", paths).unwrap();
        let source = "Ext.define('Ext.overrides.Panel', { override: 'Ext.Panel' });";
        let out = rewriter
            .rewrite(patch, source, &[], &["ext/src/Panel.js".to_string(), patch.to_string()])
            .unwrap();
        assert_eq!(
            out,
            format!("require(\"ext/src/Panel.js\");\nrequire(\"ext/src/Panel.js\");\n{}", source)
        );
    }

    #[test]
    fn test_parse_error_is_fatal() {
        let err = rewriter().rewrite("bad.js", "Ext.define('A', {", &[], &[]);
        assert!(matches!(err, Err(Error::Parse { .. })));
    }
}
