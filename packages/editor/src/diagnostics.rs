//! Expression diagnostics reported by the language server, placed in the editor text.

use enso_ast::{AstId, ExternalId, Module, SourceDocument};
use enso_common::text::trim_end;
use enso_common::SourceRange;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub expression_id: ExternalId,
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorDiagnostic {
    pub range: SourceRange,
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Place diagnostics at the spans of the expressions they refer to. Diagnostics
/// for expressions that are not in the module are dropped.
pub fn diagnostics_to_ranges(
    diagnostics: &[Diagnostic],
    module: &Module,
    source: &SourceDocument,
) -> Vec<EditorDiagnostic> {
    let by_external_id: HashMap<&ExternalId, AstId> = module
        .records()
        .map(|record| (&record.metadata.external_id, record.id))
        .collect();

    diagnostics
        .iter()
        .filter_map(|diagnostic| {
            let span = by_external_id
                .get(&diagnostic.expression_id)
                .and_then(|id| source.get_span(*id));
            let Some(span) = span else {
                debug!(expression = %diagnostic.expression_id, "no span for diagnostic");
                return None;
            };
            Some(EditorDiagnostic {
                range: trim_end(span, source.text()),
                kind: diagnostic.kind,
                message: diagnostic.message.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use enso_ast::{parse_module, ModuleUpdate};

    #[test]
    fn test_diagnostics_mapped_to_spans() {
        let module = parse_module("x = foo 1\ny = x").unwrap();
        let mut source = SourceDocument::new();
        source.apply_update(&module, &ModuleUpdate::default());

        let value = module.root().unwrap().statements()[0].assignment_expression().unwrap();
        let diagnostics = vec![
            Diagnostic {
                expression_id: value.external_id().clone(),
                kind: DiagnosticKind::Error,
                message: "Unresolved symbol foo".into(),
            },
            Diagnostic {
                expression_id: ExternalId("missing".into()),
                kind: DiagnosticKind::Warning,
                message: "dropped".into(),
            },
        ];

        let ranges = diagnostics_to_ranges(&diagnostics, &module, &source);
        assert_eq!(
            ranges,
            vec![EditorDiagnostic {
                range: SourceRange::new(4, 9),
                kind: DiagnosticKind::Error,
                message: "Unresolved symbol foo".into(),
            }]
        );
    }

    #[test]
    fn test_diagnostic_wire_format() {
        let json = r#"{"expressionId":"abc-1-2","kind":"Warning","message":"unused"}"#;
        let diagnostic: Diagnostic = serde_json::from_str(json).unwrap();
        assert_eq!(diagnostic.expression_id, ExternalId("abc-1-2".into()));
        assert_eq!(diagnostic.kind, DiagnosticKind::Warning);
    }
}
