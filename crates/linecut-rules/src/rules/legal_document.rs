use crate::{required_param, RuleContext, TriggerHandler};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use linecut_common::types::Alert;
use linecut_store::Change;
use serde_json::Value;

pub const TEMPLATE: &str = "/textos_legais/{documentId}";
pub const TERMS_DOCUMENT_ID: &str = "termos_condicoes";
const TERMS_TITLE: &str = "Termos e Condições";
const PRIVACY_TITLE: &str = "Política de Privacidade";
const ICON: &str = "bi-file-earmark-text-fill";

/// The document's own `titulo` when set, otherwise a name derived from its id.
///
/// Every id other than `termos_condicoes` is named as the privacy policy.
pub fn document_title(document_id: &str, document: &Value) -> String {
    if let Some(titulo) = document
        .get("titulo")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
    {
        return titulo.to_string();
    }
    if document_id == TERMS_DOCUMENT_ID {
        return TERMS_TITLE.to_string();
    }
    if document_id != "politica_privacidade" {
        tracing::debug!(document_id, "Untitled legal document, naming it as the privacy policy");
    }
    PRIVACY_TITLE.to_string()
}

pub fn evaluate(document_id: &str, document: &Value) -> Alert {
    let title = document_title(document_id, document);
    let body =
        format!("Nossos {title} foram atualizados. Por favor, revise as novas condições quando puder.");
    Alert::new(title, body, ICON)
}

/// Broadcasts a legal document update to every registered store.
pub struct LegalDocumentHandler {
    ctx: RuleContext,
}

impl LegalDocumentHandler {
    pub fn new(ctx: RuleContext) -> Self {
        Self { ctx }
    }

    /// Ids of every store under `/empresas`.
    async fn recipients(&self) -> Result<Vec<String>> {
        Ok(match self.ctx.store.get("/empresas").await? {
            Some(Value::Object(stores)) => stores.into_iter().map(|(id, _)| id).collect(),
            _ => Vec::new(),
        })
    }
}

#[async_trait]
impl TriggerHandler for LegalDocumentHandler {
    fn name(&self) -> &str {
        "legal_document"
    }

    fn template(&self) -> &str {
        TEMPLATE
    }

    async fn on_change(&self, change: &Change) -> Result<()> {
        let (Some(_), Some(after)) = (&change.before, &change.after) else {
            return Ok(());
        };
        let document_id = required_param(change, "documentId")?;
        let alert = evaluate(document_id, after);

        let recipients = self.recipients().await?;
        if recipients.is_empty() {
            tracing::info!(document_id, "No stores to notify about the legal update");
            return Ok(());
        }

        let outcomes = join_all(
            recipients
                .iter()
                .map(|recipient| self.ctx.notifier.notify(recipient, &alert)),
        )
        .await;
        let failed = outcomes.iter().filter(|o| o.is_failed()).count();
        tracing::info!(
            document_id,
            recipients = recipients.len(),
            failed,
            "Legal update broadcast"
        );
        Ok(())
    }
}
